//! Propagation module
//!
//! The driver loop and the payload it sends.

pub mod driver;
pub mod payload;

pub use driver::{
    MemberOutcome, PropagationRequest, Propagator, RunReport, RunState, UpdateStatus,
};
pub use payload::{InboxPayload, PayloadTemplate};
