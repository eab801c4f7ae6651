//! Remote API module
//!
//! Authentication, the request envelope and the mobile search update call.

pub mod client;
pub mod envelope;
pub mod types;

pub use client::{ApiClient, MobileSearchApi};
pub use envelope::RequestParams;
pub use types::SessionToken;
