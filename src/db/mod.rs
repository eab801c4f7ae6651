//! Relational store module
//!
//! Query templates, the query executor seam and the tabular result type.

pub mod queries;
pub mod store;
pub mod table;

pub use queries::QueryTemplates;
pub use store::{QueryExecutor, SqlStore};
pub use table::{Cell, DisplayOptions, Table};
