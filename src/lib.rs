//! Mobile Search Sync Library
//!
//! Pushes one user's mobile inbox default search to every member of a group.
//! The binary in `src/main.rs` adds the console front-end.

pub mod api;
pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod logging;
/// Propagation driver and payload
pub mod propagate;
