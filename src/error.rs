//! Error types and error handling for the application
//!
//! Every fallible operation in the library returns `AppError`. Each variant
//! maps to a process exit code via [`AppError::exit_code`], so the binary has
//! a single place that decides how a run ends.

use thiserror::Error;

/// Exit code for a successful run
pub const EXIT_OK: u8 = 0;

/// Exit code for any fatal error other than authentication
pub const EXIT_FAILURE: u8 = 1;

/// Exit code when the API rejected the credentials
pub const EXIT_AUTH_FAILED: u8 = 2;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration file is missing, unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The auth endpoint did not hand out a token
    #[error("Failed to authenticate user {username}. Check credentials")]
    Authentication {
        /// Login name that was rejected
        username: String,
    },

    /// Connection or SQL error from the relational store
    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// A lookup that needs at least one row returned none
    #[error("{lookup} lookup returned no rows (expected column {column})")]
    LookupEmpty {
        /// Which lookup came back empty
        lookup: &'static str,
        /// Column that was about to be read
        column: &'static str,
    },

    /// A lookup's rows do not carry the expected column
    #[error("{lookup} lookup has no column {column}; check the query template")]
    MissingColumn {
        /// Which lookup was read
        lookup: &'static str,
        /// Column that was expected
        column: &'static str,
    },

    /// A column value could not be converted to the expected type
    #[error("Column {column} holds {value}, expected an integer")]
    InvalidValue {
        /// Column being read
        column: &'static str,
        /// Rendered cell value
        value: String,
    },

    /// A call to the update endpoint failed
    #[error("Update call failed: {0}")]
    UpdateCall(String),

    /// Interactive prompt could not be shown or read
    #[error("Prompt failed: {0}")]
    Prompt(String),

    /// Internal error (catch-all for unexpected errors)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Authentication { .. } => EXIT_AUTH_FAILED,
            AppError::Config(_)
            | AppError::Query(_)
            | AppError::LookupEmpty { .. }
            | AppError::MissingColumn { .. }
            | AppError::InvalidValue { .. }
            | AppError::UpdateCall(_)
            | AppError::Prompt(_)
            | AppError::Internal(_) => EXIT_FAILURE,
        }
    }
}
