//! Wire types for the remote API
//!
//! The API speaks PascalCase JSON and wraps every answer in a
//! `{Status, Value, Message}` envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Body of the authentication call
#[derive(Serialize, Debug)]
pub struct AuthRequest<'a> {
    /// Login name
    #[serde(rename = "LoginName")]
    pub login_name: &'a str,
    /// Password
    #[serde(rename = "Password")]
    pub password: &'a str,
    /// Token lifetime hint
    #[serde(rename = "Expires")]
    pub expires: &'a Value,
}

/// Response envelope shared by all endpoints
#[derive(Deserialize, Debug)]
pub struct ApiResponse<T> {
    /// 0 on success
    #[serde(rename = "Status")]
    pub status: i64,
    /// Endpoint-specific result
    #[serde(rename = "Value")]
    pub value: Option<T>,
    /// Human-readable detail, usually set on failure
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
}

/// `Value` of a successful authentication
#[derive(Deserialize, Debug)]
pub struct AuthValue {
    /// Session token
    #[serde(rename = "Token")]
    pub token: String,
}

/// Status code of an accepted request
pub const STATUS_OK: i64 = 0;

/// Opaque session token; empty means authentication failed
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The failed-authentication token
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no token was obtained
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw token value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "SessionToken(<empty>)")
        } else {
            write!(f, "SessionToken([REDACTED])")
        }
    }
}

/// Status of an arbitrary JSON response, if it has one
pub fn response_status(response: &Value) -> Option<i64> {
    response.get("Status").and_then(Value::as_i64)
}
