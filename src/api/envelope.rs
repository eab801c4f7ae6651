//! Request envelope
//!
//! Every call sends its body as a compact JSON string in the `data` query
//! parameter, plus the session `token` once one has been obtained.

use crate::api::types::SessionToken;
use crate::error::AppError;
use anyhow::anyhow;
use serde::Serialize;

/// Query parameters of an API call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    data: String,
}

impl RequestParams {
    /// Wrap `data` for transmission
    ///
    /// # Arguments
    /// * `token` - Session token; an empty token is left out of the envelope
    /// * `data` - Request body, serialized without whitespace
    pub fn new<T: Serialize + ?Sized>(token: &SessionToken, data: &T) -> Result<Self, AppError> {
        let data = serde_json::to_string(data)
            .map_err(|e| AppError::Internal(anyhow!("Failed to serialize request data: {}", e)))?;
        let token = (!token.is_empty()).then(|| token.as_str().to_string());
        Ok(Self { token, data })
    }

    /// Token sent with the request, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Serialized request body
    pub fn data(&self) -> &str {
        &self.data
    }
}
