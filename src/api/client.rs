//! Remote API client
//!
//! Both endpoints are called with HTTP GET and the request envelope in the
//! query string. The HTTP status is not interpreted; the JSON body decides.

use crate::api::envelope::RequestParams;
use crate::api::types::{ApiResponse, AuthRequest, AuthValue, SessionToken, STATUS_OK};
use crate::config::{ApiConfig, Credentials};
use crate::error::AppError;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Operations the propagation loop needs from the remote API
#[async_trait]
pub trait MobileSearchApi: Send + Sync {
    /// Exchange credentials for a session token
    ///
    /// Never fails: a rejected login, a malformed response or a transport
    /// error all yield an empty token.
    async fn authenticate(&self, credentials: &Credentials) -> SessionToken;

    /// Send one mobile search update and return the parsed JSON response
    ///
    /// # Errors
    /// * `AppError::UpdateCall` if the request fails or the body is not JSON
    async fn update_mobile_search(
        &self,
        token: &SessionToken,
        payload: &Map<String, Value>,
    ) -> Result<Value, AppError>;
}

/// HTTP implementation of [`MobileSearchApi`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    auth_url: String,
    api_url: String,
}

impl ApiClient {
    /// Create a client for the configured endpoints
    pub fn new(http: reqwest::Client, config: &ApiConfig) -> Self {
        Self::with_urls(http, &config.auth_url, &config.api_url)
    }

    /// Create a client for explicit endpoint URLs
    pub fn with_urls(http: reqwest::Client, auth_url: &str, api_url: &str) -> Self {
        Self {
            http,
            auth_url: auth_url.to_string(),
            api_url: api_url.to_string(),
        }
    }

    /// GET `url` with `params` and parse the body as JSON
    async fn get_json(&self, url: &str, params: &RequestParams) -> anyhow::Result<Value> {
        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Failed to send HTTP request to {}", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        tracing::debug!(
            url = %url,
            status_code = status.as_u16(),
            body_len = body.len(),
            "API call completed"
        );

        serde_json::from_str(&body).map_err(|e| {
            anyhow!(
                "Failed to parse JSON response (HTTP {}): {} - Response body: {}",
                status.as_u16(),
                e,
                body
            )
        })
    }

    async fn try_authenticate(&self, credentials: &Credentials) -> anyhow::Result<String> {
        let request = AuthRequest {
            login_name: &credentials.username,
            password: &credentials.password,
            expires: &credentials.expires,
        };
        let params = RequestParams::new(&SessionToken::empty(), &request)?;
        let body = self.get_json(&self.auth_url, &params).await?;

        let parsed: ApiResponse<AuthValue> = serde_json::from_value(body)
            .map_err(|e| anyhow!("Unexpected authentication response shape: {}", e))?;
        if parsed.status != STATUS_OK {
            return Err(anyhow!(
                "Authentication returned status {}: {}",
                parsed.status,
                parsed.message.unwrap_or_default()
            ));
        }
        parsed
            .value
            .map(|v| v.token)
            .ok_or_else(|| anyhow!("Authentication response carries no token"))
    }
}

#[async_trait]
impl MobileSearchApi for ApiClient {
    async fn authenticate(&self, credentials: &Credentials) -> SessionToken {
        match self.try_authenticate(credentials).await {
            Ok(token) => {
                tracing::debug!(username = %credentials.username, "Authenticated");
                SessionToken::new(token)
            }
            Err(e) => {
                tracing::warn!(
                    username = %credentials.username,
                    error = %format!("{:#}", e),
                    "Authentication failed"
                );
                SessionToken::empty()
            }
        }
    }

    async fn update_mobile_search(
        &self,
        token: &SessionToken,
        payload: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let params = RequestParams::new(token, payload)?;
        self.get_json(&self.api_url, &params)
            .await
            .map_err(|e| AppError::UpdateCall(format!("{:#}", e)))
    }
}
