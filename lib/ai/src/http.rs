//! HTTP skill backend.
//!
//! Posts a `SkillRequest` as JSON and maps the response body onto
//! `SkillResponse` or a `BackendError`. A successful body is
//! `{"result": ..., "remainingFreeRuns": n}`; a failure body is
//! `{"error": {"kind": "quota_exceeded", "message": "..."}}`.

use crate::backend::{SkillBackend, SkillRequest, SkillResponse};
use crate::error::{BackendError, BackendErrorKind};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Configuration for the HTTP backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpBackendConfig {
    /// Full URL of the skill execution endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8787/api/execute-skill".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Structured error body returned by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    kind: BackendErrorKind,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// A `SkillBackend` that talks to the execution endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSkillBackend {
    client: Client,
    config: HttpBackendConfig,
}

impl HttpSkillBackend {
    /// Creates a backend for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the HTTP client cannot be built.
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BackendError::Transport {
                reason: e.to_string(),
            })?;
        Ok(Self { client, config })
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl SkillBackend for HttpSkillBackend {
    #[instrument(skip(self, request), fields(skill = %request.skill_id, node = %request.node_id))]
    async fn invoke(&self, request: &SkillRequest) -> Result<SkillResponse, BackendError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "skill request did not complete");
                BackendError::Transport {
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport {
                reason: e.to_string(),
            })?;

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            "skill response received"
        );
        parse_response(status, &body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Maps an HTTP status and body onto the backend contract.
///
/// A structured error body wins over the status code. Without one, 429 is
/// read as quota exhaustion and 401/403 as a rejected credential.
///
/// # Errors
///
/// Returns the `BackendError` described by the body or status.
pub fn parse_response(status: StatusCode, body: &str) -> Result<SkillResponse, BackendError> {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return Err(BackendError::from_kind(
            envelope.error.kind,
            envelope.error.message,
        ));
    }

    if status.is_success() {
        return serde_json::from_str::<SkillResponse>(body).map_err(|e| {
            BackendError::ResponseParseFailed {
                reason: e.to_string(),
            }
        });
    }

    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    };
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => BackendError::QuotaExceeded { message },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::InvalidCredential { message }
        }
        _ => BackendError::Backend { message },
    })
}
