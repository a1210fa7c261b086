//! Error types for the AI crate.
//!
//! `BackendError` is what a `SkillBackend` returns. The scheduler branches on
//! the variant: quota exhaustion and credential rejection are recoverable by
//! the user, everything else ends the run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kinds reported by the backend in its structured error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    /// The shared free quota is exhausted.
    QuotaExceeded,
    /// The supplied credential was rejected.
    InvalidCredential,
    /// Any other server-side failure.
    BackendError,
}

/// Errors from skill backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The free quota is exhausted and no credential was accepted.
    QuotaExceeded { message: String },
    /// The credential was rejected.
    InvalidCredential { message: String },
    /// The backend reported a failure.
    Backend { message: String },
    /// The request never produced a response.
    Transport { reason: String },
    /// The response could not be understood.
    ResponseParseFailed { reason: String },
}

impl BackendError {
    /// Builds the error matching a structured error body.
    #[must_use]
    pub fn from_kind(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            BackendErrorKind::QuotaExceeded => Self::QuotaExceeded { message },
            BackendErrorKind::InvalidCredential => Self::InvalidCredential { message },
            BackendErrorKind::BackendError => Self::Backend { message },
        }
    }

    /// Returns true if this error signals quota exhaustion.
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded { message } => write!(f, "free quota exceeded: {message}"),
            Self::InvalidCredential { message } => write!(f, "invalid credential: {message}"),
            Self::Backend { message } => write!(f, "backend error: {message}"),
            Self::Transport { reason } => write!(f, "backend request failed: {reason}"),
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse backend response: {reason}")
            }
        }
    }
}

impl std::error::Error for BackendError {}
