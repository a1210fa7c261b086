//! Error types for the quota crate.
//!
//! - `StoreError`: persistence failures, carried in a rootcause `Report`
//! - `QuotaError`: gate-level failures handed to the scheduler and the CLI

use std::fmt;

/// Errors from the persisted state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    Io { path: String, details: String },
    /// The stored state could not be parsed.
    Corrupt { key: Option<String>, details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, details } => write!(f, "state file '{path}' unavailable: {details}"),
            Self::Corrupt {
                key: Some(key),
                details,
            } => write!(f, "stored value for '{key}' is corrupt: {details}"),
            Self::Corrupt { key: None, details } => write!(f, "stored state is corrupt: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from the usage gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    /// A credential must contain at least one non-whitespace character.
    EmptyCredential,
    /// The state store failed.
    Store { details: String },
}

impl fmt::Display for QuotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCredential => write!(f, "credential is empty"),
            Self::Store { details } => write!(f, "usage state unavailable: {details}"),
        }
    }
}

impl std::error::Error for QuotaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::Corrupt {
            key: Some("usage_count".to_string()),
            details: "invalid digit".to_string(),
        };
        assert!(err.to_string().contains("usage_count"));

        let err = StoreError::Io {
            path: "/tmp/state.json".to_string(),
            details: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn quota_error_display() {
        assert_eq!(
            QuotaError::EmptyCredential.to_string(),
            "credential is empty"
        );
    }
}
