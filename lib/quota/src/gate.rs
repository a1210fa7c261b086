//! Free-run quota gate.
//!
//! Bounds unauthenticated AI executions per client. A stored user credential
//! lifts the bound entirely; runs made with it are attributed to the
//! credential and never consume the shared quota.

use crate::error::QuotaError;
use crate::store::StateStore;
use serde::{Deserialize, Serialize};
use skillchain_core::ClientFingerprint;
use std::sync::Arc;
use tracing::{debug, info};

/// Free executions granted to a client without a credential.
pub const FREE_RUN_LIMIT: u32 = 5;

const USAGE_COUNT_KEY: &str = "usage_count";
const CREDENTIAL_KEY: &str = "credential";
const FINGERPRINT_KEY: &str = "client_fingerprint";

/// Quota configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum number of free runs per client.
    #[serde(default = "default_free_run_limit")]
    pub free_run_limit: u32,
}

fn default_free_run_limit() -> u32 {
    FREE_RUN_LIMIT
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_run_limit: FREE_RUN_LIMIT,
        }
    }
}

/// Outcome of asking the gate whether an AI execution may proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPermission {
    /// A credential is stored; the run is attributed to it.
    Credential,
    /// The run is covered by the free quota.
    FreeRun {
        /// Free runs left before this one is recorded.
        remaining: u32,
    },
    /// The free quota is exhausted and no credential is stored.
    Denied {
        /// Human-readable explanation.
        reason: String,
    },
}

impl RunPermission {
    /// Returns true if the run may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied { .. })
    }

    /// Returns the denial reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Denied { reason } => Some(reason),
            Self::Credential | Self::FreeRun { .. } => None,
        }
    }
}

fn store_error(e: impl std::fmt::Display) -> QuotaError {
    QuotaError::Store {
        details: e.to_string(),
    }
}

/// The usage gate.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct UsageGate {
    store: Arc<dyn StateStore>,
    config: QuotaConfig,
    fingerprint: ClientFingerprint,
}

impl std::fmt::Debug for UsageGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageGate")
            .field("config", &self.config)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl UsageGate {
    /// Opens the gate over `store`, minting and persisting a client
    /// fingerprint on first use.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the store cannot be read or written.
    pub fn open(store: Arc<dyn StateStore>, config: QuotaConfig) -> Result<Self, QuotaError> {
        let fingerprint = match store.get(FINGERPRINT_KEY).map_err(store_error)? {
            Some(raw) => raw
                .parse::<ClientFingerprint>()
                .map_err(store_error)?,
            None => {
                let minted = ClientFingerprint::new();
                store
                    .set(FINGERPRINT_KEY, minted.as_str())
                    .map_err(store_error)?;
                info!(fingerprint = %minted, "minted client fingerprint");
                minted
            }
        };

        Ok(Self {
            store,
            config,
            fingerprint,
        })
    }

    /// Returns the client fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &ClientFingerprint {
        &self.fingerprint
    }

    /// Returns the configured free-run ceiling.
    #[must_use]
    pub fn free_run_limit(&self) -> u32 {
        self.config.free_run_limit
    }

    /// Returns the number of free runs consumed so far.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the counter cannot be read or is corrupt.
    pub fn used_free_runs(&self) -> Result<u32, QuotaError> {
        match self.store.get(USAGE_COUNT_KEY).map_err(store_error)? {
            None => Ok(0),
            Some(raw) => raw.trim().parse().map_err(store_error),
        }
    }

    /// Returns `max(0, limit - used)`.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the counter cannot be read.
    pub fn remaining_free_runs(&self) -> Result<u32, QuotaError> {
        Ok(self
            .config
            .free_run_limit
            .saturating_sub(self.used_free_runs()?))
    }

    /// Returns the stored credential, if any.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the store cannot be read.
    pub fn credential(&self) -> Result<Option<String>, QuotaError> {
        self.store.get(CREDENTIAL_KEY).map_err(store_error)
    }

    /// Returns true if a credential is stored.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the store cannot be read.
    pub fn has_credential(&self) -> Result<bool, QuotaError> {
        Ok(self.credential()?.is_some())
    }

    /// Decides whether an AI execution may proceed.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the store cannot be read.
    pub fn can_run(&self) -> Result<RunPermission, QuotaError> {
        if self.has_credential()? {
            return Ok(RunPermission::Credential);
        }

        let remaining = self.remaining_free_runs()?;
        if remaining == 0 {
            return Ok(RunPermission::Denied {
                reason: format!(
                    "all {} free runs have been used; add a credential to continue",
                    self.config.free_run_limit
                ),
            });
        }
        Ok(RunPermission::FreeRun { remaining })
    }

    /// Records one successful AI execution.
    ///
    /// Runs made with a credential do not consume the free quota. Returns the
    /// free runs remaining afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the counter cannot be updated.
    pub fn record_run(&self) -> Result<u32, QuotaError> {
        if self.has_credential()? {
            debug!("run attributed to credential; free quota untouched");
            return self.remaining_free_runs();
        }

        let used = self.store.increment(USAGE_COUNT_KEY).map_err(store_error)?;
        let remaining = self.config.free_run_limit.saturating_sub(used);
        debug!(used, remaining, "recorded free run");
        Ok(remaining)
    }

    /// Aligns the local counter with the server's view of remaining runs.
    ///
    /// The counter only ever moves up, so the local view can never be more
    /// generous than the server.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the counter cannot be read or written.
    pub fn reconcile(&self, server_remaining: u32) -> Result<(), QuotaError> {
        let implied_used = self.config.free_run_limit.saturating_sub(server_remaining);
        let used = self.used_free_runs()?;
        if implied_used > used {
            debug!(used, implied_used, "raising usage counter to match server");
            self.store
                .set(USAGE_COUNT_KEY, &implied_used.to_string())
                .map_err(store_error)?;
        }
        Ok(())
    }

    /// Stores a user credential, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCredential` for a blank credential and `Store` if it
    /// cannot be persisted.
    pub fn save_credential(&self, credential: &str) -> Result<(), QuotaError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(QuotaError::EmptyCredential);
        }
        self.store
            .set(CREDENTIAL_KEY, credential)
            .map_err(store_error)?;
        info!("credential saved");
        Ok(())
    }

    /// Removes the stored credential.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the store cannot be written.
    pub fn clear_credential(&self) -> Result<(), QuotaError> {
        self.store.remove(CREDENTIAL_KEY).map_err(store_error)?;
        info!("credential cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn gate_with_limit(limit: u32) -> UsageGate {
        UsageGate::open(
            Arc::new(MemoryStore::new()),
            QuotaConfig {
                free_run_limit: limit,
            },
        )
        .unwrap()
    }

    #[test]
    fn fresh_gate_grants_full_quota() {
        let gate = gate_with_limit(3);
        assert_eq!(gate.remaining_free_runs().unwrap(), 3);
        assert_eq!(
            gate.can_run().unwrap(),
            RunPermission::FreeRun { remaining: 3 }
        );
        assert!(!gate.has_credential().unwrap());
    }

    #[test]
    fn remaining_runs_track_recorded_runs() {
        let gate = gate_with_limit(3);
        for n in 1..=5u32 {
            gate.record_run().unwrap();
            assert_eq!(gate.remaining_free_runs().unwrap(), 3u32.saturating_sub(n));
        }
    }

    #[test]
    fn exhausted_quota_denies() {
        let gate = gate_with_limit(2);
        gate.record_run().unwrap();
        gate.record_run().unwrap();

        let permission = gate.can_run().unwrap();
        assert!(!permission.is_allowed());
        assert!(permission.reason().unwrap().contains("2 free runs"));
    }

    #[test]
    fn credential_lifts_the_cap_and_is_not_counted() {
        let gate = gate_with_limit(1);
        gate.record_run().unwrap();
        assert!(!gate.can_run().unwrap().is_allowed());

        gate.save_credential("  sk-user  ").unwrap();
        assert_eq!(gate.credential().unwrap().as_deref(), Some("sk-user"));
        assert_eq!(gate.can_run().unwrap(), RunPermission::Credential);

        gate.record_run().unwrap();
        assert_eq!(gate.used_free_runs().unwrap(), 1);

        gate.clear_credential().unwrap();
        assert!(!gate.can_run().unwrap().is_allowed());
    }

    #[test]
    fn blank_credential_is_rejected() {
        let gate = gate_with_limit(1);
        assert_eq!(
            gate.save_credential("   "),
            Err(QuotaError::EmptyCredential)
        );
    }

    #[test]
    fn fingerprint_is_stable_for_a_store() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let first = UsageGate::open(Arc::clone(&store), QuotaConfig::default()).unwrap();
        let second = UsageGate::open(store, QuotaConfig::default()).unwrap();
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert!(first.fingerprint().as_str().starts_with("client_"));
    }

    #[test]
    fn separate_stores_do_not_share_usage() {
        let a = gate_with_limit(2);
        let b = gate_with_limit(2);
        a.record_run().unwrap();
        assert_eq!(a.remaining_free_runs().unwrap(), 1);
        assert_eq!(b.remaining_free_runs().unwrap(), 2);
    }

    #[test]
    fn reconcile_only_moves_up() {
        let gate = gate_with_limit(5);
        gate.reconcile(2).unwrap();
        assert_eq!(gate.remaining_free_runs().unwrap(), 2);

        gate.reconcile(4).unwrap();
        assert_eq!(gate.remaining_free_runs().unwrap(), 2);
    }

    #[test]
    fn default_limit() {
        assert_eq!(QuotaConfig::default().free_run_limit, FREE_RUN_LIMIT);
    }
}
