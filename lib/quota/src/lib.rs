//! Usage accounting for skillchain.
//!
//! Unauthenticated clients get a fixed number of free AI executions. The
//! counter, the optional user credential and the client fingerprint live in
//! a small key-value store that is injected into the gate, so tests and
//! separate client sessions never share state by accident.

pub mod error;
pub mod gate;
pub mod store;

pub use error::{QuotaError, StoreError};
pub use gate::{FREE_RUN_LIMIT, QuotaConfig, RunPermission, UsageGate};
pub use store::{FileStore, MemoryStore, StateStore};
