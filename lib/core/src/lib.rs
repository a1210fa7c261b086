//! Core types shared by every skillchain crate.
//!
//! This crate provides the opaque identifier types used by workflows, nodes,
//! connections and clients, plus the rootcause-based `Result` alias.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ClientFingerprint, ConnectionId, NodeId, ParseIdError, WorkflowId};
