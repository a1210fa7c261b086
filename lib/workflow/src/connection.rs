//! Connections between node ports.
//!
//! A connection carries one node's named output into another node's named
//! input. Connections are created by a two-step gesture: a
//! `PendingConnection` records the source port, and completing it against a
//! target port yields the `WorkflowConnection`.

use serde::{Deserialize, Serialize};
use skillchain_core::{ConnectionId, NodeId};

/// A directed edge from a source output to a target input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConnection {
    /// Identifier, unique within the workflow.
    pub id: ConnectionId,
    /// The producing node.
    pub source_node_id: NodeId,
    /// Output port id on the producing node.
    pub source_output_id: String,
    /// The consuming node.
    pub target_node_id: NodeId,
    /// Input port id on the consuming node.
    pub target_input_id: String,
}

impl WorkflowConnection {
    /// Creates a connection with a fresh id.
    #[must_use]
    pub fn new(
        source_node_id: NodeId,
        source_output_id: impl Into<String>,
        target_node_id: NodeId,
        target_input_id: impl Into<String>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            source_node_id,
            source_output_id: source_output_id.into(),
            target_node_id,
            target_input_id: target_input_id.into(),
        }
    }

    /// Replaces the id.
    #[must_use]
    pub fn with_id(mut self, id: ConnectionId) -> Self {
        self.id = id;
        self
    }

    /// Returns true if either endpoint is `node_id`.
    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source_node_id == node_id || &self.target_node_id == node_id
    }

    /// Returns true if this connection terminates at the given input.
    #[must_use]
    pub fn feeds(&self, node_id: &NodeId, input_id: &str) -> bool {
        &self.target_node_id == node_id && self.target_input_id == input_id
    }
}

/// The first half of the connect gesture: a chosen source output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConnection {
    /// The producing node.
    pub source_node_id: NodeId,
    /// Output port id on the producing node.
    pub source_output_id: String,
}

impl PendingConnection {
    /// Starts a connection from the given output.
    #[must_use]
    pub fn new(source_node_id: NodeId, source_output_id: impl Into<String>) -> Self {
        Self {
            source_node_id,
            source_output_id: source_output_id.into(),
        }
    }

    /// Completes the gesture against a target input.
    #[must_use]
    pub fn complete(
        self,
        target_node_id: NodeId,
        target_input_id: impl Into<String>,
    ) -> WorkflowConnection {
        WorkflowConnection::new(
            self.source_node_id,
            self.source_output_id,
            target_node_id,
            target_input_id,
        )
    }
}
