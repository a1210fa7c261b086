//! Workflow run state.
//!
//! `ExecutionState` is the snapshot a run reports to its observer after
//! every transition. It belongs to the run; observers receive copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use skillchain_core::NodeId;
use std::collections::HashMap;
use std::fmt;

/// Values keyed by port ID.
pub type PortValues = HashMap<String, JsonValue>;

/// Caller-supplied input values keyed by node, then input port.
pub type InitialInputs = HashMap<NodeId, PortValues>;

/// How nodes are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Call the skill backend.
    Ai,
    /// Produce placeholder outputs locally; no backend, no quota.
    Simulate,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ai => write!(f, "ai"),
            Self::Simulate => write!(f, "simulate"),
        }
    }
}

/// The overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Not started.
    Idle,
    /// Executing nodes.
    Running,
    /// Every node completed.
    Completed,
    /// A node failed.
    Failed,
    /// Stopped for lack of quota.
    QuotaExceeded,
}

impl RunStatus {
    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::QuotaExceeded)
    }
}

/// A snapshot of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    pub status: RunStatus,
    pub mode: ExecutionMode,
    /// Completed nodes, in completion order.
    pub completed_node_ids: Vec<NodeId>,
    /// The node executing right now, if any.
    pub current_node_id: Option<NodeId>,
    /// Outputs of completed nodes.
    pub node_outputs: HashMap<NodeId, PortValues>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionState {
    /// Creates an idle state.
    #[must_use]
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            status: RunStatus::Idle,
            mode,
            completed_node_ids: Vec::new(),
            current_node_id: None,
            node_outputs: HashMap::new(),
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Returns true while the run is executing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Returns true if the node has completed.
    #[must_use]
    pub fn is_completed(&self, node_id: &NodeId) -> bool {
        self.node_outputs.contains_key(node_id)
    }

    /// Returns one output value of a completed node.
    #[must_use]
    pub fn output(&self, node_id: &NodeId, output_id: &str) -> Option<&JsonValue> {
        self.node_outputs.get(node_id)?.get(output_id)
    }

    /// Starts the run.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Marks a node as executing.
    pub fn begin_node(&mut self, node_id: NodeId) {
        self.current_node_id = Some(node_id);
    }

    /// Records a node's outputs and marks it completed.
    pub fn complete_node(&mut self, node_id: NodeId, outputs: PortValues) {
        self.current_node_id = None;
        self.node_outputs.insert(node_id.clone(), outputs);
        self.completed_node_ids.push(node_id);
    }

    /// Marks the run as completed.
    pub fn finish(&mut self) {
        self.status = RunStatus::Completed;
        self.current_node_id = None;
        self.finished_at = Some(Utc::now());
    }

    /// Marks the run as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.stop(RunStatus::Failed, error.into());
    }

    /// Marks the run as stopped for lack of quota.
    pub fn exceed_quota(&mut self, error: impl Into<String>) {
        self.stop(RunStatus::QuotaExceeded, error.into());
    }

    fn stop(&mut self, status: RunStatus, error: String) {
        self.status = status;
        self.current_node_id = None;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }

    /// Returns the duration of the run, if it has started.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some(end - start)
    }
}
