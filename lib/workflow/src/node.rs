//! Workflow nodes.
//!
//! A node is one placement of a catalog skill on the canvas. Its position is
//! layout-only data and has no effect on execution.

use serde::{Deserialize, Serialize};
use skillchain_core::NodeId;

/// A 2D canvas coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A skill instance placed in a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    /// Identifier, unique within the workflow.
    pub id: NodeId,
    /// The catalog skill this node runs.
    pub skill_id: String,
    /// Canvas position.
    #[serde(default)]
    pub position: Position,
}

impl WorkflowNode {
    /// Creates a node with a fresh id.
    #[must_use]
    pub fn new(skill_id: impl Into<String>, position: Position) -> Self {
        Self::with_id(NodeId::new(), skill_id, position)
    }

    /// Creates a node with a specific id.
    #[must_use]
    pub fn with_id(id: NodeId, skill_id: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            skill_id: skill_id.into(),
            position,
        }
    }
}
