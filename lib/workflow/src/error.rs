//! Error types for the workflow crate.
//!
//! - `GraphError`: editing operations on a workflow (nodes, ports, connections)
//! - `ImportError`: decoding a workflow document
//! - `RunError`: refusals and failures of a workflow run
//!
//! Validation findings are not errors of an operation; they are collected in
//! a `ValidationReport` (see `validation`).

use crate::execution::ExecutionState;
use crate::port::PortKind;
use crate::validation::{RequiredInput, ValidationError};
use skillchain_core::{ConnectionId, NodeId};
use std::fmt;

/// Errors from editing a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the workflow.
    NodeNotFound { node_id: NodeId },
    /// Connection with the given ID was not found in the workflow.
    ConnectionNotFound { connection_id: ConnectionId },
    /// A node with this ID already exists.
    DuplicateNode { node_id: NodeId },
    /// A connection with this ID already exists.
    DuplicateConnection { connection_id: ConnectionId },
    /// The skill is not in the catalog.
    UnknownSkill { skill_id: String },
    /// Source port not found on node.
    SourcePortNotFound { node_id: NodeId, port_id: String },
    /// Target port not found on node.
    TargetPortNotFound { node_id: NodeId, port_id: String },
    /// The output kind cannot feed the input kind.
    IncompatiblePorts {
        output_kind: PortKind,
        input_kind: PortKind,
    },
    /// A node cannot feed itself.
    SelfConnection { node_id: NodeId },
    /// No connection gesture is in progress.
    NoPendingConnection,
    /// The workflow is locked while a run is in progress.
    Locked,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::ConnectionNotFound { connection_id } => {
                write!(f, "connection not found: {connection_id}")
            }
            Self::DuplicateNode { node_id } => write!(f, "duplicate node id: {node_id}"),
            Self::DuplicateConnection { connection_id } => {
                write!(f, "duplicate connection id: {connection_id}")
            }
            Self::UnknownSkill { skill_id } => write!(f, "unknown skill: {skill_id}"),
            Self::SourcePortNotFound { node_id, port_id } => {
                write!(f, "output '{port_id}' not found on node {node_id}")
            }
            Self::TargetPortNotFound { node_id, port_id } => {
                write!(f, "input '{port_id}' not found on node {node_id}")
            }
            Self::IncompatiblePorts {
                output_kind,
                input_kind,
            } => write!(
                f,
                "Incompatible types: {output_kind} cannot connect to {input_kind}"
            ),
            Self::SelfConnection { node_id } => {
                write!(f, "node {node_id} cannot connect to itself")
            }
            Self::NoPendingConnection => write!(f, "no connection in progress"),
            Self::Locked => write!(f, "workflow is locked while a run is in progress"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors from decoding a workflow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Not JSON, or a required field is missing or mistyped.
    Malformed { details: String },
    /// Two nodes share an ID.
    DuplicateNode { node_id: NodeId },
    /// Two connections share an ID.
    DuplicateConnection { connection_id: ConnectionId },
    /// Two connections feed the same input.
    OccupiedInput { node_id: NodeId, input_id: String },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { details } => write!(f, "malformed workflow document: {details}"),
            Self::DuplicateNode { node_id } => {
                write!(f, "workflow document repeats node id {node_id}")
            }
            Self::DuplicateConnection { connection_id } => {
                write!(f, "workflow document repeats connection id {connection_id}")
            }
            Self::OccupiedInput { node_id, input_id } => {
                write!(f, "workflow document feeds {node_id}.{input_id} twice")
            }
        }
    }
}

impl std::error::Error for ImportError {}

/// Errors from running a workflow.
///
/// The first two variants are refusals: nothing ran. The rest stop a run in
/// progress and carry the state reached so far, including the outputs of
/// every node that completed.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// The workflow failed validation.
    Invalid { errors: Vec<ValidationError> },
    /// Required inputs have neither a connection nor an initial value.
    InputsRequired { missing: Vec<RequiredInput> },
    /// The free quota is exhausted, locally or according to the backend.
    QuotaExceeded {
        node_id: NodeId,
        reason: String,
        state: Box<ExecutionState>,
    },
    /// The backend rejected the stored credential.
    InvalidCredential {
        node_id: NodeId,
        reason: String,
        state: Box<ExecutionState>,
    },
    /// A node failed.
    NodeFailed {
        node_id: NodeId,
        reason: String,
        state: Box<ExecutionState>,
    },
}

impl RunError {
    /// Returns the state reached before the run stopped, if it started.
    #[must_use]
    pub fn partial_state(&self) -> Option<&ExecutionState> {
        match self {
            Self::Invalid { .. } | Self::InputsRequired { .. } => None,
            Self::QuotaExceeded { state, .. }
            | Self::InvalidCredential { state, .. }
            | Self::NodeFailed { state, .. } => Some(state),
        }
    }

    /// Returns the node that was executing when the run stopped.
    #[must_use]
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Self::Invalid { .. } | Self::InputsRequired { .. } => None,
            Self::QuotaExceeded { node_id, .. }
            | Self::InvalidCredential { node_id, .. }
            | Self::NodeFailed { node_id, .. } => Some(node_id),
        }
    }

    /// Returns true if the run stopped for lack of quota.
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { errors } => {
                write!(f, "workflow is invalid")?;
                for (i, error) in errors.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{sep}{error}")?;
                }
                Ok(())
            }
            Self::InputsRequired { missing } => {
                write!(f, "{} required input(s) need a value", missing.len())?;
                for (i, input) in missing.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { ", " };
                    write!(f, "{sep}{}.{}", input.node_id, input.input_id)?;
                }
                Ok(())
            }
            Self::QuotaExceeded { node_id, reason, .. } => {
                write!(f, "quota exceeded at node {node_id}: {reason}")
            }
            Self::InvalidCredential { node_id, reason, .. } => {
                write!(f, "credential rejected at node {node_id}: {reason}")
            }
            Self::NodeFailed { node_id, reason, .. } => {
                write!(f, "node {node_id} failed: {reason}")
            }
        }
    }
}

impl std::error::Error for RunError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionMode;

    #[test]
    fn graph_error_display() {
        let err = GraphError::NodeNotFound {
            node_id: NodeId::from("n1"),
        };
        assert_eq!(err.to_string(), "node not found: n1");

        let err = GraphError::IncompatiblePorts {
            output_kind: PortKind::Image,
            input_kind: PortKind::Text,
        };
        assert_eq!(
            err.to_string(),
            "Incompatible types: image cannot connect to text"
        );
    }

    #[test]
    fn import_error_display() {
        let err = ImportError::DuplicateNode {
            node_id: NodeId::from("n1"),
        };
        assert!(err.to_string().contains("repeats node id n1"));
    }

    #[test]
    fn refusals_carry_no_state() {
        let err = RunError::Invalid {
            errors: vec![ValidationError::NameRequired, ValidationError::NoNodes],
        };
        assert!(err.partial_state().is_none());
        assert!(err.node_id().is_none());
        assert_eq!(
            err.to_string(),
            "workflow is invalid: Workflow name is required; Workflow must have at least one skill"
        );
    }

    #[test]
    fn failures_carry_partial_state() {
        let state = ExecutionState::new(ExecutionMode::Ai);
        let err = RunError::QuotaExceeded {
            node_id: NodeId::from("w"),
            reason: "no free runs left".to_string(),
            state: Box::new(state.clone()),
        };
        assert!(err.is_quota_exceeded());
        assert_eq!(err.partial_state(), Some(&state));
        assert_eq!(err.node_id(), Some(&NodeId::from("w")));
        assert!(err.to_string().contains("quota exceeded at node w"));
    }
}
