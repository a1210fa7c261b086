//! Interactive workflow editing.
//!
//! `WorkflowEditor` wraps a `Workflow` with the checks an interactive canvas
//! needs: skills must exist in the catalog, connections are made by a
//! start/complete gesture that only accepts compatible ports, and the whole
//! workflow is read-only while a run is in progress.

use crate::connection::{PendingConnection, WorkflowConnection};
use crate::definition::Workflow;
use crate::error::GraphError;
use crate::graph::Layering;
use crate::layout::{LayoutConfig, auto_arrange};
use crate::node::{Position, WorkflowNode};
use crate::port::{PortKind, is_compatible};
use crate::skill::SkillCatalog;
use skillchain_core::{ConnectionId, NodeId};
use std::sync::Arc;
use tracing::debug;

/// The result of completing a connection gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// ID of the new connection.
    pub connection_id: ConnectionId,
    /// The connection it replaced on the same input, if any.
    pub displaced: Option<WorkflowConnection>,
}

/// An input that may receive the pending connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub node_id: NodeId,
    pub input_id: String,
    pub kind: PortKind,
}

/// Catalog-aware editor over one workflow.
pub struct WorkflowEditor {
    workflow: Workflow,
    catalog: Arc<dyn SkillCatalog>,
    pending: Option<PendingConnection>,
    locked: bool,
}

impl WorkflowEditor {
    /// Starts editing `workflow`.
    pub fn new(workflow: Workflow, catalog: Arc<dyn SkillCatalog>) -> Self {
        Self {
            workflow,
            catalog,
            pending: None,
            locked: false,
        }
    }

    /// Returns the workflow being edited.
    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Stops editing and returns the workflow.
    #[must_use]
    pub fn into_workflow(self) -> Workflow {
        self.workflow
    }

    /// Makes the workflow read-only, e.g. for the duration of a run. Any
    /// gesture in progress is cancelled.
    pub fn lock(&mut self) {
        self.locked = true;
        self.pending = None;
    }

    /// Makes the workflow editable again.
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Returns true while the workflow is read-only.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn ensure_unlocked(&self) -> Result<(), GraphError> {
        if self.locked {
            Err(GraphError::Locked)
        } else {
            Ok(())
        }
    }

    /// Places a new node running `skill_id`.
    ///
    /// # Errors
    ///
    /// Returns `Locked` or `UnknownSkill`.
    pub fn add_skill(
        &mut self,
        skill_id: &str,
        position: Position,
    ) -> Result<NodeId, GraphError> {
        self.ensure_unlocked()?;
        if self.catalog.skill(skill_id).is_none() {
            return Err(GraphError::UnknownSkill {
                skill_id: skill_id.to_string(),
            });
        }
        self.workflow.add_node(WorkflowNode::new(skill_id, position))
    }

    /// Removes a node and its connections.
    ///
    /// # Errors
    ///
    /// Returns `Locked` or `NodeNotFound`.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Result<WorkflowNode, GraphError> {
        self.ensure_unlocked()?;
        let (node, _) = self
            .workflow
            .remove_node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;
        if self
            .pending
            .as_ref()
            .is_some_and(|p| &p.source_node_id == node_id)
        {
            self.pending = None;
        }
        Ok(node)
    }

    /// Moves a node.
    ///
    /// # Errors
    ///
    /// Returns `Locked` or `NodeNotFound`.
    pub fn move_node(&mut self, node_id: &NodeId, position: Position) -> Result<(), GraphError> {
        self.ensure_unlocked()?;
        self.workflow.move_node(node_id, position)
    }

    /// Removes a connection.
    ///
    /// # Errors
    ///
    /// Returns `Locked` or `ConnectionNotFound`.
    pub fn disconnect(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Result<WorkflowConnection, GraphError> {
        self.ensure_unlocked()?;
        self.workflow
            .disconnect(connection_id)
            .ok_or_else(|| GraphError::ConnectionNotFound {
                connection_id: connection_id.clone(),
            })
    }

    /// Lays the workflow out left to right.
    ///
    /// # Errors
    ///
    /// Returns `Locked`.
    pub fn auto_arrange(&mut self, config: &LayoutConfig) -> Result<Layering, GraphError> {
        self.ensure_unlocked()?;
        Ok(auto_arrange(&mut self.workflow, config))
    }

    fn output_kind(&self, node_id: &NodeId, output_id: &str) -> Result<PortKind, GraphError> {
        let node = self
            .workflow
            .node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;
        self.catalog
            .skill(&node.skill_id)
            .and_then(|skill| skill.output(output_id))
            .map(|port| port.kind)
            .ok_or_else(|| GraphError::SourcePortNotFound {
                node_id: node_id.clone(),
                port_id: output_id.to_string(),
            })
    }

    /// Begins a connection gesture at a node's output, replacing any gesture
    /// already in progress.
    ///
    /// # Errors
    ///
    /// Returns `Locked`, `NodeNotFound` or `SourcePortNotFound`.
    pub fn start_connection(
        &mut self,
        node_id: &NodeId,
        output_id: &str,
    ) -> Result<(), GraphError> {
        self.ensure_unlocked()?;
        self.output_kind(node_id, output_id)?;
        self.pending = Some(PendingConnection::new(node_id.clone(), output_id));
        Ok(())
    }

    /// Returns the gesture in progress, if any.
    #[must_use]
    pub fn pending_connection(&self) -> Option<&PendingConnection> {
        self.pending.as_ref()
    }

    /// Abandons the gesture in progress.
    pub fn cancel_connection(&mut self) {
        self.pending = None;
    }

    /// Lists every input the pending connection may end on: inputs of other
    /// nodes whose kind accepts the pending output. Empty when no gesture is
    /// in progress.
    #[must_use]
    pub fn legal_targets(&self) -> Vec<ConnectTarget> {
        let Some(pending) = &self.pending else {
            return Vec::new();
        };
        let Ok(output_kind) = self.output_kind(&pending.source_node_id, &pending.source_output_id)
        else {
            return Vec::new();
        };

        self.workflow
            .nodes()
            .iter()
            .filter(|node| node.id != pending.source_node_id)
            .filter_map(|node| Some((node, self.catalog.skill(&node.skill_id)?)))
            .flat_map(|(node, skill)| {
                skill
                    .inputs
                    .iter()
                    .filter(move |input| is_compatible(output_kind, input.kind))
                    .map(move |input| ConnectTarget {
                        node_id: node.id.clone(),
                        input_id: input.id.clone(),
                        kind: input.kind,
                    })
            })
            .collect()
    }

    /// Ends the gesture on a target input.
    ///
    /// The gesture is consumed whether or not the connection is accepted.
    /// An existing connection on the same input is replaced and reported.
    ///
    /// # Errors
    ///
    /// Returns `Locked`, `NoPendingConnection`, `SelfConnection`,
    /// `NodeNotFound`, `TargetPortNotFound` or `IncompatiblePorts`.
    pub fn complete_connection(
        &mut self,
        target_node_id: &NodeId,
        target_input_id: &str,
    ) -> Result<ConnectOutcome, GraphError> {
        self.ensure_unlocked()?;
        let pending = self.pending.take().ok_or(GraphError::NoPendingConnection)?;

        if &pending.source_node_id == target_node_id {
            return Err(GraphError::SelfConnection {
                node_id: target_node_id.clone(),
            });
        }

        let output_kind = self.output_kind(&pending.source_node_id, &pending.source_output_id)?;
        let target = self
            .workflow
            .node(target_node_id)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: target_node_id.clone(),
            })?;
        let input_kind = self
            .catalog
            .skill(&target.skill_id)
            .and_then(|skill| skill.input(target_input_id))
            .map(|port| port.kind)
            .ok_or_else(|| GraphError::TargetPortNotFound {
                node_id: target_node_id.clone(),
                port_id: target_input_id.to_string(),
            })?;

        if !is_compatible(output_kind, input_kind) {
            return Err(GraphError::IncompatiblePorts {
                output_kind,
                input_kind,
            });
        }

        let connection = pending.complete(target_node_id.clone(), target_input_id);
        let connection_id = connection.id.clone();
        let displaced = self.workflow.connect(connection)?;
        debug!(
            connection_id = %connection_id,
            displaced = displaced.is_some(),
            "connection completed"
        );
        Ok(ConnectOutcome {
            connection_id,
            displaced,
        })
    }
}
