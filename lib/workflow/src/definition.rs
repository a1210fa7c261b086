//! Workflow definition types.
//!
//! A workflow is a named set of skill nodes and the connections between
//! their ports. The aggregate keeps ID indexes for O(1) lookup and enforces
//! two structural rules on every edit:
//!
//! - node and connection IDs are unique
//! - each (target node, target input) pair has at most one incoming connection
//!
//! Kind compatibility and catalog membership are not enforced here. An
//! imported document may reference missing nodes or ports, and the validator
//! reports those instead.

use crate::connection::WorkflowConnection;
use crate::error::{GraphError, ImportError};
use crate::node::{Position, WorkflowNode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillchain_core::{ConnectionId, NodeId, WorkflowId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Descriptive fields of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    /// Human-readable name. Must be non-blank to run.
    pub name: String,
    /// Description of what this workflow does.
    pub description: String,
    /// Whether the workflow is shared publicly.
    pub is_public: bool,
    /// Tags for organization and filtering.
    pub tags: Vec<String>,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow was last changed.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowMetadata {
    /// Creates new metadata with default values.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: String::new(),
            is_public: false,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorkflowRecord", into = "WorkflowRecord")]
pub struct Workflow {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// Workflow metadata.
    pub metadata: WorkflowMetadata,
    nodes: Vec<WorkflowNode>,
    connections: Vec<WorkflowConnection>,
    node_index: HashMap<NodeId, usize>,
    connection_index: HashMap<ConnectionId, usize>,
}

impl Workflow {
    /// Creates an empty workflow with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(WorkflowId::new(), name)
    }

    /// Creates an empty workflow with a specific ID.
    #[must_use]
    pub fn with_id(id: WorkflowId, name: impl Into<String>) -> Self {
        Self {
            id,
            metadata: WorkflowMetadata::new(name),
            nodes: Vec::new(),
            connections: Vec::new(),
            node_index: HashMap::new(),
            connection_index: HashMap::new(),
        }
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns the nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.nodes
    }

    /// Returns the connections in insertion order.
    #[must_use]
    pub fn connections(&self) -> &[WorkflowConnection] {
        &self.connections
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns a node by its ID.
    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&WorkflowNode> {
        self.node_index.get(node_id).map(|&i| &self.nodes[i])
    }

    /// Returns true if the workflow contains the node.
    #[must_use]
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.node_index.contains_key(node_id)
    }

    /// Returns a connection by its ID.
    #[must_use]
    pub fn connection(&self, connection_id: &ConnectionId) -> Option<&WorkflowConnection> {
        self.connection_index
            .get(connection_id)
            .map(|&i| &self.connections[i])
    }

    /// Returns the connection feeding the given input, if any.
    #[must_use]
    pub fn incoming_connection(
        &self,
        node_id: &NodeId,
        input_id: &str,
    ) -> Option<&WorkflowConnection> {
        self.connections.iter().find(|c| c.feeds(node_id, input_id))
    }

    /// Adds a node.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNode` if a node with the same ID exists.
    pub fn add_node(&mut self, node: WorkflowNode) -> Result<NodeId, GraphError> {
        if self.node_index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode { node_id: node.id });
        }
        let node_id = node.id.clone();
        self.node_index.insert(node_id.clone(), self.nodes.len());
        self.nodes.push(node);
        self.touch();
        Ok(node_id)
    }

    /// Removes a node together with every connection touching it.
    ///
    /// Returns the removed node and the connections removed with it.
    pub fn remove_node(
        &mut self,
        node_id: &NodeId,
    ) -> Option<(WorkflowNode, Vec<WorkflowConnection>)> {
        let index = self.node_index.get(node_id).copied()?;
        let node = self.nodes.remove(index);

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|c| c.touches(node_id));
        self.connections = kept;

        self.rebuild_indexes();
        self.touch();
        debug!(node_id = %node_id, connections = removed.len(), "removed node");
        Some((node, removed))
    }

    /// Moves a node on the canvas.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn move_node(&mut self, node_id: &NodeId, position: Position) -> Result<(), GraphError> {
        let index = self
            .node_index
            .get(node_id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;
        self.nodes[index].position = position;
        self.touch();
        Ok(())
    }

    /// Adds a connection, displacing any connection already feeding the
    /// same target input.
    ///
    /// Returns the displaced connection, if there was one.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if either endpoint is missing and
    /// `DuplicateConnection` if the connection ID is taken.
    pub fn connect(
        &mut self,
        connection: WorkflowConnection,
    ) -> Result<Option<WorkflowConnection>, GraphError> {
        for node_id in [&connection.source_node_id, &connection.target_node_id] {
            if !self.contains_node(node_id) {
                return Err(GraphError::NodeNotFound {
                    node_id: node_id.clone(),
                });
            }
        }
        if self.connection_index.contains_key(&connection.id) {
            return Err(GraphError::DuplicateConnection {
                connection_id: connection.id,
            });
        }

        let (target, input) = (&connection.target_node_id, &connection.target_input_id);
        let displaced = self
            .connections
            .iter()
            .position(|c| c.feeds(target, input))
            .map(|i| self.connections.remove(i));
        if let Some(old) = &displaced {
            debug!(
                displaced = %old.id,
                node_id = %connection.target_node_id,
                input = %connection.target_input_id,
                "input already connected; replacing"
            );
        }

        self.connections.push(connection);
        self.rebuild_connection_index();
        self.touch();
        Ok(displaced)
    }

    /// Removes a connection.
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> Option<WorkflowConnection> {
        let index = self.connection_index.get(connection_id).copied()?;
        let removed = self.connections.remove(index);
        self.rebuild_connection_index();
        self.touch();
        Some(removed)
    }

    /// Sets node positions in bulk. Unknown IDs are ignored.
    pub fn set_positions(&mut self, positions: &HashMap<NodeId, Position>) {
        for node in &mut self.nodes {
            if let Some(position) = positions.get(&node.id) {
                node.position = *position;
            }
        }
        self.touch();
    }

    /// Marks the workflow as changed now.
    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }

    fn rebuild_indexes(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        self.rebuild_connection_index();
    }

    fn rebuild_connection_index(&mut self) {
        self.connection_index = self
            .connections
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
    }
}

/// The flat JSON document form of a workflow.
///
/// `id`, `name`, `nodes` and `connections` are required. Every other field
/// falls back to a default when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRecord {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<WorkflowNode>,
    pub connections: Vec<WorkflowConnection>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TryFrom<WorkflowRecord> for Workflow {
    type Error = ImportError;

    fn try_from(record: WorkflowRecord) -> Result<Self, Self::Error> {
        let mut node_index = HashMap::with_capacity(record.nodes.len());
        for (i, node) in record.nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), i).is_some() {
                return Err(ImportError::DuplicateNode {
                    node_id: node.id.clone(),
                });
            }
        }

        let mut connection_index = HashMap::with_capacity(record.connections.len());
        let mut fed_inputs = HashSet::with_capacity(record.connections.len());
        for (i, connection) in record.connections.iter().enumerate() {
            if connection_index.insert(connection.id.clone(), i).is_some() {
                return Err(ImportError::DuplicateConnection {
                    connection_id: connection.id.clone(),
                });
            }
            let input = (&connection.target_node_id, connection.target_input_id.as_str());
            if !fed_inputs.insert(input) {
                return Err(ImportError::OccupiedInput {
                    node_id: connection.target_node_id.clone(),
                    input_id: connection.target_input_id.clone(),
                });
            }
        }

        Ok(Self {
            id: record.id,
            metadata: WorkflowMetadata {
                name: record.name,
                description: record.description,
                is_public: record.is_public,
                tags: record.tags,
                created_at: record.created_at,
                updated_at: record.updated_at,
            },
            nodes: record.nodes,
            connections: record.connections,
            node_index,
            connection_index,
        })
    }
}

impl From<Workflow> for WorkflowRecord {
    fn from(workflow: Workflow) -> Self {
        let WorkflowMetadata {
            name,
            description,
            is_public,
            tags,
            created_at,
            updated_at,
        } = workflow.metadata;
        Self {
            id: workflow.id,
            name,
            description,
            nodes: workflow.nodes,
            connections: workflow.connections,
            created_at,
            updated_at,
            is_public,
            tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, skill: &str) -> WorkflowNode {
        WorkflowNode::with_id(NodeId::from(id), skill, Position::default())
    }

    fn two_node_workflow() -> Workflow {
        let mut workflow = Workflow::new("Article pipeline");
        workflow.add_node(node("r", "research")).unwrap();
        workflow.add_node(node("w", "write")).unwrap();
        workflow
    }

    #[test]
    fn add_and_lookup_nodes() {
        let workflow = two_node_workflow();
        assert_eq!(workflow.node_count(), 2);
        assert_eq!(workflow.node(&NodeId::from("w")).unwrap().skill_id, "write");
        assert!(workflow.node(&NodeId::from("x")).is_none());
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut workflow = two_node_workflow();
        let err = workflow.add_node(node("r", "summarize")).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateNode {
                node_id: NodeId::from("r")
            }
        );
    }

    #[test]
    fn connect_requires_both_endpoints() {
        let mut workflow = two_node_workflow();
        let err = workflow
            .connect(WorkflowConnection::new(
                NodeId::from("r"),
                "findings",
                NodeId::from("ghost"),
                "draft",
            ))
            .unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound { .. }));
        assert_eq!(workflow.connection_count(), 0);
    }

    #[test]
    fn connect_displaces_existing_input_connection() {
        let mut workflow = two_node_workflow();
        workflow.add_node(node("s", "summarize")).unwrap();

        let first =
            WorkflowConnection::new(NodeId::from("r"), "findings", NodeId::from("w"), "draft");
        let first_id = first.id.clone();
        assert!(workflow.connect(first).unwrap().is_none());

        let second =
            WorkflowConnection::new(NodeId::from("s"), "summary", NodeId::from("w"), "draft");
        let displaced = workflow.connect(second).unwrap().expect("displaced");

        assert_eq!(displaced.id, first_id);
        assert_eq!(workflow.connection_count(), 1);
        let incoming = workflow
            .incoming_connection(&NodeId::from("w"), "draft")
            .unwrap();
        assert_eq!(incoming.source_node_id, NodeId::from("s"));
        assert!(workflow.connection(&first_id).is_none());
    }

    #[test]
    fn remove_node_cascades_connections() {
        let mut workflow = two_node_workflow();
        workflow.add_node(node("s", "summarize")).unwrap();
        workflow
            .connect(WorkflowConnection::new(
                NodeId::from("r"),
                "findings",
                NodeId::from("w"),
                "draft",
            ))
            .unwrap();
        let kept = WorkflowConnection::new(NodeId::from("s"), "summary", NodeId::from("w"), "tone");
        let kept_id = kept.id.clone();
        workflow.connect(kept).unwrap();

        let (removed, connections) = workflow.remove_node(&NodeId::from("r")).unwrap();
        assert_eq!(removed.id, NodeId::from("r"));
        assert_eq!(connections.len(), 1);
        assert_eq!(workflow.connection_count(), 1);
        assert!(workflow.connection(&kept_id).is_some());
        // indexes are rebuilt after removal
        let survivor = workflow.node(&NodeId::from("s")).unwrap();
        assert_eq!(survivor.skill_id, "summarize");
        assert!(workflow.remove_node(&NodeId::from("r")).is_none());
    }

    #[test]
    fn move_and_disconnect() {
        let mut workflow = two_node_workflow();
        workflow
            .move_node(&NodeId::from("w"), Position::new(400.0, 80.0))
            .unwrap();
        assert_eq!(
            workflow.node(&NodeId::from("w")).unwrap().position,
            Position::new(400.0, 80.0)
        );
        let missing = NodeId::from("x");
        assert!(workflow.move_node(&missing, Position::default()).is_err());

        let connection =
            WorkflowConnection::new(NodeId::from("r"), "findings", NodeId::from("w"), "draft");
        let id = connection.id.clone();
        workflow.connect(connection).unwrap();
        assert!(workflow.disconnect(&id).is_some());
        assert!(workflow.disconnect(&id).is_none());
    }

    #[test]
    fn edits_advance_updated_at() {
        let mut workflow = Workflow::new("w");
        let before = workflow.metadata.updated_at;
        workflow.add_node(node("a", "research")).unwrap();
        assert!(workflow.metadata.updated_at >= before);
    }

    #[test]
    fn serializes_as_flat_document() {
        let workflow = two_node_workflow();
        let json = serde_json::to_value(&workflow).unwrap();
        assert_eq!(json["name"], "Article pipeline");
        assert!(json["nodes"].is_array());
        assert!(json["connections"].is_array());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["isPublic"], false);
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn deserialize_fills_defaults() {
        let workflow: Workflow = serde_json::from_str(
            r#"{"id": "wf_1", "name": "Imported", "nodes": [], "connections": []}"#,
        )
        .unwrap();
        assert_eq!(workflow.name(), "Imported");
        assert!(workflow.metadata.description.is_empty());
        assert!(workflow.metadata.tags.is_empty());
    }

    #[test]
    fn record_with_duplicate_nodes_is_rejected() {
        let record = WorkflowRecord {
            id: WorkflowId::from("wf_1"),
            name: "dup".to_string(),
            description: String::new(),
            nodes: vec![node("a", "research"), node("a", "write")],
            connections: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_public: false,
            tags: Vec::new(),
        };
        assert_eq!(
            Workflow::try_from(record).unwrap_err(),
            ImportError::DuplicateNode {
                node_id: NodeId::from("a")
            }
        );
    }
}
