//! Dependency view of a workflow using petgraph.
//!
//! The view is derived on demand from a `Workflow` and never stored. Nodes
//! are added in workflow order, so petgraph node indices follow insertion
//! order, and layering uses that to stay deterministic. Connections with a
//! missing endpoint are skipped here; the validator reports them.

use crate::definition::Workflow;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use skillchain_core::{ConnectionId, NodeId};
use std::collections::HashMap;

/// Nodes grouped by dependency depth.
///
/// Layer 0 holds nodes with no incoming connections. Layer k+1 holds nodes
/// whose last incoming connection comes from layer k or earlier. Nodes that
/// never reach in-degree zero (cycle members and everything downstream of
/// them) are collected in `remainder`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Layering {
    /// Layers in dependency order.
    pub layers: Vec<Vec<NodeId>>,
    /// Nodes that could not be ordered, in workflow order.
    pub remainder: Vec<NodeId>,
}

impl Layering {
    /// Returns every node in run order: layers first, remainder last.
    #[must_use]
    pub fn execution_order(&self) -> Vec<NodeId> {
        self.layers
            .iter()
            .flatten()
            .chain(&self.remainder)
            .cloned()
            .collect()
    }

    /// Returns the layers with the remainder appended as a final layer when
    /// it is non-empty.
    #[must_use]
    pub fn columns(&self) -> Vec<&[NodeId]> {
        let mut columns: Vec<&[NodeId]> = self.layers.iter().map(Vec::as_slice).collect();
        if !self.remainder.is_empty() {
            columns.push(&self.remainder);
        }
        columns
    }

    /// Returns true if some nodes could not be ordered.
    #[must_use]
    pub fn has_remainder(&self) -> bool {
        !self.remainder.is_empty()
    }

    /// Returns the total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum::<usize>() + self.remainder.len()
    }
}

/// A directed graph of node dependencies.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<NodeId, ConnectionId>,
    node_index_map: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
    /// Builds the dependency view of a workflow.
    #[must_use]
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let mut graph = DiGraph::with_capacity(workflow.node_count(), workflow.connection_count());
        let mut node_index_map = HashMap::with_capacity(workflow.node_count());

        for node in workflow.nodes() {
            let index = graph.add_node(node.id.clone());
            node_index_map.insert(node.id.clone(), index);
        }

        for connection in workflow.connections() {
            let (Some(&source), Some(&target)) = (
                node_index_map.get(&connection.source_node_id),
                node_index_map.get(&connection.target_node_id),
            ) else {
                continue;
            };
            graph.add_edge(source, target, connection.id.clone());
        }

        Self {
            graph,
            node_index_map,
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of resolvable connections.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns nodes that have no incoming connections, in workflow order.
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    /// Returns the downstream nodes of a node, one entry per connection.
    #[must_use]
    pub fn successors(&self, node_id: &NodeId) -> Vec<NodeId> {
        let Some(&index) = self.node_index_map.get(node_id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| self.graph[edge.target()].clone())
            .collect()
    }

    /// Returns true if any directed cycle exists, self-loops included.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    fn node_ids(&self, indices: &[NodeIndex]) -> Vec<NodeId> {
        indices.iter().map(|&idx| self.graph[idx].clone()).collect()
    }

    /// Groups nodes into dependency layers with Kahn's algorithm.
    ///
    /// Nodes within a layer keep workflow order.
    #[must_use]
    pub fn layering(&self) -> Layering {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.in_degree(idx))
            .collect();
        let mut placed = vec![false; self.graph.node_count()];

        let mut frontier: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] == 0)
            .collect();
        let mut layers = Vec::new();

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for &idx in &frontier {
                placed[idx.index()] = true;
                for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                    let target = edge.target();
                    in_degree[target.index()] -= 1;
                    if in_degree[target.index()] == 0 {
                        next.push(target);
                    }
                }
            }
            layers.push(self.node_ids(&frontier));
            next.sort_unstable();
            frontier = next;
        }

        let remainder = self
            .graph
            .node_indices()
            .filter(|idx| !placed[idx.index()])
            .map(|idx| self.graph[idx].clone())
            .collect();

        Layering { layers, remainder }
    }
}

/// Computes the dependency layering of a workflow.
#[must_use]
pub fn compute_layers(workflow: &Workflow) -> Layering {
    DependencyGraph::from_workflow(workflow).layering()
}
