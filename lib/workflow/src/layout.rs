//! Left-to-right auto layout.
//!
//! Each dependency layer becomes a column; nodes in a column are stacked and
//! centred vertically on a fixed line. Unorderable nodes get one extra
//! column after the last layer. Only positions change.

use crate::definition::Workflow;
use crate::graph::{Layering, compute_layers};
use crate::node::Position;
use serde::{Deserialize, Serialize};
use skillchain_core::NodeId;
use std::collections::HashMap;

/// Canvas geometry used by auto layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    pub horizontal_gap: f64,
    pub vertical_gap: f64,
    /// X of the first column.
    pub origin_x: f64,
    /// Y each column is centred on.
    pub center_y: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 280.0,
            node_height: 120.0,
            horizontal_gap: 100.0,
            vertical_gap: 40.0,
            origin_x: 50.0,
            center_y: 300.0,
        }
    }
}

impl LayoutConfig {
    fn column_x(&self, column: usize) -> f64 {
        self.origin_x + column as f64 * (self.node_width + self.horizontal_gap)
    }

    fn column_top(&self, len: usize) -> f64 {
        let n = len as f64;
        let block = n * self.node_height + (n - 1.0).max(0.0) * self.vertical_gap;
        self.center_y - block / 2.0
    }
}

/// Computes layered positions without touching the workflow.
#[must_use]
pub fn arranged_positions(workflow: &Workflow, config: &LayoutConfig) -> HashMap<NodeId, Position> {
    positions_for(&compute_layers(workflow), config)
}

/// Assigns layered positions to every node and returns the layering used.
pub fn auto_arrange(workflow: &mut Workflow, config: &LayoutConfig) -> Layering {
    let layering = compute_layers(workflow);
    workflow.set_positions(&positions_for(&layering, config));
    layering
}

fn positions_for(layering: &Layering, config: &LayoutConfig) -> HashMap<NodeId, Position> {
    let mut positions = HashMap::with_capacity(layering.node_count());
    for (column, nodes) in layering.columns().into_iter().enumerate() {
        let x = config.column_x(column);
        let top = config.column_top(nodes.len());
        for (row, node_id) in nodes.iter().enumerate() {
            let y = top + row as f64 * (config.node_height + config.vertical_gap);
            positions.insert(node_id.clone(), Position::new(x, y));
        }
    }
    positions
}
