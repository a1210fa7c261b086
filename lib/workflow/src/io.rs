//! Workflow documents.
//!
//! A workflow travels as a single flat JSON object. Export writes every
//! field; import requires `id`, `name`, `nodes` and `connections` and fills
//! the rest with defaults. Import checks structure only: IDs must be
//! non-empty and unique, and each input is fed at most once. Dangling
//! references survive it and are reported by `validate`.

use crate::definition::{Workflow, WorkflowRecord};
use crate::error::ImportError;
use tracing::debug;

/// Serializes a workflow to a pretty-printed JSON document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn export_workflow(workflow: &Workflow) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(workflow)
}

/// Parses a workflow document.
///
/// # Errors
///
/// Returns `Malformed` if the text is not JSON, lacks a required field or
/// has an empty ID, `DuplicateNode` or `DuplicateConnection` if IDs repeat,
/// and `OccupiedInput` if two connections feed the same input.
pub fn import_workflow(json: &str) -> Result<Workflow, ImportError> {
    let record: WorkflowRecord =
        serde_json::from_str(json).map_err(|e| ImportError::Malformed {
            details: e.to_string(),
        })?;
    let workflow = Workflow::try_from(record)?;
    debug!(
        workflow_id = %workflow.id,
        nodes = workflow.node_count(),
        connections = workflow.connection_count(),
        "imported workflow"
    );
    Ok(workflow)
}
