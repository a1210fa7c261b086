//! Sequential workflow scheduler.
//!
//! A run validates the workflow, checks that every required input can be
//! satisfied, then executes nodes one at a time in dependency-layer order.
//! Nodes that cannot be ordered (cycles) run last with whatever inputs are
//! available. The first failure stops the run; outputs of nodes that already
//! completed are kept in the state carried by the error.
//!
//! Dropping the future returned by `execute` abandons the run. Nothing
//! outside the run is affected except the usage counter, which already
//! reflects the backend calls that completed.

use crate::definition::Workflow;
use crate::error::RunError;
use crate::execution::{ExecutionMode, ExecutionState, InitialInputs, PortValues};
use crate::graph::compute_layers;
use crate::node::WorkflowNode;
use crate::simulate::simulate_outputs;
use crate::skill::{SkillCatalog, SkillSchema};
use crate::validation::{required_inputs, validate};
use serde_json::Value as JsonValue;
use skillchain_ai::{BackendError, SkillBackend, SkillRequest};
use skillchain_core::NodeId;
use skillchain_quota::{QuotaError, RunPermission, UsageGate};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

/// Receives a snapshot after every run transition.
pub trait ProgressSink: Send + Sync {
    /// Called with the current state. Implementations copy what they keep.
    fn on_progress(&self, state: &ExecutionState);
}

impl<F> ProgressSink for F
where
    F: Fn(&ExecutionState) + Send + Sync,
{
    fn on_progress(&self, state: &ExecutionState) {
        self(state);
    }
}

impl ProgressSink for UnboundedSender<ExecutionState> {
    fn on_progress(&self, state: &ExecutionState) {
        // a closed channel means nobody is watching anymore
        let _ = self.send(state.clone());
    }
}

/// A sink that discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _state: &ExecutionState) {}
}

enum StepFailure {
    QuotaExceeded(String),
    InvalidCredential(String),
    Failed(String),
}

impl StepFailure {
    fn usage(e: QuotaError) -> Self {
        Self::Failed(format!("usage state unavailable: {e}"))
    }
}

impl From<BackendError> for StepFailure {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::QuotaExceeded { message } => Self::QuotaExceeded(message),
            BackendError::InvalidCredential { message } => Self::InvalidCredential(message),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Executes workflows against a skill backend.
pub struct WorkflowRunner {
    catalog: Arc<dyn SkillCatalog>,
    backend: Arc<dyn SkillBackend>,
    gate: UsageGate,
}

impl WorkflowRunner {
    /// Creates a runner.
    pub fn new(
        catalog: Arc<dyn SkillCatalog>,
        backend: Arc<dyn SkillBackend>,
        gate: UsageGate,
    ) -> Self {
        Self {
            catalog,
            backend,
            gate,
        }
    }

    /// Returns the usage gate consulted before AI calls.
    #[must_use]
    pub fn gate(&self) -> &UsageGate {
        &self.gate
    }

    /// Runs a workflow to completion or first failure.
    ///
    /// `progress` sees one snapshot when the run starts, one when each node
    /// starts and completes, and one when the run ends.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` or `InputsRequired` without running anything.
    /// Returns `QuotaExceeded`, `InvalidCredential` or `NodeFailed` when a
    /// node stops the run; each carries the partial state.
    #[instrument(skip_all, fields(workflow_id = %workflow.id, mode = %mode))]
    pub async fn execute(
        &self,
        workflow: &Workflow,
        initial_inputs: &InitialInputs,
        mode: ExecutionMode,
        progress: &dyn ProgressSink,
    ) -> Result<ExecutionState, RunError> {
        let report = validate(workflow, self.catalog.as_ref());
        if !report.is_valid() {
            warn!(errors = report.errors.len(), "refusing invalid workflow");
            return Err(RunError::Invalid {
                errors: report.errors,
            });
        }
        for warning in &report.warnings {
            warn!(%warning, "running despite warning");
        }

        let missing = required_inputs(workflow, self.catalog.as_ref(), initial_inputs);
        if !missing.is_empty() {
            warn!(missing = missing.len(), "required inputs have no value");
            return Err(RunError::InputsRequired { missing });
        }

        let order = compute_layers(workflow).execution_order();
        let mut state = ExecutionState::new(mode);
        state.start();
        progress.on_progress(&state);
        info!(nodes = order.len(), "run started");

        for node_id in order {
            let Some(node) = workflow.node(&node_id) else {
                continue;
            };
            let Some(skill) = self.catalog.skill(&node.skill_id) else {
                continue;
            };

            state.begin_node(node_id.clone());
            progress.on_progress(&state);

            let inputs = resolve_inputs(workflow, &node_id, skill, initial_inputs, &state);
            let outputs = match mode {
                ExecutionMode::Simulate => simulate_outputs(skill, &inputs),
                ExecutionMode::Ai => match self.invoke_skill(node, skill, inputs).await {
                    Ok(outputs) => outputs,
                    Err(failure) => return Err(stop(state, node_id, failure, progress)),
                },
            };

            debug!(node_id = %node_id, outputs = outputs.len(), "node completed");
            state.complete_node(node_id, outputs);
            progress.on_progress(&state);
        }

        state.finish();
        progress.on_progress(&state);
        info!(completed = state.completed_node_ids.len(), "run completed");
        Ok(state)
    }

    async fn invoke_skill(
        &self,
        node: &WorkflowNode,
        skill: &SkillSchema,
        inputs: PortValues,
    ) -> Result<PortValues, StepFailure> {
        let credential = match self.gate.can_run().map_err(StepFailure::usage)? {
            RunPermission::Denied { reason } => return Err(StepFailure::QuotaExceeded(reason)),
            RunPermission::Credential => self.gate.credential().map_err(StepFailure::usage)?,
            RunPermission::FreeRun { remaining } => {
                debug!(remaining, "using a free run");
                None
            }
        };

        let request = SkillRequest::new(
            skill.id.as_str(),
            node.id.clone(),
            self.gate.fingerprint().clone(),
        )
        .with_inputs(inputs)
        .with_credential(credential);

        debug!(backend = self.backend.name(), skill_id = %skill.id, "invoking skill");
        let response = match self.backend.invoke(&request).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_quota_exceeded()
                    && let Err(store) = self.gate.reconcile(0)
                {
                    warn!(error = %store, "could not record exhausted quota");
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.gate.record_run() {
            warn!(error = %e, "could not record run");
        }
        if let Some(server_remaining) = response.remaining_free_runs
            && let Err(e) = self.gate.reconcile(server_remaining)
        {
            warn!(error = %e, "could not reconcile usage with backend");
        }

        let outputs = distribute_result(skill, response.result);
        let missing = missing_outputs(skill, &outputs);
        if !missing.is_empty() {
            warn!(
                node_id = %node.id,
                missing = %missing.join(", "),
                "backend result lacks some outputs"
            );
        }
        Ok(outputs)
    }
}

fn stop(
    mut state: ExecutionState,
    node_id: NodeId,
    failure: StepFailure,
    progress: &dyn ProgressSink,
) -> RunError {
    match failure {
        StepFailure::QuotaExceeded(reason) => {
            warn!(node_id = %node_id, %reason, "quota exceeded");
            state.exceed_quota(reason.clone());
            progress.on_progress(&state);
            RunError::QuotaExceeded {
                node_id,
                reason,
                state: Box::new(state),
            }
        }
        StepFailure::InvalidCredential(reason) => {
            warn!(node_id = %node_id, %reason, "credential rejected");
            state.fail(reason.clone());
            progress.on_progress(&state);
            RunError::InvalidCredential {
                node_id,
                reason,
                state: Box::new(state),
            }
        }
        StepFailure::Failed(reason) => {
            warn!(node_id = %node_id, %reason, "node failed");
            state.fail(reason.clone());
            progress.on_progress(&state);
            RunError::NodeFailed {
                node_id,
                reason,
                state: Box::new(state),
            }
        }
    }
}

/// Gathers a node's inputs: an initial value wins, otherwise the upstream
/// output feeding the input. Inputs with neither are omitted.
fn resolve_inputs(
    workflow: &Workflow,
    node_id: &NodeId,
    skill: &SkillSchema,
    initial_inputs: &InitialInputs,
    state: &ExecutionState,
) -> PortValues {
    let supplied = initial_inputs.get(node_id);
    let mut inputs = PortValues::new();
    for input in &skill.inputs {
        let value = supplied
            .and_then(|values| values.get(&input.id))
            .or_else(|| {
                let connection = workflow.incoming_connection(node_id, &input.id)?;
                state.output(&connection.source_node_id, &connection.source_output_id)
            });
        if let Some(value) = value {
            inputs.insert(input.id.clone(), value.clone());
        }
    }
    inputs
}

/// Maps a backend result onto the skill's outputs.
///
/// An object keyed by output IDs is split across those outputs. Any other
/// value feeds every output. A skill without outputs stores it as `result`.
fn distribute_result(skill: &SkillSchema, result: JsonValue) -> PortValues {
    if skill.outputs.is_empty() {
        return PortValues::from([("result".to_string(), result)]);
    }
    if let JsonValue::Object(map) = &result
        && skill.outputs.iter().any(|o| map.contains_key(&o.id))
    {
        return skill
            .outputs
            .iter()
            .filter_map(|o| map.get(&o.id).map(|v| (o.id.clone(), v.clone())))
            .collect();
    }
    skill
        .outputs
        .iter()
        .map(|o| (o.id.clone(), result.clone()))
        .collect()
}

/// Returns the IDs of declared outputs that received no value.
fn missing_outputs<'a>(skill: &'a SkillSchema, outputs: &PortValues) -> Vec<&'a str> {
    skill
        .outputs
        .iter()
        .filter(|o| !outputs.contains_key(&o.id))
        .map(|o| o.id.as_str())
        .collect()
}
