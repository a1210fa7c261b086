//! Subcommand handlers.

use crate::args::{Command, CredentialAction, ModeArg, parse_inputs};
use crate::config::AppConfig;
use crate::error::CliError;
use skillchain_ai::HttpSkillBackend;
use skillchain_core::{NodeId, Result};
use skillchain_quota::{FileStore, UsageGate};
use skillchain_workflow::{
    ExecutionState, RunError, RunStatus, StaticCatalog, Workflow, WorkflowRunner, auto_arrange,
    export_workflow, import_workflow, required_inputs, validate,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Loaded configuration shared by every command.
pub struct Context {
    pub config: AppConfig,
}

impl Context {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn catalog(&self) -> std::result::Result<StaticCatalog, CliError> {
        let path = &self.config.catalog.path;
        let catalog_error = |details: String| CliError::Catalog {
            path: path.display().to_string(),
            details,
        };
        let json = fs::read_to_string(path).map_err(|e| catalog_error(e.to_string()))?;
        let catalog = StaticCatalog::from_json(&json).map_err(|e| catalog_error(e.to_string()))?;
        debug!(path = %path.display(), skills = catalog.len(), "loaded skill catalog");
        Ok(catalog)
    }

    fn gate(&self) -> std::result::Result<UsageGate, CliError> {
        let usage_error = |details: String| CliError::Usage { details };
        let store = FileStore::open(&self.config.quota.state_path)
            .map_err(|e| usage_error(e.to_string()))?;
        UsageGate::open(Arc::new(store), self.config.quota.gate_config())
            .map_err(|e| usage_error(e.to_string()))
    }

    /// Runs one subcommand.
    pub async fn dispatch(&self, command: Command) -> Result<(), CliError> {
        match command {
            Command::Validate(workflow) => self.validate(&workflow.path),
            Command::Arrange {
                workflow,
                output,
                in_place,
            } => {
                let target = if in_place {
                    Some(workflow.path.as_path())
                } else {
                    output.as_deref()
                };
                self.arrange(&workflow.path, target)
            }
            Command::Run {
                workflow,
                mode,
                inputs,
            } => self.run(&workflow.path, mode, &inputs).await,
            Command::Export { workflow, output } => {
                let workflow = read_workflow(&workflow.path)?;
                let json = export_workflow(&workflow).map_err(|e| CliError::Import {
                    details: e.to_string(),
                })?;
                write_document(output.as_deref(), &json)?;
                Ok(())
            }
            Command::Usage => self.usage(),
            Command::Credential { action } => self.credential(action),
        }
    }

    fn validate(&self, path: &Path) -> Result<(), CliError> {
        let workflow = read_workflow(path)?;
        let catalog = self.catalog()?;
        let report = validate(&workflow, &catalog);

        for error in &report.errors {
            println!("error: {error}");
        }
        for warning in &report.warnings {
            println!("warning: {warning}");
        }
        if !report.is_valid() {
            return Err(CliError::Invalid {
                errors: report.errors.len(),
            }
            .into());
        }

        for missing in required_inputs(&workflow, &catalog, &HashMap::new()) {
            println!(
                "input: {}.{} ({}, {})",
                missing.node_id, missing.input_id, missing.label, missing.kind
            );
        }
        println!(
            "ok: {} node(s), {} connection(s)",
            workflow.node_count(),
            workflow.connection_count()
        );
        Ok(())
    }

    fn arrange(&self, path: &Path, target: Option<&Path>) -> Result<(), CliError> {
        let mut workflow = read_workflow(path)?;
        let layering = auto_arrange(&mut workflow, &self.config.layout);
        if layering.has_remainder() {
            warn!(
                remainder = layering.remainder.len(),
                "cyclic nodes placed in a trailing column"
            );
        }
        info!(columns = layering.columns().len(), "arranged workflow");

        let json = export_workflow(&workflow).map_err(|e| CliError::Import {
            details: e.to_string(),
        })?;
        write_document(target, &json)?;
        Ok(())
    }

    async fn run(&self, path: &Path, mode: ModeArg, raw_inputs: &[String]) -> Result<(), CliError> {
        let workflow = read_workflow(path)?;
        let inputs = parse_inputs(raw_inputs)?;
        let catalog = Arc::new(self.catalog()?);
        let backend =
            HttpSkillBackend::new(self.config.backend.clone()).map_err(|e| CliError::Backend {
                details: e.to_string(),
            })?;
        let runner = WorkflowRunner::new(catalog, Arc::new(backend), self.gate()?);

        let skills: HashMap<NodeId, String> = workflow
            .nodes()
            .iter()
            .map(|node| (node.id.clone(), node.skill_id.clone()))
            .collect();
        let (progress, updates) = mpsc::unbounded_channel();
        let printer = tokio::spawn(print_progress(updates, skills));

        let outcome = tokio::select! {
            outcome = runner.execute(&workflow, &inputs, mode.into(), &progress) => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        drop(progress);
        if let Err(e) = printer.await {
            warn!(error = %e, "progress printer stopped");
        }

        match outcome {
            None => {
                warn!("run abandoned, discarding its result");
                Err(CliError::Interrupted.into())
            }
            Some(Ok(state)) => {
                print_outputs(&state)?;
                if let Ok(remaining) = runner.gate().remaining_free_runs()
                    && matches!(mode, ModeArg::Ai)
                {
                    eprintln!("free runs remaining: {remaining}");
                }
                Ok(())
            }
            Some(Err(err)) => {
                report_run_error(&err);
                if let Some(state) = err.partial_state() {
                    print_outputs(state)?;
                }
                Err(CliError::Run {
                    details: err.to_string(),
                }
                .into())
            }
        }
    }

    fn usage(&self) -> Result<(), CliError> {
        let gate = self.gate()?;
        let usage_error = |e: skillchain_quota::QuotaError| CliError::Usage {
            details: e.to_string(),
        };
        println!("client: {}", gate.fingerprint());
        println!(
            "free runs: {} of {} used, {} remaining",
            gate.used_free_runs().map_err(usage_error)?,
            gate.free_run_limit(),
            gate.remaining_free_runs().map_err(usage_error)?
        );
        let credential = if gate.has_credential().map_err(usage_error)? {
            "stored"
        } else {
            "none"
        };
        println!("credential: {credential}");
        Ok(())
    }

    fn credential(&self, action: CredentialAction) -> Result<(), CliError> {
        let gate = self.gate()?;
        let usage_error = |e: skillchain_quota::QuotaError| CliError::Usage {
            details: e.to_string(),
        };
        match action {
            CredentialAction::Set { credential } => {
                gate.save_credential(&credential).map_err(usage_error)?;
                println!("credential stored");
            }
            CredentialAction::Clear => {
                gate.clear_credential().map_err(usage_error)?;
                println!("credential cleared");
            }
            CredentialAction::Status => {
                let stored = gate.has_credential().map_err(usage_error)?;
                println!("credential: {}", if stored { "stored" } else { "none" });
            }
        }
        Ok(())
    }
}

fn read_workflow(path: &Path) -> std::result::Result<Workflow, CliError> {
    let json = fs::read_to_string(path).map_err(|e| CliError::Read {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;
    import_workflow(&json).map_err(|e| CliError::Import {
        details: e.to_string(),
    })
}

fn write_document(target: Option<&Path>, contents: &str) -> std::result::Result<(), CliError> {
    match target {
        Some(path) => fs::write(path, contents).map_err(|e| CliError::Write {
            path: path.display().to_string(),
            details: e.to_string(),
        }),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

fn print_outputs(state: &ExecutionState) -> std::result::Result<(), CliError> {
    let json = serde_json::to_string_pretty(&state.node_outputs).map_err(|e| CliError::Run {
        details: e.to_string(),
    })?;
    println!("{json}");
    Ok(())
}

fn report_run_error(err: &RunError) {
    match err {
        RunError::Invalid { errors } => {
            for error in errors {
                eprintln!("error: {error}");
            }
        }
        RunError::InputsRequired { missing } => {
            for input in missing {
                eprintln!(
                    "missing input: {}.{} ({}, {})",
                    input.node_id, input.input_id, input.label, input.kind
                );
            }
        }
        RunError::QuotaExceeded { .. } => {
            eprintln!("free runs exhausted; run `skillchain credential set`");
        }
        RunError::InvalidCredential { .. } | RunError::NodeFailed { .. } => {}
    }
}

/// Prints one line per node start and completion.
async fn print_progress(
    mut updates: mpsc::UnboundedReceiver<ExecutionState>,
    skills: HashMap<NodeId, String>,
) {
    let label = |node: &NodeId| match skills.get(node) {
        Some(skill) => format!("{node} ({skill})"),
        None => node.to_string(),
    };
    let mut completed = 0;
    let mut current: Option<NodeId> = None;

    while let Some(state) = updates.recv().await {
        for node in state.completed_node_ids.iter().skip(completed) {
            eprintln!("done     {}", label(node));
        }
        completed = state.completed_node_ids.len();

        if state.current_node_id != current {
            if let Some(node) = &state.current_node_id {
                eprintln!("running  {}", label(node));
            }
            current = state.current_node_id.clone();
        }

        match state.status {
            RunStatus::Completed => eprintln!("completed {completed} node(s)"),
            RunStatus::Failed | RunStatus::QuotaExceeded => {
                if let Some(error) = &state.error {
                    eprintln!("stopped: {error}");
                }
            }
            RunStatus::Idle | RunStatus::Running => {}
        }
    }
}
