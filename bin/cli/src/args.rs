//! Command-line arguments.

use crate::error::CliError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value as JsonValue;
use skillchain_core::NodeId;
use skillchain_workflow::{ExecutionMode, InitialInputs};
use std::path::PathBuf;

/// Compose, validate and run skill workflows.
#[derive(Debug, Parser)]
#[command(name = "skillchain", version, about)]
pub struct Cli {
    /// TOML configuration file; environment variables override it.
    #[arg(long, global = true, env = "SKILLCHAIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skill catalog JSON, overriding the configured path.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a workflow document against the skill catalog.
    Validate(WorkflowArg),
    /// Lay out a workflow's nodes in dependency columns.
    Arrange {
        #[command(flatten)]
        workflow: WorkflowArg,
        /// Write the arranged document here instead of stdout.
        #[arg(short, long, conflicts_with = "in_place")]
        output: Option<PathBuf>,
        /// Overwrite the input document.
        #[arg(long)]
        in_place: bool,
    },
    /// Execute a workflow.
    Run {
        #[command(flatten)]
        workflow: WorkflowArg,
        #[arg(long, value_enum, default_value_t = ModeArg::Simulate)]
        mode: ModeArg,
        /// Initial value for a node input, as NODE.INPUT=VALUE. The last dot
        /// before `=` separates node from input, so node IDs may contain
        /// dots. VALUE is parsed as JSON and falls back to a plain string.
        #[arg(short, long = "input", value_name = "NODE.INPUT=VALUE")]
        inputs: Vec<String>,
    },
    /// Re-serialize a workflow document in canonical form.
    Export {
        #[command(flatten)]
        workflow: WorkflowArg,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show free-run usage for this client.
    Usage,
    /// Manage the stored user credential.
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },
}

#[derive(Debug, Args)]
pub struct WorkflowArg {
    /// Workflow JSON document.
    pub path: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum CredentialAction {
    /// Store a credential; AI runs then stop counting against free runs.
    Set { credential: String },
    /// Forget the stored credential.
    Clear,
    /// Report whether a credential is stored.
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Simulate,
    Ai,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Simulate => ExecutionMode::Simulate,
            ModeArg::Ai => ExecutionMode::Ai,
        }
    }
}

/// Parses `--input` values into initial inputs.
///
/// Input IDs cannot contain `.`; node IDs can.
pub fn parse_inputs(raw: &[String]) -> Result<InitialInputs, CliError> {
    let mut inputs = InitialInputs::new();
    for entry in raw {
        let bad = || CliError::BadInput { raw: entry.clone() };
        let (target, value) = entry.split_once('=').ok_or_else(bad)?;
        let (node, input) = target.rsplit_once('.').ok_or_else(bad)?;
        if node.is_empty() || input.is_empty() {
            return Err(bad());
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::from(value));
        inputs
            .entry(NodeId::from(node))
            .or_default()
            .insert(input.to_string(), value);
    }
    Ok(inputs)
}
