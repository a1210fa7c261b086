//! Workflow engine for skillchain.
//!
//! A workflow is a graph of skill nodes whose typed outputs feed other
//! nodes' typed inputs. This crate provides:
//!
//! - **Model**: nodes, connections and the `Workflow` aggregate with its JSON document form
//! - **Port kinds**: the compatibility relation deciding which connections are legal
//! - **Editing**: a catalog-aware editor with a two-step connect gesture and run lock
//! - **Analysis**: validation, dependency layering and auto layout
//! - **Execution**: a sequential scheduler with AI and simulated modes, gated by quota

pub mod connection;
pub mod definition;
pub mod editor;
pub mod error;
pub mod execution;
pub mod graph;
pub mod io;
pub mod layout;
pub mod node;
pub mod port;
pub mod scheduler;
pub mod simulate;
pub mod skill;
pub mod validation;

pub use connection::{PendingConnection, WorkflowConnection};
pub use definition::{Workflow, WorkflowMetadata, WorkflowRecord};
pub use editor::{ConnectOutcome, ConnectTarget, WorkflowEditor};
pub use error::{GraphError, ImportError, RunError};
pub use execution::{ExecutionMode, ExecutionState, InitialInputs, PortValues, RunStatus};
pub use graph::{DependencyGraph, Layering, compute_layers};
pub use io::{export_workflow, import_workflow};
pub use layout::{LayoutConfig, arranged_positions, auto_arrange};
pub use node::{Position, WorkflowNode};
pub use port::{PortKind, PortSpec, is_compatible};
pub use scheduler::{NoProgress, ProgressSink, WorkflowRunner};
pub use simulate::simulate_outputs;
pub use skill::{SkillCatalog, SkillSchema, StaticCatalog};
pub use validation::{
    RequiredInput, ValidationError, ValidationReport, ValidationWarning, required_inputs, validate,
};
