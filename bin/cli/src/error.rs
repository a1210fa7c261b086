//! Errors surfaced by the command-line front end.

use std::fmt;

/// A command failure, reported once at exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The skill catalog could not be loaded.
    Catalog { path: String, details: String },
    /// A file could not be read.
    Read { path: String, details: String },
    /// A file could not be written.
    Write { path: String, details: String },
    /// The workflow document was rejected.
    Import { details: String },
    /// The workflow failed validation.
    Invalid { errors: usize },
    /// An `--input` argument is not `NODE.INPUT=VALUE`.
    BadInput { raw: String },
    /// Local usage state is unavailable or was rejected.
    Usage { details: String },
    /// The skill backend could not be set up.
    Backend { details: String },
    /// The run stopped.
    Run { details: String },
    /// The run was abandoned by the user.
    Interrupted,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::Catalog { path, details } => {
                write!(f, "could not load skill catalog {path}: {details}")
            }
            Self::Read { path, details } => write!(f, "could not read {path}: {details}"),
            Self::Write { path, details } => write!(f, "could not write {path}: {details}"),
            Self::Import { details } => write!(f, "could not import workflow: {details}"),
            Self::Invalid { errors } => write!(f, "workflow has {errors} validation error(s)"),
            Self::BadInput { raw } => {
                write!(f, "invalid --input '{raw}', expected NODE.INPUT=VALUE")
            }
            Self::Usage { details } => write!(f, "usage state error: {details}"),
            Self::Backend { details } => write!(f, "backend error: {details}"),
            Self::Run { details } => write!(f, "run failed: {details}"),
            Self::Interrupted => write!(f, "run abandoned"),
        }
    }
}

impl std::error::Error for CliError {}
