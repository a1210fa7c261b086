//! Application configuration.
//!
//! Loaded via the `config` crate from an optional TOML file overlaid by
//! environment variables such as `SKILLCHAIN_BACKEND__ENDPOINT`. Every field
//! has a default, so an empty environment yields a working configuration.

use serde::Deserialize;
use skillchain_ai::HttpBackendConfig;
use skillchain_quota::{FREE_RUN_LIMIT, QuotaConfig};
use skillchain_workflow::LayoutConfig;
use std::path::{Path, PathBuf};

/// Configuration for the command-line front end.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Skill execution backend.
    pub backend: HttpBackendConfig,
    /// Free-run quota and local state.
    pub quota: QuotaSettings,
    /// Auto-layout geometry.
    pub layout: LayoutConfig,
    /// Skill catalog source.
    pub catalog: CatalogSettings,
}

/// Quota settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaSettings {
    #[serde(default = "default_free_run_limit")]
    pub free_run_limit: u32,
    /// JSON file holding the usage counter, credential and fingerprint.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_free_run_limit() -> u32 {
    FREE_RUN_LIMIT
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".skillchain/state.json")
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            free_run_limit: default_free_run_limit(),
            state_path: default_state_path(),
        }
    }
}

impl QuotaSettings {
    /// Returns the gate configuration.
    #[must_use]
    pub fn gate_config(&self) -> QuotaConfig {
        QuotaConfig {
            free_run_limit: self.free_run_limit,
        }
    }
}

/// Skill catalog settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    /// JSON array of skill schemas.
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("skills.json")
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `file`, if given, then the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value has the wrong
    /// type.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file));
        }
        builder
            .add_source(
                config::Environment::with_prefix("SKILLCHAIN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
