mod args;
mod commands;
mod config;
mod error;

use crate::args::Cli;
use crate::commands::Context;
use crate::config::AppConfig;
use crate::error::CliError;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> skillchain_core::Result<(), CliError> {
    let mut config = AppConfig::load(cli.config.as_deref()).map_err(|e| CliError::Config {
        details: e.to_string(),
    })?;
    if let Some(catalog) = cli.catalog {
        config.catalog.path = catalog;
    }
    tracing::debug!(?config, "loaded configuration");

    Context::new(config).dispatch(cli.command).await
}
