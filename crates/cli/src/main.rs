//! # Sensor Pipeline CLI
//!
//! Command-line entry point.
//!
//! - `run`: sensors -> transport -> consumer -> SQLite, until shutdown
//! - `validate`: check a sensor file
//! - `query`: list, filter and edit stored readings
//! - `serve`: the same reads and edits over HTTP

mod api;
mod cli;
mod commands;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_pipeline, run_query, run_serve, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        // Run exposes metrics itself once the pipeline config is known
        metrics_port: None,
        default_log_level: default_log_level(&cli),
    })?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Sensor pipeline CLI starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Query(args) => run_query(args).await,
        Commands::Serve(args) => run_serve(args).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// `-q` wins, then `-v`, then `--log-level` / `LOGGING_LEVEL`
fn default_log_level(cli: &Cli) -> String {
    if cli.quiet {
        return "warn".to_string();
    }
    match cli.verbose {
        0 => cli.log_level.clone().unwrap_or_else(|| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}
