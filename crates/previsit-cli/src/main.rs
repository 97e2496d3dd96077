//! Previsit CLI application
//!
//! Drives simulated pre-visit interviews and manages the persistent
//! response cache from the command line.

mod args;
mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use previsit_core::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Set RUST_LOG=debug for verbose logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Interview(args) => commands::interview::run(config, args).await,
        Commands::Cache { action } => commands::cache::run(config, action).await,
        Commands::Evaluate(args) => commands::evaluate::run(config, args).await,
    }
}
