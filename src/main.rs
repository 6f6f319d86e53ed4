//! Limitlab - classroom activity backend
//!
//! Main entry point for the server and admin CLI.

use std::sync::Arc;

use anyhow::Result;

use limitlab::cli::{Cli, Commands};
use limitlab::commands;
use limitlab::config::Config;
use limitlab::logging::init_logging;
use limitlab::service::ActivityService;
use limitlab::storage::SqliteStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    init_logging(&config.logging)?;

    // Validate configuration
    config.validate()?;

    let storage = Arc::new(SqliteStorage::new(&config.storage)?);
    tracing::debug!("Using database at {}", storage.db_path().display());
    let service = Arc::new(ActivityService::new(storage, config.timer.clone()));

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting API server");
            commands::run_serve(config, service).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::debug!("Running sessions command: {:?}", command);
            commands::handle_sessions(&service, command)?;
            Ok(())
        }
        Commands::Cleanup { dry_run } => {
            tracing::info!(dry_run, "Starting keysmash cleanup");
            commands::handle_cleanup(&service, dry_run)?;
            Ok(())
        }
    }
}
