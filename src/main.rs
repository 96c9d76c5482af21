//! Parlance - Streaming AI chat CLI
//!
//! Main entry point for the Parlance chat application.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parlance::cli::{Cli, Commands};
use parlance::commands;
use parlance::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Mirror a CLI storage override into the environment so the storage
    // initializer picks it up without threading the path everywhere.
    if let Some(db_path) = &cli.storage_path {
        std::env::set_var("PARLANCE_HISTORY_DB", db_path);
        tracing::info!("Using storage DB override: {}", db_path);
    }

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path)?;
    config.validate()?;

    match cli.command {
        Commands::Chat { mode, new } => {
            tracing::info!("Starting interactive chat mode");
            if let Some(m) = &mode {
                tracing::debug!("Using mode override: {}", m);
            }
            commands::chat::run_chat(config, mode, new).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            commands::history::handle_history(command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "parlance=debug" } else { "parlance=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
