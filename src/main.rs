//! Wii Balance Board Driver CLI
//!
//! A command-line interface for reading a Wii Balance Board over Bluetooth.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use wiiboard_driver::config::DriverConfig;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::board::WatchOptions;

/// Run a blocking board session off the async runtime
async fn blocking<F>(f: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load config
    let config_path = cli.config.unwrap_or_else(DriverConfig::default_path);
    debug!("Loading config from {:?}", config_path);
    let config = DriverConfig::load(&config_path)?;

    match cli.command {
        #[cfg(feature = "discovery")]
        Commands::Discover { duration, save } => {
            commands::discover::discover(config, &config_path, duration, save).await
        }

        Commands::Watch {
            address,
            json,
            light,
            count,
        } => {
            let address = commands::resolve_address(address, &config).await?;
            let options = WatchOptions { json, light, count };
            let board = config.board.clone();
            blocking(move || commands::board::watch(&address, board, options)).await
        }

        Commands::Light { state, address } => {
            let address = commands::resolve_address(address, &config).await?;
            let board = config.board.clone();
            blocking(move || commands::board::light(&address, board, state.is_on())).await
        }

        Commands::Calibration { address, json } => {
            let address = commands::resolve_address(address, &config).await?;
            let board = config.board.clone();
            blocking(move || commands::board::calibration(&address, board, json)).await
        }

        Commands::Battery { address } => {
            let address = commands::resolve_address(address, &config).await?;
            let board = config.board.clone();
            blocking(move || commands::board::battery(&address, board)).await
        }

        Commands::Config { write } => commands::config::show(&config, &config_path, write),
    }
}
