//! Command handlers for the CLI application.
//!
//! - `board`: commands that hold a live board session (watch, light, calibration, battery)
//! - `discover`: Bluetooth scanning
//! - `config`: config file inspection

pub mod board;
pub mod config;
#[cfg(feature = "discovery")]
pub mod discover;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wiiboard::BdAddr;
use wiiboard_driver::config::DriverConfig;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Set up a Ctrl-C handler that sets the given flag to false when triggered.
/// Returns the Arc<AtomicBool> for use in the main loop.
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}

/// Pick the board address: command line, then config file, then a scan
pub async fn resolve_address(arg: Option<String>, config: &DriverConfig) -> anyhow::Result<String> {
    if let Some(address) = arg {
        return Ok(address);
    }
    if let Some(address) = config.address {
        return Ok(address.to_string());
    }
    Ok(scan_for_address(config).await?.to_string())
}

#[cfg(feature = "discovery")]
async fn scan_for_address(config: &DriverConfig) -> anyhow::Result<BdAddr> {
    wiiboard::BalanceBoard::discover(&config.discovery)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No balance board found; press the red sync button and retry"))
}

#[cfg(not(feature = "discovery"))]
async fn scan_for_address(_config: &DriverConfig) -> anyhow::Result<BdAddr> {
    anyhow::bail!("No address given; pass one or set `address` in the config file")
}
