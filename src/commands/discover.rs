//! Discovery command

use std::path::Path;

use wiiboard::BalanceBoard;
use wiiboard_driver::config::DriverConfig;

use super::CommandResult;

/// Scan for a balance board and print its address.
pub async fn discover(
    mut config: DriverConfig,
    config_path: &Path,
    duration: Option<u64>,
    save: bool,
) -> CommandResult {
    if let Some(secs) = duration {
        config.discovery.duration_secs = secs;
    }

    println!(
        "Scanning on {} for {}s, press the red sync button on the board...",
        config.discovery.adapter, config.discovery.duration_secs
    );
    let Some(address) = BalanceBoard::discover(&config.discovery).await? else {
        println!("No balance board found");
        return Ok(());
    };

    println!("Found balance board: {address}");
    if save {
        config.address = Some(address);
        config.save(config_path)?;
        println!("Saved as default board in {}", config_path.display());
    }
    Ok(())
}
