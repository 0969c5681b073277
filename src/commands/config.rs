//! Config command

use std::path::Path;

use wiiboard_driver::config::DriverConfig;

use super::CommandResult;

/// Print the effective config, optionally writing it back with defaults filled in.
pub fn show(config: &DriverConfig, path: &Path, write: bool) -> CommandResult {
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    if write {
        config.save(path)?;
        println!("# written");
    }
    Ok(())
}
