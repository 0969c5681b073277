//! CLI configuration file
//!
//! ```toml
//! address = "00:1E:35:12:34:56"
//!
//! [board]
//! event_capacity = 1024
//!
//! [discovery]
//! duration_secs = 10
//! adapter = "hci0"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wiiboard::{BdAddr, BoardConfig};

/// Contents of `~/.config/wiiboard/driver.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Board used when no address is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<BdAddr>,

    #[serde(default)]
    pub board: BoardConfig,

    #[cfg(feature = "discovery")]
    #[serde(default)]
    pub discovery: wiiboard::DiscoveryConfig,
}

impl DriverConfig {
    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wiiboard")
            .join("driver.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: DriverConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
