// CLI definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wiiboard_driver")]
#[command(author, version, about = "Wii Balance Board driver")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/wiiboard/driver.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for a balance board (press the red sync button first)
    #[cfg(feature = "discovery")]
    #[command(visible_alias = "scan")]
    Discover {
        /// Scan duration in seconds (overrides the config file)
        #[arg(short, long)]
        duration: Option<u64>,

        /// Save the found address as the default board
        #[arg(long)]
        save: bool,
    },

    /// Stream weight events until Ctrl-C
    #[command(visible_alias = "w")]
    Watch {
        /// Board address (XX:XX:XX:XX:XX:XX)
        address: Option<String>,

        /// Print one JSON object per event
        #[arg(long)]
        json: bool,

        /// Turn the power button LED on while watching
        #[arg(long)]
        light: bool,

        /// Stop after this many events
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Switch the power button LED
    Light {
        #[arg(value_enum)]
        state: LightState,

        /// Board address (XX:XX:XX:XX:XX:XX)
        address: Option<String>,
    },

    /// Read and print the factory calibration
    #[command(visible_alias = "cal")]
    Calibration {
        /// Board address (XX:XX:XX:XX:XX:XX)
        address: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Request a status report and print the battery level
    #[command(visible_alias = "bat")]
    Battery {
        /// Board address (XX:XX:XX:XX:XX:XX)
        address: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the config file, filling in defaults
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LightState {
    On,
    Off,
}

impl LightState {
    pub fn is_on(self) -> bool {
        self == LightState::On
    }
}
