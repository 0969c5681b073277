//! Wii Balance Board driver
//!
//! This crate turns the raw report stream from a balance board into
//! calibrated weight events on top of any channel backend (L2CAP sockets on
//! Linux, in-memory channels in tests).
//!
//! ```no_run
//! # fn main() -> Result<(), wiiboard::BoardError> {
//! let board = wiiboard::BalanceBoard::new();
//! board.connect("00:1E:35:00:00:01")?;
//! while let Some(event) = board.get_event() {
//!     println!("{:.1} kg", event.total_weight());
//! }
//! board.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod calibration;
pub mod channel;
pub mod config;
pub mod error;
pub mod event;

pub use board::{BalanceBoard, ConnectionState};
pub use calibration::{CalibrationMatrix, CalibrationProgress, CalibrationStore};
pub use channel::{ChannelFull, EventChannel};
pub use config::BoardConfig;
pub use error::BoardError;
pub use event::{BoardEvent, EventDecoder, SensorPosition};

// Re-export transport types consumers need to name
pub use wiiboard_transport::{BdAddr, Channel, Connector, TransportError};

#[cfg(feature = "discovery")]
pub use wiiboard_transport::DiscoveryConfig;
