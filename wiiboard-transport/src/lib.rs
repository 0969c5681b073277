//! Transport layer for Wii Balance Board communication
//!
//! The balance board is a Wii Remote extension in disguise: it speaks the
//! Wii Remote HID protocol over two Bluetooth L2CAP channels.
//!
//! - Control channel (PSM 0x11): output reports (LED, report mode, register I/O)
//! - Receive channel (PSM 0x13): input reports (status, read data, sensors)
//!
//! This crate owns the wire level: protocol constants, typed command builders,
//! input report decoding, Bluetooth addresses and the raw socket backend.

pub mod address;
pub mod command;
pub mod error;
pub mod protocol;
pub mod report;

#[cfg(target_os = "linux")]
mod l2cap;

#[cfg(feature = "discovery")]
pub mod discovery;

pub use address::BdAddr;
pub use command::{
    register_extension, request_calibration, request_status, set_light, set_report_type,
    BoardCommand, ReadRegister, RequestStatus, SetLight, SetReportMode, WriteRegister,
};
pub use error::TransportError;
pub use report::{
    parse_report, AckReport, ExtensionReport, ParseError, RawSensors, ReadDataReport, Report,
    StatusReport,
};

#[cfg(target_os = "linux")]
pub use l2cap::{L2capConnector, L2capSocket};

#[cfg(feature = "discovery")]
pub use discovery::{BluezDiscovery, DeviceDiscovery, DiscoveredDevice, DiscoveryConfig};

use std::sync::Arc;

/// A packet-oriented channel to the board - one per L2CAP PSM
///
/// Implementations must allow `close` to be called from another thread while
/// `recv` is blocked; the blocked call then returns `Ok(0)` or an error.
pub trait Channel: Send + Sync {
    /// Write one outbound packet, returning the number of bytes sent
    fn send(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Block until one inbound packet arrives
    ///
    /// # Returns
    /// Number of bytes written to `buf`, `0` once the channel is closed
    fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Close the channel, waking any blocked `recv`
    fn close(&self) -> Result<(), TransportError>;
}

/// Type alias for a shared channel
pub type BoxedChannel = Arc<dyn Channel>;

/// Opens channels to a device address
///
/// The L2CAP backend is [`L2capConnector`]; tests substitute in-memory channels.
pub trait Connector: Send + Sync {
    /// Open a channel to `address` on protocol service multiplexer `psm`
    fn open(&self, address: &BdAddr, psm: u16) -> Result<BoxedChannel, TransportError>;
}
