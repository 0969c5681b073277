//! Transport error types

use thiserror::Error;

use crate::address::BdAddr;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid Bluetooth address: {0:?}")]
    InvalidAddress(String),

    #[error("L2CAP connect to {address} on PSM 0x{psm:02X} failed: {source}")]
    Connect {
        address: BdAddr,
        psm: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Channel closed")]
    Closed,

    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    // Discovery
    #[cfg(feature = "discovery")]
    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),
}

impl TransportError {
    /// Whether this error means the peer is gone rather than a local fault
    pub fn is_disconnect(&self) -> bool {
        match self {
            TransportError::Closed => true,
            TransportError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
