//! Board driver error types

use thiserror::Error;
use wiiboard_transport::{BdAddr, TransportError};

/// Errors from balance board operations
#[derive(Error, Debug)]
pub enum BoardError {
    /// Address missing or not `XX:XX:XX:XX:XX:XX`
    #[error("Invalid device address: {0:?}")]
    InvalidAddress(String),

    /// Control or receive socket could not be opened; nothing is retried
    #[error("Could not connect to balance board at {address}: {source}")]
    Connection {
        address: BdAddr,
        #[source]
        source: TransportError,
    },

    #[error("Balance board already connected to {0}")]
    AlreadyConnected(BdAddr),

    #[error("Balance board is not connected")]
    NotConnected,

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
