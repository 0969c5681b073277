//! Driver settings

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wiiboard_transport::protocol::psm;

use crate::channel::DEFAULT_CAPACITY;

/// Tunables for a [`BalanceBoard`](crate::BalanceBoard)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Events buffered before new ones are dropped
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// How often `disconnect` re-checks the receive loop, in milliseconds
    #[serde(default = "default_disconnect_poll_ms")]
    pub disconnect_poll_ms: u64,
    #[serde(default = "default_control_psm")]
    pub control_psm: u16,
    #[serde(default = "default_receive_psm")]
    pub receive_psm: u16,
}

fn default_event_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_disconnect_poll_ms() -> u64 {
    100
}

fn default_control_psm() -> u16 {
    psm::CONTROL
}

fn default_receive_psm() -> u16 {
    psm::RECEIVE
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            disconnect_poll_ms: default_disconnect_poll_ms(),
            control_psm: default_control_psm(),
            receive_psm: default_receive_psm(),
        }
    }
}

impl BoardConfig {
    pub fn disconnect_poll_interval(&self) -> Duration {
        Duration::from_millis(self.disconnect_poll_ms)
    }
}
