//! Bounded event channel between the receive loop and the consumer
//!
//! Stack ordered: `pop` returns the most recently pushed event. When the
//! stack is full the incoming event is dropped and the stack is left as is,
//! so a consumer that stops reading sees the oldest unread events first once
//! it resumes and every newer event in between is lost.

use parking_lot::Mutex;
use thiserror::Error;

use crate::event::BoardEvent;

/// Default number of buffered events
pub const DEFAULT_CAPACITY: usize = 1024;

/// Returned by [`EventChannel::push`] when the event was dropped
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Event channel full ({capacity} events)")]
pub struct ChannelFull {
    pub capacity: usize,
}

/// Single-producer single-consumer LIFO buffer with a drop-newest policy
#[derive(Debug)]
pub struct EventChannel {
    stack: Mutex<Vec<BoardEvent>>,
    capacity: usize,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            stack: Mutex::new(Vec::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push without waiting for the consumer; the event is dropped when full
    pub fn push(&self, event: BoardEvent) -> Result<(), ChannelFull> {
        let mut stack = self.stack.lock();
        if stack.len() >= self.capacity {
            return Err(ChannelFull {
                capacity: self.capacity,
            });
        }
        stack.push(event);
        Ok(())
    }

    /// Take the most recently pushed event
    pub fn pop(&self) -> Option<BoardEvent> {
        self.stack.lock().pop()
    }

    /// Take every buffered event, newest first
    pub fn drain(&self) -> Vec<BoardEvent> {
        let mut events = std::mem::take(&mut *self.stack.lock());
        events.reverse();
        events
    }

    pub fn len(&self) -> usize {
        self.stack.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.lock().is_empty()
    }

    pub fn clear(&self) {
        self.stack.lock().clear();
    }
}
