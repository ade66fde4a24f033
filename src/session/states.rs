//! States for the session state machine.
//!
//! This module is private and restricted to the [`session`](crate::session)
//! scope. Refer to the [`session`](crate::session) module for an overview of
//! states, events and transitions.

use std::fmt;

use log::{debug, warn};

use super::events::*;
use crate::{
    buffer::{refill, RingBuffer},
    error::Result,
    transport::PortHandle,
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

// Closed State ================================================================

/// No device is open. Every buffer operation reports "not connected".
#[derive(Debug, Default)]
pub(crate) struct ClosedState {}

// Open State ==================================================================

/// A device is open, with its own receive buffer created empty on entry.
pub(crate) struct OpenState {
    pub handle: Box<dyn PortHandle>,
    pub buffer: RingBuffer,
}
impl OpenState {
    /// Refill the receive buffer from the device, but only when it is empty.
    pub fn fill_if_empty(&mut self) -> Result<usize> {
        if !self.buffer.is_empty() {
            return Ok(0);
        }
        refill(&mut self.buffer, self.handle.as_mut())
    }

    /// Refill even though data is buffered, e.g. when the buffered bytes
    /// only hold the start of a character.
    pub fn top_up(&mut self) -> Result<usize> {
        refill(&mut self.buffer, self.handle.as_mut())
    }

    /// Like [`fill_if_empty`](Self::fill_if_empty), but a transport failure is
    /// only logged. Used where the caller just wants a count.
    pub fn poll(&mut self) {
        if let Err(e) = self.fill_if_empty() {
            warn!("refill failed: {}", e);
        }
    }
}
impl fmt::Debug for OpenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenState")
            .field("port", &self.handle.name())
            .field("buffered", &self.buffer.available_for_read())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<PortOpenedEvent> for OpenState {
    fn from(event: PortOpenedEvent) -> OpenState {
        OpenState {
            handle: event.handle,
            buffer: RingBuffer::with_capacity(event.buffer_capacity),
        }
    }
}

impl From<PortClosedEvent> for ClosedState {
    fn from(event: PortClosedEvent) -> ClosedState {
        debug!(
            "releasing {:?}, discarding {} unread bytes",
            event.handle.name(),
            event.discarded
        );
        // Dropping the handle closes the device.
        drop(event.handle);
        ClosedState {}
    }
}
