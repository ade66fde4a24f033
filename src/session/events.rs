//! Events for the session state machine.
//!
//! This module is private and restricted to the [`session`](crate::session)
//! scope. Refer to the [`session`](crate::session) module for an overview of
//! states, events and transitions.

use std::fmt;

use crate::transport::PortHandle;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// PortOpenedEvent =============================================================

/// Event fired when the transport has opened and configured the device. It
/// triggers the transition from `Closed` to `Open`.
pub(crate) struct PortOpenedEvent {
    /// The open device. Consumed and moved into the `Open` state.
    pub handle: Box<dyn PortHandle>,
    /// Number of slots of the fresh receive buffer.
    pub buffer_capacity: usize,
}
impl fmt::Debug for PortOpenedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortOpenedEvent")
            .field("port", &self.handle.name())
            .field("buffer_capacity", &self.buffer_capacity)
            .finish()
    }
}

// PortClosedEvent =============================================================

/// Event fired when the session is closed. It triggers the transition from
/// `Open` to `Closed` and carries the handle to be released.
pub(crate) struct PortClosedEvent {
    pub handle: Box<dyn PortHandle>,
    /// Unread bytes discarded with the receive buffer.
    pub discarded: usize,
}
impl fmt::Debug for PortClosedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortClosedEvent")
            .field("port", &self.handle.name())
            .field("discarded", &self.discarded)
            .finish()
    }
}
