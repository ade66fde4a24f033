//! Port transports.
//!
//! A [`PortTransport`] is the capability used by a session to open devices;
//! the [`PortHandle`] it returns performs the actual, possibly blocking, reads
//! and writes. Dropping a handle closes the device.
//!
//! Two implementations are provided:
//!
//! * [`SerialPortTransport`] for real devices, through the `serialport`
//!   crate which selects the platform backend (TTY or COM) at build time;
//! * [`MockTransport`], an in-memory double for tests and demos.

mod mock;
mod serial;

use std::time::Duration;

use crate::{config::LineConfig, error::Result, settings::Settings};

pub use mock::{MockTransport, MockWire};
pub use serial::{available_ports, SerialPortTransport};

// =============================================================================
// Public Interface
// =============================================================================

/// Opens port handles. Passed explicitly to the session that uses it so that
/// several sessions, or test doubles, can coexist.
pub trait PortTransport {
    /// Open and configure the device named `path` with the `line` framing
    /// and the remaining parameters in `settings`.
    fn open(
        &mut self,
        path: &str,
        line: &LineConfig,
        settings: &Settings,
    ) -> Result<Box<dyn PortHandle>>;
}

/// An open device.
pub trait PortHandle: Send {
    /// The device name, when known.
    fn name(&self) -> Option<String>;

    /// Read up to `buf.len()` bytes. Returning fewer bytes, including zero,
    /// is not an error.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write up to `buf.len()` bytes and return how many were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Push any pending output to the device.
    fn flush(&mut self) -> Result<()>;

    /// Change how long a read or write may block.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;
}
