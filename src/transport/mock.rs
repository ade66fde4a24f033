//! In-memory port transport.
//!
//! Every handle opened by a [`MockTransport`] shares one [`MockWire`], which
//! plays the role of the device on the other end of the line: tests queue the
//! bytes the device "sends" and inspect the bytes the session wrote.
//!
//! ```
//! use pollcom::{binding::Serial, transport::MockTransport, SettingsBuilder, Value};
//!
//! let transport = MockTransport::new();
//! let wire = transport.wire();
//! let mut serial = Serial::new(transport, SettingsBuilder::new().finalize());
//!
//! assert!(serial.open("loop0", None));
//! wire.push_incoming(b"hello");
//! assert_eq!(serial.read_string().as_deref(), Some("hello"));
//! assert_eq!(serial.write(&[Value::from("hi")]), 0);
//! assert_eq!(wire.take_outgoing(), b"hi".to_vec());
//! ```

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use super::{PortHandle, PortTransport};
use crate::{
    config::LineConfig,
    error::{Error, Result},
    settings::Settings,
};

// =============================================================================
// Public Interface
// =============================================================================

#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    wire: MockWire,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// The wire shared with every handle this transport opens.
    pub fn wire(&self) -> MockWire {
        self.wire.clone()
    }
}

impl PortTransport for MockTransport {
    fn open(
        &mut self,
        path: &str,
        line: &LineConfig,
        settings: &Settings,
    ) -> Result<Box<dyn PortHandle>> {
        let mut state = self.wire.state();
        if state.fail_open {
            return Err(io_error(io::ErrorKind::NotFound, "no such device"));
        }
        state.opened.push((path.to_string(), *line));
        state.timeout = Some(settings.timeout);
        state.open_handles += 1;
        Ok(Box::new(MockHandle {
            name: path.to_string(),
            wire: self.wire.clone(),
        }))
    }
}

/// Shared view of the simulated line.
#[derive(Debug, Default, Clone)]
pub struct MockWire {
    inner: Arc<Mutex<WireState>>,
}

impl MockWire {
    /// Queue bytes for the session to receive.
    pub fn push_incoming(&self, bytes: &[u8]) {
        self.state().incoming.extend(bytes.iter().copied());
    }

    /// Bytes queued but not yet read by the session.
    pub fn pending_incoming(&self) -> usize {
        self.state().incoming.len()
    }

    /// Bytes written by the session so far, draining them.
    pub fn take_outgoing(&self) -> Vec<u8> {
        std::mem::take(&mut self.state().outgoing)
    }

    /// Limit every read to at most `max` bytes.
    pub fn set_read_chunk(&self, max: Option<usize>) {
        self.state().read_chunk = max;
    }

    /// Limit every write to at most `max` bytes, producing short writes.
    pub fn set_write_limit(&self, max: Option<usize>) {
        self.state().write_limit = max;
    }

    pub fn fail_open(&self, fail: bool) {
        self.state().fail_open = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    /// Let the next `reads` reads succeed, then fail every read after them.
    /// `None` lifts the limit.
    pub fn fail_reads_after(&self, reads: Option<usize>) {
        self.state().reads_before_failure = reads;
    }

    pub fn fail_timeouts(&self, fail: bool) {
        self.state().fail_timeouts = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    pub fn fail_flush(&self, fail: bool) {
        self.state().fail_flush = fail;
    }

    /// Every successful open so far, oldest first.
    pub fn opened(&self) -> Vec<(String, LineConfig)> {
        self.state().opened.clone()
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.state().open_handles
    }

    pub fn read_calls(&self) -> usize {
        self.state().read_calls
    }

    pub fn flushes(&self) -> usize {
        self.state().flushes
    }

    /// The last timeout given at open or through `set_timeout`.
    pub fn timeout(&self) -> Option<Duration> {
        self.state().timeout
    }

    fn state(&self) -> MutexGuard<'_, WireState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Private stuff
// =============================================================================

#[derive(Debug, Default)]
struct WireState {
    incoming: VecDeque<u8>,
    outgoing: Vec<u8>,
    read_chunk: Option<usize>,
    write_limit: Option<usize>,
    fail_open: bool,
    fail_reads: bool,
    reads_before_failure: Option<usize>,
    fail_timeouts: bool,
    fail_writes: bool,
    fail_flush: bool,
    opened: Vec<(String, LineConfig)>,
    open_handles: usize,
    read_calls: usize,
    flushes: usize,
    timeout: Option<Duration>,
}

#[derive(Debug)]
struct MockHandle {
    name: String,
    wire: MockWire,
}

impl PortHandle for MockHandle {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.wire.state();
        state.read_calls += 1;
        match state.reads_before_failure {
            Some(0) => return Err(io_error(io::ErrorKind::BrokenPipe, "read failed")),
            Some(n) => state.reads_before_failure = Some(n - 1),
            None => (),
        }
        if state.fail_reads {
            return Err(io_error(io::ErrorKind::BrokenPipe, "read failed"));
        }
        let limit = state.read_chunk.unwrap_or(usize::MAX);
        let n = buf.len().min(limit).min(state.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(state.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut state = self.wire.state();
        if state.fail_writes {
            return Err(io_error(io::ErrorKind::BrokenPipe, "write failed"));
        }
        let n = buf.len().min(state.write_limit.unwrap_or(usize::MAX));
        state.outgoing.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        let mut state = self.wire.state();
        if state.fail_flush {
            return Err(io_error(io::ErrorKind::BrokenPipe, "flush failed"));
        }
        state.flushes += 1;
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        let mut state = self.wire.state();
        if state.fail_timeouts {
            return Err(io_error(io::ErrorKind::InvalidInput, "timeout refused"));
        }
        state.timeout = Some(timeout);
        Ok(())
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = self.wire.state();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}

fn io_error(kind: io::ErrorKind, msg: &str) -> Error {
    Error::Transport(io::Error::new(kind, msg.to_string()))
}
