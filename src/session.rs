//! A polling session over one port.
//!
//! A session owns the transport capability it opens devices with, and at
//! most one open device with its receive buffer. It goes through the
//! following states:
//!
//! ```text
//!                 START
//!                   |
//!                   v
//!              .--------.   open() fails,
//!         .--->| Closed |<--- invalid config, empty name
//!         |    '--------'
//!         |         |
//!      close()   open() ok
//!         |         |  (fresh, empty receive buffer)
//!         |         v
//!         |    .--------.
//!         '----|  Open  |<--- open() again: AlreadyOpen
//!              '--------'
//! ```
//!
//! Nothing here waits on its own: an operation either answers from the
//! receive buffer or makes at most two bounded transport reads (or one write
//! per value), and blocks no longer than the transport timeout allows.
//!
//! A session is meant for a single consumer; share it across threads only
//! behind a mutex.
//!
//! **Example**
//! ```
//! use pollcom::{transport::MockTransport, Session, SettingsBuilder, Value};
//!
//! let transport = MockTransport::new();
//! let wire = transport.wire();
//! let mut session = Session::new(transport, SettingsBuilder::new().finalize());
//!
//! session.open("loop0", "8N1".parse().unwrap()).unwrap();
//! wire.push_incoming(b"ok");
//! assert_eq!(session.read().unwrap(), b'o');
//! assert_eq!(session.write(&[Value::Bool(true)]), 0);
//! session.close();
//! assert!(!session.is_open());
//! ```

mod events;
mod states;

use std::{mem, time::Duration};

use log::{debug, info, warn};

use crate::{
    buffer::read_text,
    config::LineConfig,
    encoder::write_values,
    error::{Error, Result},
    settings::Settings,
    transport::PortTransport,
    value::Value,
};

use events::*;
use states::*;

// =============================================================================
// Public Interface
// =============================================================================

#[derive(Debug)]
pub struct Session<T: PortTransport> {
    transport: T,
    settings: Settings,
    /// Port identifier of the last successful open.
    port: String,
    /// Line configuration of the last successful open.
    config: LineConfig,
    state: SessionStates,
}

impl<T: PortTransport> Session<T> {
    /// Create a closed session that opens devices through `transport`.
    pub fn new(transport: T, settings: Settings) -> Self {
        Session {
            transport,
            settings,
            port: String::new(),
            config: LineConfig::default(),
            state: SessionStates::Closed(ClosedState::default()),
        }
    }

    /// Open `port` with the `config` framing.
    ///
    /// On any failure the session stays closed and keeps nothing from the
    /// attempt.
    pub fn open(&mut self, port: &str, config: LineConfig) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen(self.port.clone()));
        }
        if port.is_empty() {
            return Err(Error::EmptyPortName);
        }

        let handle = match self.transport.open(port, &config, &self.settings) {
            Ok(handle) => handle,
            Err(e) => {
                info!("could not open {}: {}", port, e);
                return Err(e);
            }
        };
        let event = PortOpenedEvent {
            handle,
            buffer_capacity: self.settings.buffer_capacity,
        };
        debug!("{:?}", event);
        self.state = SessionStates::Open(event.into());
        self.port = port.to_string();
        self.config = config;
        info!("=> Open {} ({})", self.port, self.config);
        Ok(())
    }

    /// Close the device and discard the receive buffer. Closing a closed
    /// session does nothing.
    pub fn close(&mut self) {
        let state = mem::replace(
            &mut self.state,
            SessionStates::Closed(ClosedState::default()),
        );
        if let SessionStates::Open(open) = state {
            let event = PortClosedEvent {
                discarded: open.buffer.available_for_read(),
                handle: open.handle,
            };
            self.state = SessionStates::Closed(event.into());
            info!("=> Closed {}", self.port);
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionStates::Open(_))
    }

    /// Port identifier of the current, or last, open.
    pub fn port_name(&self) -> &str {
        &self.port
    }

    /// Line configuration of the current, or last, open.
    pub fn config(&self) -> LineConfig {
        self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Record the transport timeout, applying it right away when open. The
    /// recorded value is left alone when the device refuses the new one.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        if let SessionStates::Open(open) = &mut self.state {
            open.handle.set_timeout(timeout)?;
        }
        self.settings.timeout = timeout;
        Ok(())
    }

    /// Bytes ready to be read. When nothing is buffered, the device is
    /// polled once first.
    pub fn available_for_read(&mut self) -> Result<usize> {
        let open = self.open_state_mut()?;
        open.poll();
        Ok(open.buffer.available_for_read())
    }

    /// Free slots left in the receive buffer.
    pub fn available_for_write(&self) -> Result<usize> {
        match &self.state {
            SessionStates::Open(open) => Ok(open.buffer.available_for_write()),
            SessionStates::Closed(_) => Err(Error::NotConnected),
        }
    }

    /// Push pending output to the device.
    pub fn flush(&mut self) -> Result<()> {
        self.open_state_mut()?.handle.flush()
    }

    /// The next byte, without consuming it.
    pub fn peek(&mut self) -> Result<u8> {
        let open = self.open_state_mut()?;
        open.fill_if_empty()?;
        open.buffer.peek()
    }

    /// Consume and return the next byte.
    pub fn read(&mut self) -> Result<u8> {
        let open = self.open_state_mut()?;
        open.fill_if_empty()?;
        open.buffer.read_byte()
    }

    /// Consume the longest valid UTF-8 text at the head of the receive
    /// buffer. A trailing partial character stays buffered.
    ///
    /// When the buffer holds no complete character at all, the device is
    /// polled once more for the rest of it before giving up.
    pub fn read_string(&mut self) -> Result<String> {
        let open = self.open_state_mut()?;
        open.fill_if_empty()?;
        match read_text(&mut open.buffer) {
            Err(Error::NoValidPrefix) if !open.buffer.is_full() => {
                open.top_up()?;
                read_text(&mut open.buffer)
            }
            other => other,
        }
    }

    /// Send `values` one by one and return how many of them failed. When the
    /// session is closed, every value fails.
    pub fn write(&mut self, values: &[Value]) -> usize {
        match &mut self.state {
            SessionStates::Open(open) => write_values(open.handle.as_mut(), values),
            SessionStates::Closed(_) => {
                warn!("write: not connected, dropping {} values", values.len());
                values.len()
            }
        }
    }

    fn open_state_mut(&mut self) -> Result<&mut OpenState> {
        match &mut self.state {
            SessionStates::Open(open) => Ok(open),
            SessionStates::Closed(_) => Err(Error::NotConnected),
        }
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// Wraps the session states into a simple enum, which can also be used for
/// pattern matching during state transitions.
#[derive(Debug)]
enum SessionStates {
    Closed(ClosedState),
    Open(OpenState),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
use crate::{
    transport::{MockTransport, MockWire},
    SettingsBuilder,
};

#[cfg(test)]
fn session() -> (Session<MockTransport>, MockWire) {
    let transport = MockTransport::new();
    let wire = transport.wire();
    (
        Session::new(transport, SettingsBuilder::new().finalize()),
        wire,
    )
}

#[test]
fn closed_session_reports_not_connected() {
    let (mut session, wire) = session();
    assert!(!session.is_open());
    assert!(matches!(session.read(), Err(Error::NotConnected)));
    assert!(matches!(session.peek(), Err(Error::NotConnected)));
    assert!(matches!(session.read_string(), Err(Error::NotConnected)));
    assert!(matches!(
        session.available_for_read(),
        Err(Error::NotConnected)
    ));
    assert!(matches!(
        session.available_for_write(),
        Err(Error::NotConnected)
    ));
    assert!(matches!(session.flush(), Err(Error::NotConnected)));
    assert_eq!(session.write(&[Value::from("a"), Value::Bool(true)]), 2);
    assert!(wire.take_outgoing().is_empty());
}

#[test]
fn open_twice_is_refused() {
    let (mut session, wire) = session();
    session.open("ttyA", LineConfig::default()).unwrap();
    assert!(matches!(
        session.open("ttyB", LineConfig::default()),
        Err(Error::AlreadyOpen(ref p)) if p == "ttyA"
    ));
    assert_eq!(wire.opened().len(), 1);
    assert_eq!(session.port_name(), "ttyA");
}

#[test]
fn failed_open_stays_closed() {
    let (mut session, wire) = session();
    assert!(matches!(
        session.open("", LineConfig::default()),
        Err(Error::EmptyPortName)
    ));
    wire.fail_open(true);
    assert!(matches!(
        session.open("ttyA", LineConfig::default()),
        Err(Error::Transport(_))
    ));
    assert!(!session.is_open());
    assert_eq!(session.port_name(), "");
}

#[test]
fn caller_config_is_used() {
    let (mut session, wire) = session();
    let config: LineConfig = "7E2".parse().unwrap();
    session.open("ttyA", config).unwrap();
    assert_eq!(wire.opened(), vec![("ttyA".to_string(), config)]);
    assert_eq!(session.config(), config);
}

#[test]
fn close_is_idempotent_and_releases_the_handle() {
    let (mut session, wire) = session();
    session.open("ttyA", LineConfig::default()).unwrap();
    assert_eq!(wire.open_handles(), 1);
    session.close();
    session.close();
    assert_eq!(wire.open_handles(), 0);
    assert!(!session.is_open());
}

#[test]
fn reopen_starts_with_an_empty_buffer() {
    let (mut session, wire) = session();
    session.open("ttyA", LineConfig::default()).unwrap();
    wire.push_incoming(b"stale");
    assert_eq!(session.available_for_read().unwrap(), 5);
    session.close();

    session.open("ttyA", LineConfig::default()).unwrap();
    assert_eq!(session.available_for_write().unwrap(), 255);
    assert_eq!(session.available_for_read().unwrap(), 0);
}

#[test]
fn reads_refill_only_when_empty() {
    let (mut session, wire) = session();
    session.open("ttyA", LineConfig::default()).unwrap();
    wire.push_incoming(b"ab");
    assert_eq!(session.peek().unwrap(), b'a');
    assert_eq!(wire.read_calls(), 1);
    assert_eq!(session.read().unwrap(), b'a');
    assert_eq!(session.read().unwrap(), b'b');
    assert_eq!(wire.read_calls(), 1);
    assert!(matches!(session.read(), Err(Error::EmptyBuffer)));
    assert_eq!(wire.read_calls(), 2);
}

#[test]
fn split_character_is_completed_by_a_later_read() {
    let (mut session, wire) = session();
    session.open("ttyA", LineConfig::default()).unwrap();
    let euro = "€".as_bytes();

    wire.push_incoming(b"ab");
    wire.push_incoming(&euro[..1]);
    assert_eq!(session.read_string().unwrap(), "ab");
    assert_eq!(session.available_for_read().unwrap(), 1);
    assert!(matches!(session.read_string(), Err(Error::NoValidPrefix)));

    wire.push_incoming(&euro[1..]);
    wire.push_incoming(b"c");
    assert_eq!(session.read_string().unwrap(), "€c");
    assert_eq!(session.available_for_read().unwrap(), 0);
}

#[test]
fn transport_failure_does_not_close() {
    let (mut session, wire) = session();
    session.open("ttyA", LineConfig::default()).unwrap();
    wire.push_incoming(b"x");
    wire.fail_reads(true);
    assert!(matches!(session.read(), Err(Error::Transport(_))));
    assert_eq!(session.available_for_read().unwrap(), 0);
    assert!(session.is_open());

    wire.fail_reads(false);
    assert_eq!(session.read().unwrap(), b'x');
}

#[test]
fn timeout_is_recorded_and_forwarded() {
    let (mut session, wire) = session();
    session.set_timeout(Duration::from_millis(20)).unwrap();
    assert_eq!(session.settings().timeout, Duration::from_millis(20));
    session.open("ttyA", LineConfig::default()).unwrap();
    assert_eq!(wire.timeout(), Some(Duration::from_millis(20)));
    session.set_timeout(Duration::from_millis(5)).unwrap();
    assert_eq!(wire.timeout(), Some(Duration::from_millis(5)));
}

#[test]
fn refused_timeout_is_not_recorded() {
    let (mut session, wire) = session();
    session.open("ttyA", LineConfig::default()).unwrap();
    wire.fail_timeouts(true);
    assert!(matches!(
        session.set_timeout(Duration::from_millis(500)),
        Err(Error::Transport(_))
    ));
    assert_eq!(session.settings().timeout, Duration::from_millis(0));
    assert_eq!(wire.timeout(), Some(Duration::from_millis(0)));
}

#[test]
fn flush_reaches_the_device() {
    let (mut session, wire) = session();
    session.open("ttyA", LineConfig::default()).unwrap();
    session.flush().unwrap();
    assert_eq!(wire.flushes(), 1);
}
