//! Host-facing serial object.
//!
//! [`Serial`] exposes a [`Session`] the way a scripting host expects it: every
//! call returns immediately with a plain value, and routine conditions such
//! as "nothing to read" or "not connected" come back as sentinels (`-1`,
//! `None`, `false`, an error count) instead of errors.
//!
//! | method                | returns                                   |
//! |-----------------------|-------------------------------------------|
//! | `open`                | `true` when the port was opened           |
//! | `close`               | always `true`                             |
//! | `is_connected`        | whether a port is open                    |
//! | `available_for_read`  | buffered byte count, `-1` when closed     |
//! | `available_for_write` | free buffer slots, `-1` when closed       |
//! | `peek` / `read`       | byte value `0..=255`, or [`NO_DATA`]      |
//! | `read_string`         | decoded text, or `None`                   |
//! | `write`               | number of values that failed              |
//! | `set_timeout`         | `false` for negative timeouts             |
//! | `get_version`         | [`INTERFACE_VERSION`]                     |

use std::{convert::TryFrom, time::Duration};

use log::{debug, warn};

use crate::{
    config::{decode_integer, decode_mnemonic, encode_mnemonic, LineConfig},
    error::{Error, Result},
    session::Session,
    settings::Settings,
    transport::PortTransport,
    value::Value,
};

/// Returned by `peek`, `read` and the `available_*` calls when there is no
/// value to report.
pub const NO_DATA: i64 = -1;

/// Version of the host interface reported by `get_version`.
pub const INTERFACE_VERSION: i64 = 1;

// =============================================================================
// Public Interface
// =============================================================================

#[derive(Debug)]
pub struct Serial<T: PortTransport> {
    session: Session<T>,
}

impl<T: PortTransport> Serial<T> {
    pub fn new(transport: T, settings: Settings) -> Self {
        Serial {
            session: Session::new(transport, settings),
        }
    }

    /// Open `port`. The configuration may be given as a packed integer or as
    /// a mnemonic string; without one the port is opened as `8N1`.
    pub fn open(&mut self, port: &str, config: Option<&Value>) -> bool {
        let config = match config.map(config_from_value).transpose() {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                warn!("open {}: {}", port, e);
                return false;
            }
        };
        match self.session.open(port, config) {
            Ok(()) => true,
            Err(e) => {
                warn!("open {}: {}", port, e);
                false
            }
        }
    }

    pub fn close(&mut self) -> bool {
        self.session.close();
        true
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_open()
    }

    pub fn available_for_read(&mut self) -> i64 {
        sentinel(self.session.available_for_read().map(|n| n as i64))
    }

    pub fn available_for_write(&self) -> i64 {
        sentinel(self.session.available_for_write().map(|n| n as i64))
    }

    /// Best effort: failures are logged only.
    pub fn flush(&mut self) {
        if let Err(e) = self.session.flush() {
            warn!("flush: {}", e);
        }
    }

    pub fn peek(&mut self) -> i64 {
        sentinel(self.session.peek().map(i64::from))
    }

    pub fn read(&mut self) -> i64 {
        sentinel(self.session.read().map(i64::from))
    }

    pub fn read_string(&mut self) -> Option<String> {
        match self.session.read_string() {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("read_string: {}", e);
                None
            }
        }
    }

    /// Send each value independently; returns how many failed.
    pub fn write(&mut self, values: &[Value]) -> i64 {
        self.session.write(values) as i64
    }

    pub fn set_timeout(&mut self, ms: i64) -> bool {
        let ms = match u64::try_from(ms) {
            Ok(ms) => ms,
            Err(_) => {
                warn!("set_timeout: negative timeout {}", ms);
                return false;
            }
        };
        match self.session.set_timeout(Duration::from_millis(ms)) {
            Ok(()) => true,
            Err(e) => {
                warn!("set_timeout: {}", e);
                false
            }
        }
    }

    pub fn get_version(&self) -> i64 {
        INTERFACE_VERSION
    }

    /// Port identifier of the current, or last, open.
    pub fn port_name(&self) -> &str {
        self.session.port_name()
    }

    /// Mnemonic of the current, or last, line configuration, or `None` when
    /// it has no mnemonic spelling.
    pub fn config(&self) -> Option<String> {
        encode_mnemonic(&self.session.config()).ok()
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }
}

/// Decode a host-supplied line configuration.
pub fn config_from_value(value: &Value) -> Result<LineConfig> {
    match value {
        Value::Int(i) => decode_integer(*i),
        Value::Str(s) => decode_mnemonic(s),
        other => Err(Error::InvalidConfig(format!(
            "a {} is not a line configuration",
            other.kind()
        ))),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn sentinel(result: Result<i64>) -> i64 {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!("{}", e);
            NO_DATA
        }
    }
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
fn serial() -> (Serial<MockTransport>, MockWire) {
    let transport = MockTransport::new();
    let wire = transport.wire();
    (
        Serial::new(transport, SettingsBuilder::new().finalize()),
        wire,
    )
}

#[test]
fn config_from_int_or_string() {
    assert_eq!(
        config_from_value(&Value::Int(0x801)).unwrap(),
        LineConfig::default()
    );
    assert_eq!(
        config_from_value(&Value::from("8n1")).unwrap(),
        LineConfig::default()
    );
    assert!(matches!(
        config_from_value(&Value::Bool(true)),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        config_from_value(&Value::Real(8.0)),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn open_without_config_is_8n1() {
    let (mut serial, wire) = serial();
    assert!(serial.open("COM2", None));
    assert_eq!(serial.config().as_deref(), Some("8N1"));
    assert_eq!(wire.opened()[0].1, LineConfig::default());
}

#[test]
fn malformed_config_does_not_open() {
    let (mut serial, wire) = serial();
    assert!(!serial.open("COM2", Some(&Value::from("8X1"))));
    assert!(!serial.open("COM2", Some(&Value::Int(0x901))));
    assert!(!serial.open("COM2", Some(&Value::Nil)));
    assert!(!serial.is_connected());
    assert!(wire.opened().is_empty());
}

#[test]
fn integer_config_is_honoured() {
    let (mut serial, wire) = serial();
    assert!(serial.open("COM2", Some(&Value::Int(0x722))));
    assert_eq!(serial.config().as_deref(), Some("7E2"));
    assert_eq!(wire.opened()[0].1, "7E2".parse::<LineConfig>().unwrap());
}

#[test]
fn sentinels_when_closed() {
    let (mut serial, _wire) = serial();
    assert_eq!(serial.available_for_read(), NO_DATA);
    assert_eq!(serial.available_for_write(), NO_DATA);
    assert_eq!(serial.peek(), NO_DATA);
    assert_eq!(serial.read(), NO_DATA);
    assert_eq!(serial.read_string(), None);
    assert_eq!(serial.write(&[Value::Bool(true)]), 1);
    serial.flush();
    assert!(serial.close());
}

#[test]
fn bytes_above_127_are_positive() {
    let (mut serial, wire) = serial();
    assert!(serial.open("COM2", None));
    wire.push_incoming(&[0xFF, 0x80]);
    assert_eq!(serial.peek(), 255);
    assert_eq!(serial.read(), 255);
    assert_eq!(serial.read(), 128);
    assert_eq!(serial.read(), NO_DATA);
}

#[test]
fn binary_data_is_not_text() {
    let (mut serial, wire) = serial();
    assert!(serial.open("COM2", None));
    wire.push_incoming(&[0xFF, b'a']);
    assert_eq!(serial.read_string(), None);
    assert_eq!(serial.read(), 255);
    assert_eq!(serial.read_string().as_deref(), Some("a"));
}

#[test]
fn timeouts() {
    let (mut serial, wire) = serial();
    assert!(!serial.set_timeout(-5));
    assert!(serial.set_timeout(100));
    assert!(serial.open("COM2", None));
    assert_eq!(wire.timeout(), Some(Duration::from_millis(100)));
}

#[test]
fn version() {
    let (serial, _wire) = serial();
    assert_eq!(serial.get_version(), INTERFACE_VERSION);
}
