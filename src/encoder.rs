//! Serialization of outgoing values into raw bytes.
//!
//! Booleans are sent as the ASCII text `true` / `false`, strings as their
//! UTF-8 encoding. Every other kind is [`Error::Unsupported`].

use log::{trace, warn};

use crate::{
    error::{Error, Result},
    transport::PortHandle,
    value::Value,
};

/// Encode a single value for transmission.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Bool(true) => Ok(b"true".to_vec()),
        Value::Bool(false) => Ok(b"false".to_vec()),
        Value::Str(s) => Ok(s.as_bytes().to_vec()),
        other => Err(Error::Unsupported(other.kind())),
    }
}

/// Encode and send each value on its own, returning the number of values that
/// failed. A value fails when it cannot be encoded, when the transport
/// reports an error, or when fewer bytes than encoded were written. Failed
/// values are not retried and do not stop the remaining ones.
pub fn write_values(port: &mut dyn PortHandle, values: &[Value]) -> usize {
    let mut errors = 0;
    for value in values {
        let bytes = match encode(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("write: {}", e);
                errors += 1;
                continue;
            }
        };
        match port.write(&bytes) {
            Ok(n) if n == bytes.len() => trace!("write: sent {} bytes", n),
            Ok(n) => {
                warn!("write: short write, {} of {} bytes", n, bytes.len());
                errors += 1;
            }
            Err(e) => {
                warn!("write: {}", e);
                errors += 1;
            }
        }
    }
    errors
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
use crate::{config::LineConfig, transport::*, SettingsBuilder};

#[cfg(test)]
fn open_mock() -> (Box<dyn PortHandle>, MockWire) {
    let mut transport = MockTransport::new();
    let wire = transport.wire();
    let handle = transport
        .open(
            "mock",
            &LineConfig::default(),
            &SettingsBuilder::new().finalize(),
        )
        .unwrap();
    (handle, wire)
}

#[test]
fn booleans_and_text() {
    assert_eq!(encode(&Value::Bool(true)).unwrap(), b"true");
    assert_eq!(encode(&Value::Bool(false)).unwrap(), b"false");
    assert_eq!(encode(&Value::from("ü!")).unwrap(), "ü!".as_bytes());
    assert_eq!(encode(&Value::from("")).unwrap(), b"");
}

#[test]
fn other_kinds_are_unsupported() {
    assert!(matches!(encode(&Value::Nil), Err(Error::Unsupported("nil"))));
    assert!(matches!(encode(&Value::Int(3)), Err(Error::Unsupported("int"))));
    assert!(matches!(
        encode(&Value::Real(0.5)),
        Err(Error::Unsupported("real"))
    ));
}

#[test]
fn unsupported_value_does_not_block_the_batch() {
    let (mut port, wire) = open_mock();
    let values = vec![Value::from("a"), Value::Int(1), Value::Bool(false)];
    assert_eq!(write_values(port.as_mut(), &values), 1);
    assert_eq!(wire.take_outgoing(), b"afalse".to_vec());
}

#[test]
fn short_writes_count_as_errors() {
    let (mut port, wire) = open_mock();
    wire.set_write_limit(Some(2));
    let values = vec![Value::from("ab"), Value::from("abc")];
    assert_eq!(write_values(port.as_mut(), &values), 1);
    assert_eq!(wire.take_outgoing(), b"abab".to_vec());
}

#[test]
fn transport_errors_count_per_value() {
    let (mut port, wire) = open_mock();
    wire.fail_writes(true);
    let values = vec![Value::Bool(true), Value::from("x")];
    assert_eq!(write_values(port.as_mut(), &values), 2);
}
