//! Pulling bytes from the port transport into the ring buffer.

use log::{trace, warn};

use super::RingBuffer;
use crate::{
    error::{Error, Result},
    transport::PortHandle,
};

/// Read from `port` into the free space of `ring` and return how many bytes
/// were added.
///
/// The free space is filled by at most two transport reads: the contiguous
/// span from the write cursor to the end of the storage (or to the slot before
/// the read cursor), then, only if that first read was complete and the write
/// cursor wrapped, the span at the start of the storage. A short read is not
/// an error, it just yields fewer bytes.
///
/// Fails with [`Error::BufferFull`] when there is no free space, or with the
/// transport error when the first read fails. A failure of the second read is
/// logged and the bytes from the first read are kept.
pub fn refill(ring: &mut RingBuffer, port: &mut dyn PortHandle) -> Result<usize> {
    if ring.is_full() {
        return Err(Error::BufferFull);
    }

    let span = ring.write_span_mut();
    let requested = span.len();
    let first = port.read(span)?;
    ring.commit_write(first);
    trace!("refill: first read {} of {} bytes", first, requested);

    if first < requested || ring.is_full() {
        return Ok(first);
    }

    let span = ring.write_span_mut();
    let requested = span.len();
    match port.read(span) {
        Ok(second) => {
            ring.commit_write(second);
            trace!("refill: second read {} of {} bytes", second, requested);
            Ok(first + second)
        }
        Err(e) => {
            warn!("refill: second read failed, keeping {} bytes: {}", first, e);
            Ok(first)
        }
    }
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
fn short_read_is_partial_data() {
    let (mut port, wire) = open_mock();
    let mut ring = RingBuffer::with_capacity(16);
    wire.push_incoming(b"abc");
    assert_eq!(refill(&mut ring, port.as_mut()).unwrap(), 3);
    assert_eq!(ring.to_vec(), b"abc".to_vec());
    assert_eq!(wire.read_calls(), 1);
}

#[test]
fn nothing_to_read_adds_nothing() {
    let (mut port, _wire) = open_mock();
    let mut ring = RingBuffer::with_capacity(16);
    assert_eq!(refill(&mut ring, port.as_mut()).unwrap(), 0);
    assert!(ring.is_empty());
}

#[test]
fn wrapped_free_space_takes_two_reads() {
    let (mut port, wire) = open_mock();
    let mut ring = RingBuffer::with_capacity(8);
    ring.write_bytes(b"12345").unwrap();
    ring.consume(5);

    wire.push_incoming(b"abcdefghij");
    // 3 bytes to the end of storage, then 4 before the read cursor
    assert_eq!(refill(&mut ring, port.as_mut()).unwrap(), 7);
    assert_eq!(wire.read_calls(), 2);
    assert!(ring.is_full());
    assert_eq!(ring.to_vec(), b"abcdefg".to_vec());
    assert_eq!(wire.pending_incoming(), 3);
}

#[test]
fn full_buffer_is_refused() {
    let (mut port, wire) = open_mock();
    let mut ring = RingBuffer::with_capacity(5);
    ring.write_bytes(b"wxyz").unwrap();
    wire.push_incoming(b"more");
    assert!(matches!(
        refill(&mut ring, port.as_mut()),
        Err(Error::BufferFull)
    ));
    assert_eq!(wire.read_calls(), 0);
}

#[test]
fn transport_failure_is_reported() {
    let (mut port, wire) = open_mock();
    let mut ring = RingBuffer::with_capacity(8);
    wire.push_incoming(b"abc");
    wire.fail_reads(true);
    assert!(matches!(
        refill(&mut ring, port.as_mut()),
        Err(Error::Transport(_))
    ));
    assert!(ring.is_empty());
}

#[test]
fn short_first_read_before_wrap_stops_early() {
    let (mut port, wire) = open_mock();
    let mut ring = RingBuffer::with_capacity(8);
    ring.write_bytes(b"12345").unwrap();
    ring.consume(5);

    // 3 free bytes up to the end of storage, but only 2 arrive
    wire.push_incoming(b"ab");
    assert_eq!(refill(&mut ring, port.as_mut()).unwrap(), 2);
    assert_eq!(wire.read_calls(), 1);
    assert_eq!(ring.to_vec(), b"ab".to_vec());
}

#[test]
fn second_read_failure_keeps_first_read() {
    let (mut port, wire) = open_mock();
    let mut ring = RingBuffer::with_capacity(8);
    ring.write_bytes(b"12345").unwrap();
    ring.consume(5);

    wire.push_incoming(b"abcdefghij");
    wire.fail_reads_after(Some(1));
    assert_eq!(refill(&mut ring, port.as_mut()).unwrap(), 3);
    assert_eq!(wire.read_calls(), 2);
    assert_eq!(ring.to_vec(), b"abc".to_vec());
    assert_eq!(wire.pending_incoming(), 7);
}
