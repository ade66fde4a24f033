//! UTF-8 boundary safe text extraction.
//!
//! Serial data arrives in arbitrary chunks, so the buffered bytes may end in
//! the middle of a multi-byte character. Text is only ever taken up to the
//! longest valid UTF-8 prefix; the trailing partial sequence stays buffered
//! until the rest of it arrives.

use std::str;

use log::trace;

use super::RingBuffer;
use crate::error::{Error, Result};

/// The longest prefix of `bytes` that is valid UTF-8.
///
/// The number of bytes consumed is the `len()` of the returned text. Invalid
/// sequences are never replaced: decoding stops right before the first byte
/// that cannot be part of valid text.
pub fn decode_prefix(bytes: &[u8]) -> Result<&str> {
    if bytes.is_empty() {
        return Err(Error::EmptyBuffer);
    }
    let valid = match str::from_utf8(bytes) {
        Ok(text) => return Ok(text),
        Err(e) => e.valid_up_to(),
    };
    if valid == 0 {
        return Err(Error::NoValidPrefix);
    }
    // `valid_up_to` guarantees this range is well formed.
    str::from_utf8(&bytes[..valid]).map_err(|_| Error::NoValidPrefix)
}

/// Take the longest valid UTF-8 prefix out of `ring`, advancing its read
/// cursor by the number of bytes decoded (not the number of characters).
pub(crate) fn read_text(ring: &mut RingBuffer) -> Result<String> {
    let bytes = ring.to_vec();
    let text = decode_prefix(&bytes)?.to_owned();
    ring.consume(text.len());
    trace!(
        "decoded {} of {} buffered bytes as text",
        text.len(),
        bytes.len()
    );
    Ok(text)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn whole_span_when_valid() {
    assert_eq!(decode_prefix("héllo".as_bytes()).unwrap(), "héllo");
}

#[test]
fn truncated_sequence_is_left_out() {
    // "aé€" followed by the first two bytes of "😀"
    let mut bytes = "aé€".as_bytes().to_vec();
    bytes.extend_from_slice(&"😀".as_bytes()[..2]);
    let text = decode_prefix(&bytes).unwrap();
    assert_eq!(text, "aé€");
    assert_eq!(text.len(), 6);
}

#[test]
fn stops_before_invalid_byte() {
    assert_eq!(decode_prefix(b"ok\xFFmore").unwrap(), "ok");
}

#[test]
fn no_data_and_no_prefix() {
    assert!(matches!(decode_prefix(b""), Err(Error::EmptyBuffer)));
    assert!(matches!(decode_prefix(b"\xFF\x00"), Err(Error::NoValidPrefix)));
    assert!(matches!(decode_prefix(&[0xE2, 0x82]), Err(Error::NoValidPrefix)));
}

#[test]
fn read_text_leaves_partial_sequence_buffered() {
    let euro = "€".as_bytes();
    let mut ring = RingBuffer::with_capacity(16);
    ring.write_bytes(b"ab").unwrap();
    ring.write_bytes(&euro[..1]).unwrap();

    assert_eq!(read_text(&mut ring).unwrap(), "ab");
    assert_eq!(ring.available_for_read(), 1);
    assert!(matches!(read_text(&mut ring), Err(Error::NoValidPrefix)));

    ring.write_bytes(&euro[1..]).unwrap();
    ring.write_bytes(b"!").unwrap();
    assert_eq!(read_text(&mut ring).unwrap(), "€!");
    assert!(ring.is_empty());
}

#[test]
fn read_text_across_storage_wrap() {
    let mut ring = RingBuffer::with_capacity(8);
    ring.write_bytes(b"xxxxx").unwrap();
    ring.consume(5);
    ring.write_bytes("añb".as_bytes()).unwrap();
    let (_, tail) = ring.as_slices();
    assert!(!tail.is_empty());
    assert_eq!(read_text(&mut ring).unwrap(), "añb");
}
