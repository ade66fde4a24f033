//! Fixed-capacity circular byte store.
//!
//! ```text
//!          read              write
//!           |                  |
//!           v                  v
//!   +---+---+---+---+---+---+---+---+
//!   |   |   | a | b | c | d |   |   |
//!   +---+---+---+---+---+---+---+---+
//! ```
//!
//! The buffer holds `(write - read) mod C` bytes. One slot is always left
//! unused so that `read == write` unambiguously means *empty*; a buffer of
//! capacity `C` therefore stores at most `C - 1` unread bytes.

use crate::error::{Error, Result};

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 256;

/// Smallest capacity: a 4-byte UTF-8 sequence plus the reserved slot.
pub const MIN_CAPACITY: usize = 5;

// =============================================================================
// Public Interface
// =============================================================================

#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Box<[u8]>,
    /// Next byte to read.
    read: usize,
    /// Next slot to write.
    write: usize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        RingBuffer::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RingBuffer {
    /// Create an empty buffer with `capacity` slots. Capacities below
    /// [`MIN_CAPACITY`] are raised to it, so that any single character fits.
    pub fn with_capacity(capacity: usize) -> Self {
        RingBuffer {
            data: vec![0; capacity.max(MIN_CAPACITY)].into_boxed_slice(),
            read: 0,
            write: 0,
        }
    }

    /// Total number of slots, including the reserved one.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes ready for consumption.
    pub fn available_for_read(&self) -> usize {
        (self.write + self.capacity() - self.read) % self.capacity()
    }

    /// Free slots remaining. Always `capacity - 1 - available_for_read`.
    pub fn available_for_write(&self) -> usize {
        self.capacity() - 1 - self.available_for_read()
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    pub fn is_full(&self) -> bool {
        self.available_for_write() == 0
    }

    /// The next unread byte, without consuming it.
    pub fn peek(&self) -> Result<u8> {
        if self.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        Ok(self.data[self.read])
    }

    /// Consume and return the next unread byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek()?;
        self.read = (self.read + 1) % self.capacity();
        Ok(byte)
    }

    /// Append `bytes` at the write cursor.
    ///
    /// Either all of `bytes` is stored or nothing is: when there is not
    /// enough free space the call fails with [`Error::BufferFull`] and unread
    /// data is left untouched.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.available_for_write() {
            return Err(Error::BufferFull);
        }
        let mut remaining = bytes;
        while !remaining.is_empty() {
            let span = self.write_span_mut();
            let n = span.len().min(remaining.len());
            span[..n].copy_from_slice(&remaining[..n]);
            self.commit_write(n);
            remaining = &remaining[n..];
        }
        Ok(())
    }

    /// Advance the read cursor by `count` bytes, at most the number of
    /// unread ones. Returns how many bytes were actually skipped.
    pub fn consume(&mut self, count: usize) -> usize {
        let count = count.min(self.available_for_read());
        self.read = (self.read + count) % self.capacity();
        count
    }

    /// The unread bytes as two slices, in order. The second slice is empty
    /// unless the data wraps around the end of the storage.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        if self.write >= self.read {
            (&self.data[self.read..self.write], &[])
        } else {
            (&self.data[self.read..], &self.data[..self.write])
        }
    }

    /// Copy all unread bytes, in order, without consuming them.
    pub fn to_vec(&self) -> Vec<u8> {
        let (head, tail) = self.as_slices();
        let mut bytes = Vec::with_capacity(head.len() + tail.len());
        bytes.extend_from_slice(head);
        bytes.extend_from_slice(tail);
        bytes
    }

    // -------------------------------------------------------------------------
    // Crate-Public Interface
    // -------------------------------------------------------------------------

    /// The largest contiguous free span starting at the write cursor. It ends
    /// either at the end of the storage or one slot before the read cursor,
    /// whichever comes first.
    pub(crate) fn write_span_mut(&mut self) -> &mut [u8] {
        let end = if self.write >= self.read {
            if self.read == 0 {
                self.capacity() - 1
            } else {
                self.capacity()
            }
        } else {
            self.read - 1
        };
        let start = self.write;
        &mut self.data[start..end]
    }

    /// Mark `count` bytes of the span returned by
    /// [`write_span_mut`](Self::write_span_mut) as written.
    pub(crate) fn commit_write(&mut self, count: usize) {
        debug_assert!(count <= self.available_for_write());
        self.write = (self.write + count) % self.capacity();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn new_buffer_is_empty() {
    let ring = RingBuffer::default();
    assert_eq!(ring.capacity(), 256);
    assert_eq!(ring.available_for_read(), 0);
    assert_eq!(ring.available_for_write(), 255);
    assert!(matches!(ring.peek(), Err(Error::EmptyBuffer)));
}

#[test]
fn tiny_capacity_is_raised() {
    let mut ring = RingBuffer::with_capacity(0);
    assert_eq!(ring.capacity(), MIN_CAPACITY);
    assert_eq!(ring.available_for_write(), 4);
    ring.write_bytes("🚀".as_bytes()).unwrap();
    assert!(ring.is_full());
}

#[test]
fn fifo_order_across_wrap_around() {
    let mut ring = RingBuffer::with_capacity(8);
    let mut expected = 0u8;
    let mut next = 0u8;
    for round in 0..20 {
        let chunk: Vec<u8> = (0..(round % 5 + 1))
            .map(|_| {
                next = next.wrapping_add(1);
                next
            })
            .collect();
        ring.write_bytes(&chunk).unwrap();
        while !ring.is_empty() {
            expected = expected.wrapping_add(1);
            assert_eq!(ring.read_byte().unwrap(), expected);
        }
    }
}

#[test]
fn available_counts_always_sum_to_capacity_minus_one() {
    let mut ring = RingBuffer::with_capacity(16);
    for step in 0..100usize {
        if step % 3 == 0 {
            let _ = ring.read_byte();
        } else {
            let _ = ring.write_bytes(&[step as u8; 2]);
        }
        assert_eq!(ring.available_for_read() + ring.available_for_write(), 15);
    }
}

#[test]
fn full_buffer_refuses_writes() {
    let mut ring = RingBuffer::default();
    let data: Vec<u8> = (0..255).map(|i| i as u8).collect();
    ring.write_bytes(&data).unwrap();
    assert!(ring.is_full());
    assert!(matches!(ring.write_bytes(&[0xAA]), Err(Error::BufferFull)));
    assert_eq!(ring.available_for_read(), 255);
    assert_eq!(ring.peek().unwrap(), 0);
    assert_eq!(ring.to_vec(), data);
}

#[test]
fn oversized_write_stores_nothing() {
    let mut ring = RingBuffer::with_capacity(5);
    ring.write_bytes(&[1]).unwrap();
    assert!(matches!(ring.write_bytes(&[2, 3, 4, 5]), Err(Error::BufferFull)));
    assert_eq!(ring.to_vec(), vec![1]);
}

#[test]
fn peek_does_not_consume() {
    let mut ring = RingBuffer::default();
    ring.write_bytes(b"ab").unwrap();
    assert_eq!(ring.peek().unwrap(), b'a');
    assert_eq!(ring.peek().unwrap(), b'a');
    assert_eq!(ring.read_byte().unwrap(), b'a');
    assert_eq!(ring.peek().unwrap(), b'b');
}

#[test]
fn slices_follow_wrap_around() {
    let mut ring = RingBuffer::with_capacity(6);
    ring.write_bytes(b"abcd").unwrap();
    assert_eq!(ring.consume(3), 3);
    ring.write_bytes(b"efg").unwrap();
    let (head, tail) = ring.as_slices();
    assert_eq!(head, b"def");
    assert_eq!(tail, b"g");
    assert_eq!(ring.to_vec(), b"defg".to_vec());
    assert_eq!(ring.consume(10), 4);
    assert!(ring.is_empty());
}

#[test]
fn write_span_leaves_reserved_slot() {
    let mut ring = RingBuffer::with_capacity(8);
    assert_eq!(ring.write_span_mut().len(), 7);

    ring.write_bytes(b"abc").unwrap();
    ring.consume(2);
    // write = 3, read = 2: free span runs to the end of storage
    assert_eq!(ring.write_span_mut().len(), 5);
    ring.commit_write(5);
    // write wrapped to 0: free span stops before read - 1
    assert_eq!(ring.write_span_mut().len(), 1);
    ring.commit_write(1);
    assert!(ring.is_full());
    assert_eq!(ring.write_span_mut().len(), 0);
}
