//! Buffering between the blocking port transport and polling callers.
//!
//! Data flows from the transport into a [`RingBuffer`] via [`refill`], and out
//! of it either byte by byte or as text through [`decode_prefix`], which never
//! splits a multi-byte UTF-8 sequence.

mod refill;
mod ring;
mod text;

pub use refill::refill;
pub use ring::{RingBuffer, DEFAULT_CAPACITY, MIN_CAPACITY};
pub use text::decode_prefix;
pub(crate) use text::read_text;
