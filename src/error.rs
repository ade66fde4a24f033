//! Error types for `pollcom`.
//!
//! Buffer-level conditions (`EmptyBuffer`, `BufferFull`) are routine in a
//! polling API and are turned into sentinel values by the
//! [`binding`](crate::binding) layer. The remaining kinds abort only the call
//! that produced them; the session is never left in a partial state.

use std::io;

use thiserror::Error;

/// Main error type for all session, buffer and codec operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The ring buffer has no free slot left for incoming data.
    #[error("ring buffer is full")]
    BufferFull,

    /// Nothing is buffered and the transport did not deliver anything.
    #[error("no data available")]
    EmptyBuffer,

    /// A line configuration that does not decode to a supported
    /// (data bits, parity, stop bits) triple.
    #[error("invalid line configuration: {0}")]
    InvalidConfig(String),

    /// Operation attempted while the session is closed.
    #[error("not connected")]
    NotConnected,

    /// The session is already open on the named port.
    #[error("already open on `{0}`")]
    AlreadyOpen(String),

    /// An empty port identifier was given to `open`.
    #[error("empty port name")]
    EmptyPortName,

    /// Underlying I/O failure reported by the port transport.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// Value kind that cannot be encoded for transmission.
    #[error("unsupported value kind `{0}`")]
    Unsupported(&'static str),

    /// The buffered bytes do not start with any valid UTF-8 text.
    #[error("no valid UTF-8 prefix in buffered data")]
    NoValidPrefix,
}

impl From<serialport::Error> for Error {
    fn from(err: serialport::Error) -> Self {
        Error::Transport(err.into())
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn serialport_error_becomes_transport() {
    let err: Error = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone").into();
    match err {
        Error::Transport(io_err) => assert!(io_err.to_string().contains("gone")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn display_messages() {
    assert_eq!(Error::NotConnected.to_string(), "not connected");
    assert_eq!(
        Error::InvalidConfig("9N1".into()).to_string(),
        "invalid line configuration: 9N1"
    );
    assert_eq!(
        Error::Unsupported("int").to_string(),
        "unsupported value kind `int`"
    );
}
