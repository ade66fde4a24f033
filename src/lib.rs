//! Pollcom gives a host application non-blocking, polling access to a serial
//! port. Callers periodically ask how many bytes are available, pull bytes or
//! text, and push values to transmit, without ever being blocked by the
//! device.
//!
//! The device itself is reached through a blocking [`PortTransport`]. Pollcom
//! makes it look non-blocking by buffering what the transport delivers in a
//! fixed-capacity [`RingBuffer`](buffer::RingBuffer), refilled lazily and only
//! when a read finds it empty:
//!
//! ```text
//!   transport --refill--> ring buffer --+--> read / peek (bytes)
//!                                       '--> read_string (UTF-8 text)
//!
//!   write(values) --encode--> transport
//! ```
//!
//! * Text reads never split a multi-byte UTF-8 character: a trailing partial
//!   character stays buffered until the rest of it arrives.
//! * The ring buffer never overwrites unread data. When it is full, incoming
//!   data stays in the device until the caller catches up.
//! * Line framing is given either as a packed integer (`0x801`) or as a
//!   mnemonic (`"8N1"`); both are derived from one [`LineConfig`] and
//!   anything else is rejected, never replaced by a default.
//!
//! Two layers are available: [`Session`], with `Result` returns, and the
//! host-facing [`Serial`](binding::Serial) object, which turns routine
//! conditions into sentinel values the way a scripting host expects.
//!
//! **Example**
//! ```no_run
//! use pollcom::{binding::Serial, transport::SerialPortTransport, SettingsBuilder, Value};
//!
//! let settings = SettingsBuilder::new().baud_rate(115_200).finalize();
//! let mut serial = Serial::new(SerialPortTransport::new(), settings);
//! if serial.open("/dev/ttyUSB0", Some(&Value::from("8N1"))) {
//!     serial.write(&[Value::from("ping\n")]);
//!     if let Some(text) = serial.read_string() {
//!         println!("{}", text);
//!     }
//!     serial.close();
//! }
//! ```

pub mod binding;
pub mod buffer;
pub mod config;
pub mod encoder;
pub mod session;
pub mod transport;

mod error;
mod settings;
mod value;

pub use binding::Serial;
pub use config::LineConfig;
pub use error::{Error, Result};
pub use session::Session;
pub use settings::{FlowControl, Settings, SettingsBuilder};
pub use transport::{PortHandle, PortTransport};
pub use value::Value;
