//! Settings for `pollcom` sessions and the serial port transport.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values. The line framing (data bits,
//! parity, stop bits) is not part of the settings: it is given to each `open`
//! call, see [`LineConfig`](crate::config::LineConfig).

use std::time::Duration;

pub use serialport::FlowControl;

use crate::buffer::{DEFAULT_CAPACITY, MIN_CAPACITY};

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings used when opening a port and sizing its receive
/// buffer, and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// How long a single transport read or write may block. Advisory for the
    /// session itself, which never waits on its own.
    pub timeout: Duration,
    /// Number of slots of the receive ring buffer, one of which is always
    /// kept free.
    pub buffer_capacity: usize,
    /// How many times opening the device is attempted before giving up.
    pub open_attempts: usize,
    /// Delay between two attempts at opening the device.
    pub open_retry_delay: Duration,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use pollcom::SettingsBuilder;
///
/// let settings = SettingsBuilder::new().baud_rate(115_200).finalize();
/// assert_eq!(settings.buffer_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        SettingsBuilder::new()
    }
}

impl SettingsBuilder {
    /// Start building the settings using default values.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                baud_rate: 19_200,
                flow_control: FlowControl::None,
                timeout: Duration::from_millis(0),
                buffer_capacity: DEFAULT_CAPACITY,
                open_attempts: 1,
                open_retry_delay: Duration::from_millis(1000),
                _private_use_builder: (),
            },
        }
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the type of signalling to use for controlling data transfer
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.settings.flow_control = flow_control;
        self
    }

    /// Set how long a transport read or write may block
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Set the number of slots in the receive buffer, at least 5 so that the
    /// longest UTF-8 character fits next to the reserved slot
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.settings.buffer_capacity = capacity.max(MIN_CAPACITY);
        self
    }

    /// Set how many times opening the device is attempted, at least once
    pub fn open_attempts(mut self, attempts: usize) -> Self {
        self.settings.open_attempts = attempts.max(1);
        self
    }

    /// Set the delay between two attempts at opening the device
    pub fn open_retry_delay(mut self, delay: Duration) -> Self {
        self.settings.open_retry_delay = delay;
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            baud_rate: 19_200,
            flow_control: FlowControl::None,
            timeout: Duration::from_millis(0),
            buffer_capacity: 256,
            open_attempts: 1,
            open_retry_delay: Duration::from_millis(1000),
            _private_use_builder: (),
        }
    )
}

#[test]
fn baud_rate() {
    let baud_rate = 115_200;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn flow_control() {
    let flow_control = FlowControl::Hardware;
    let settings = SettingsBuilder::new().flow_control(flow_control).finalize();
    assert_eq!(settings.flow_control, flow_control);
}

#[test]
fn timeout() {
    let settings = SettingsBuilder::new()
        .timeout(Duration::from_millis(250))
        .finalize();
    assert_eq!(settings.timeout, Duration::from_millis(250));
}

#[test]
fn buffer_capacity_keeps_reserved_slot() {
    assert_eq!(
        SettingsBuilder::new()
            .buffer_capacity(1024)
            .finalize()
            .buffer_capacity,
        1024
    );
    assert_eq!(
        SettingsBuilder::new()
            .buffer_capacity(3)
            .finalize()
            .buffer_capacity,
        5
    );
}

#[test]
fn open_retries() {
    let settings = SettingsBuilder::new()
        .open_attempts(0)
        .open_retry_delay(Duration::from_millis(10))
        .finalize();
    assert_eq!(settings.open_attempts, 1);
    assert_eq!(settings.open_retry_delay, Duration::from_millis(10));
}
