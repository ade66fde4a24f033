//! Serial port device transport.

use std::{
    convert::TryFrom,
    fmt,
    io::{self, Read, Write},
    time::Duration,
};

use log::{debug, info, trace};
use serialport::{available_ports as system_ports, SerialPort, SerialPortType};

use super::{PortHandle, PortTransport};
use crate::{
    config::{DataBits, LineConfig, Parity, StopBits},
    error::{Error, Result},
    settings::Settings,
};

//==============================================================================
// Public Interface
//==============================================================================

/// Opens real serial devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortTransport;

impl SerialPortTransport {
    pub fn new() -> Self {
        SerialPortTransport
    }
}

impl PortTransport for SerialPortTransport {
    fn open(
        &mut self,
        path: &str,
        line: &LineConfig,
        settings: &Settings,
    ) -> Result<Box<dyn PortHandle>> {
        let port = open_and_setup_port(path, line, settings)?;
        Ok(Box::new(SerialHandle { port }))
    }
}

/// Enumerates serial devices on the system. USB ports are decorated with the
/// manufacturer and product of the connected controller, as
/// `"<name>: (<manufacturer> / <product>)"`.
pub fn available_ports() -> Vec<String> {
    let mut ports = vec![];
    match system_ports() {
        Ok(found) => {
            for p in found {
                match p.port_type {
                    SerialPortType::UsbPort(info) => {
                        ports.push(format!(
                            "{}: ({} / {})",
                            p.port_name,
                            info.manufacturer.as_ref().map_or("", String::as_str),
                            info.product.as_ref().map_or("", String::as_str)
                        ));
                    }
                    // Other devices, such as virtual ports for testing
                    _ => ports.push(p.port_name),
                }
            }
        }
        Err(ref e) => {
            info!("error: {}", e);
        }
    }
    ports
}

//==============================================================================
// Private stuff
//==============================================================================

struct SerialHandle {
    port: Box<dyn SerialPort>,
}

impl fmt::Debug for SerialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let port = &self.port;
        f.debug_tuple("SerialHandle")
            .field(&port.name())
            .field(&port.baud_rate())
            .field(&port.data_bits())
            .field(&port.stop_bits())
            .field(&port.parity())
            .field(&port.flow_control())
            .finish()
    }
}

impl PortHandle for SerialHandle {
    fn name(&self) -> Option<String> {
        self.port.name()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // Whether `read` blocks depends on the platform and the timeout. Ask
        // for the number of queued bytes first and never request more, so the
        // read always returns immediately.
        let queued = self.port.bytes_to_read()? as usize;
        trace!("bytes queued on the device: {}", queued);
        let len = queued.min(buf.len());
        if len == 0 {
            return Ok(0);
        }
        match self.port.read(&mut buf[..len]) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self.port.write(buf) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&mut self) -> Result<()> {
        Write::flush(&mut self.port).map_err(Error::from)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout).map_err(Error::from)
    }
}

fn open_and_setup_port(
    path: &str,
    line: &LineConfig,
    settings: &Settings,
) -> Result<Box<dyn SerialPort>> {
    use retry::{delay, retry_with_index};

    let data_bits = to_serial_data_bits(line.data_bits);
    let parity = to_serial_parity(line.parity);
    let stop_bits = to_serial_stop_bits(line.stop_bits)?;

    let result = retry_with_index(
        delay::Fixed::from_millis(retry_delay_millis(settings.open_retry_delay))
            .take(settings.open_attempts.saturating_sub(1)),
        |index| -> std::result::Result<Box<dyn SerialPort>, serialport::Error> {
            debug!("Trying to open {} (attempt {})", path, index);
            serialport::new(path, settings.baud_rate)
                .data_bits(data_bits)
                .parity(parity)
                .stop_bits(stop_bits)
                .flow_control(settings.flow_control)
                .timeout(settings.timeout)
                .open()
        },
    );

    match result {
        Ok(mut port) => {
            // Some backends do not apply every parameter on `open`.
            port.set_baud_rate(settings.baud_rate)?;
            port.set_data_bits(data_bits)?;
            port.set_parity(parity)?;
            port.set_stop_bits(stop_bits)?;
            port.set_flow_control(settings.flow_control)?;
            port.set_timeout(settings.timeout)?;

            info!(
                "Connected to {} at {} baud ({})",
                port.name().unwrap_or_else(|| path.to_string()),
                settings.baud_rate,
                line
            );
            debug!("data_bits    : {:?}", port.data_bits());
            debug!("stop_bits    : {:?}", port.stop_bits());
            debug!("parity       : {:?}", port.parity());
            debug!("flow control : {:?}", port.flow_control());
            Ok(port)
        }
        Err(retry::Error::Operation {
            error,
            total_delay,
            tries,
        }) => {
            info!(
                "Failed to open {} after {:?} and {} tries: {}",
                path, total_delay, tries, error,
            );
            Err(error.into())
        }
        Err(retry::Error::Internal(msg)) => {
            info!("Internal retry error while opening {}: {}", path, msg);
            Err(Error::Transport(io::Error::new(
                io::ErrorKind::Other,
                "internal error while retrying to open the port",
            )))
        }
    }
}

fn to_serial_data_bits(data_bits: DataBits) -> serialport::DataBits {
    match data_bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn to_serial_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

fn to_serial_stop_bits(stop_bits: StopBits) -> Result<serialport::StopBits> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(Error::Transport(io::Error::new(
            io::ErrorKind::InvalidInput,
            "1.5 stop bits is not supported by the serial device layer",
        ))),
    }
}

fn retry_delay_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn line_config_maps_to_device_settings() {
    let line: LineConfig = "7O2".parse().unwrap();
    assert_eq!(
        to_serial_data_bits(line.data_bits),
        serialport::DataBits::Seven
    );
    assert_eq!(to_serial_parity(line.parity), serialport::Parity::Odd);
    assert_eq!(
        to_serial_stop_bits(line.stop_bits).unwrap(),
        serialport::StopBits::Two
    );
}

#[test]
fn one_and_a_half_stop_bits_is_refused() {
    assert!(matches!(
        to_serial_stop_bits(StopBits::OnePointFive),
        Err(Error::Transport(_))
    ));
}

#[test]
fn opening_a_missing_device_fails() {
    let settings = crate::SettingsBuilder::new().finalize();
    let mut transport = SerialPortTransport::new();
    let result = transport.open(
        "/dev/pollcom-does-not-exist",
        &LineConfig::default(),
        &settings,
    );
    assert!(matches!(result, Err(Error::Transport(_))));
}

#[test]
fn huge_retry_delay_saturates() {
    assert_eq!(retry_delay_millis(Duration::from_millis(1500)), 1500);
    assert_eq!(retry_delay_millis(Duration::from_secs(u64::MAX)), u64::MAX);
}
