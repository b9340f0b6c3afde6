//! Byte transport layer for serial peripherals.
//!
//! Defines the `ByteTransport` trait, the real `SerialChannel` backed by the
//! `serialport` crate, and the `UnavailableTransport` stand-in used when the
//! host has no serial driver. No retry logic lives here — retry policy (or
//! the deliberate absence of one) belongs to the caller.

use std::io::Write;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{Parity, SerialConfig};
use crate::error::TransportError;

/// Abstract byte-level transport for a printer or cash-drawer port.
pub trait ByteTransport: Send {
    /// Open the port with the given framing. Fails if busy or absent.
    fn open(&mut self, config: &SerialConfig) -> Result<(), TransportError>;

    /// Write and flush all bytes. Fails if the port is closed or the OS
    /// write errors.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Close the port. Idempotent.
    fn close(&mut self);

    /// Whether the transport currently holds an open port.
    fn is_open(&self) -> bool;

    /// Human-readable description of the connection target.
    fn description(&self) -> String;
}

impl std::fmt::Debug for dyn ByteTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

// ---------------------------------------------------------------------------
// Serial channel
// ---------------------------------------------------------------------------

/// Serial (COM / tty / USB-serial) transport using the `serialport` crate.
pub struct SerialChannel {
    port_name: String,
    baud_rate: u32,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialChannel {
    pub fn new(port_name: &str) -> Self {
        Self {
            port_name: port_name.to_string(),
            baud_rate: 0,
            port: None,
        }
    }
}

impl ByteTransport for SerialChannel {
    fn open(&mut self, config: &SerialConfig) -> Result<(), TransportError> {
        let data_bits = match config.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            _ => serialport::DataBits::Eight,
        };
        let parity = match config.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };
        let stop_bits = match config.stop_bits {
            2 => serialport::StopBits::Two,
            _ => serialport::StopBits::One,
        };

        let port = serialport::new(&self.port_name, config.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|e| TransportError::Open {
                port: self.port_name.clone(),
                reason: e.to_string(),
            })?;

        self.baud_rate = config.baud_rate;
        self.port = Some(port);
        info!(port = %self.port_name, baud = config.baud_rate, "Serial port opened");
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or_else(|| TransportError::NotOpen {
            port: self.port_name.clone(),
        })?;

        debug!(port = %self.port_name, bytes = data.len(), "Serial TX");
        port.write_all(data).map_err(|e| TransportError::Write {
            port: self.port_name.clone(),
            reason: e.to_string(),
        })?;
        port.flush().map_err(|e| TransportError::Write {
            port: self.port_name.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!(port = %self.port_name, "Serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn description(&self) -> String {
        format!("Serial({}@{})", self.port_name, self.baud_rate)
    }
}

// ---------------------------------------------------------------------------
// Unavailable transport
// ---------------------------------------------------------------------------

/// Transport stand-in selected when the host has no serial driver. Every
/// operation reports the port as unavailable; nothing panics.
pub struct UnavailableTransport {
    port_name: String,
}

impl UnavailableTransport {
    pub fn new(port_name: &str) -> Self {
        Self {
            port_name: port_name.to_string(),
        }
    }
}

impl ByteTransport for UnavailableTransport {
    fn open(&mut self, _config: &SerialConfig) -> Result<(), TransportError> {
        Err(TransportError::Open {
            port: self.port_name.clone(),
            reason: "serial capability unavailable on this host".into(),
        })
    }

    fn write(&mut self, _data: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::NotOpen {
            port: self.port_name.clone(),
        })
    }

    fn close(&mut self) {}

    fn is_open(&self) -> bool {
        false
    }

    fn description(&self) -> String {
        format!("Unavailable({})", self.port_name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_channel_initial_state() {
        let t = SerialChannel::new("COM99");
        assert!(!t.is_open());
        assert_eq!(t.description(), "Serial(COM99@0)");
    }

    #[test]
    fn test_serial_write_without_open_errors() {
        let mut t = SerialChannel::new("COM99");
        let err = t.write(b"test").unwrap_err();
        assert_eq!(
            err,
            TransportError::NotOpen {
                port: "COM99".into()
            }
        );
    }

    #[test]
    fn test_serial_open_nonexistent_port_fails() {
        let mut t = SerialChannel::new("/dev/ttyDOESNOTEXIST");
        let err = t.open(&SerialConfig::default()).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(!t.is_open());
    }

    #[test]
    fn test_serial_close_is_idempotent() {
        let mut t = SerialChannel::new("COM99");
        t.close();
        t.close();
        assert!(!t.is_open());
    }

    #[test]
    fn test_unavailable_transport_degrades() {
        let mut t = UnavailableTransport::new("COM1");
        assert!(!t.is_open());
        assert!(t.open(&SerialConfig::default()).is_err());
        assert!(t.write(b"x").is_err());
        t.close();
        t.close();
        assert_eq!(t.description(), "Unavailable(COM1)");
    }
}
