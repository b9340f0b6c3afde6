//! Host capability layer for optional device drivers.
//!
//! HID (barcode scanners) and serial (printers, drawers, displays) support
//! are optional on any given host: the native driver may be missing or the
//! process may lack device permissions. Each capability is a trait with a
//! real implementation and an "unavailable" implementation, selected once
//! at startup — detection against an unavailable capability yields an empty
//! list, never an error, so the terminal keeps running for cash sales.

use std::collections::HashSet;
use std::sync::Mutex;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, warn};

use crate::config::SerialConfig;
use crate::error::{HardwareError, TransportError};
use crate::transport::{ByteTransport, SerialChannel};

// ---------------------------------------------------------------------------
// HID capability
// ---------------------------------------------------------------------------

/// Identity of one enumerated HID device.
#[derive(Debug, Clone)]
pub struct HidDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// Blocking byte stream from an opened HID device.
pub trait HidStream: Send {
    /// Read up to `buf.len()` bytes, waiting at most `timeout_ms`.
    /// `Ok(0)` means no data arrived within the timeout.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize, TransportError>;
}

impl std::fmt::Debug for dyn HidStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HidStream")
    }
}

/// HID enumeration and open, behind the optional-driver boundary.
pub trait HidCapability: Send + Sync {
    fn is_available(&self) -> bool;

    /// Enumerate HID devices, one entry per distinct (vid, pid). Empty when
    /// the capability is unavailable.
    fn enumerate(&self) -> Vec<HidDeviceInfo>;

    fn open(&self, vendor_id: u16, product_id: u16) -> Result<Box<dyn HidStream>, HardwareError>;
}

/// Real HID capability backed by `hidapi`.
pub struct HidApiCapability {
    // HidApi is not Sync; all access funnels through this lock.
    api: Mutex<HidApi>,
}

impl HidApiCapability {
    /// Probe the host HID driver. `None` when hidapi cannot initialize
    /// (missing libusb/hidraw, sandboxed process, ...).
    pub fn probe() -> Option<Self> {
        match HidApi::new() {
            Ok(api) => Some(Self {
                api: Mutex::new(api),
            }),
            Err(e) => {
                warn!(error = %e, "HID driver unavailable — scanner detection disabled");
                None
            }
        }
    }
}

impl HidCapability for HidApiCapability {
    fn is_available(&self) -> bool {
        true
    }

    fn enumerate(&self) -> Vec<HidDeviceInfo> {
        let mut api = self.api.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = api.refresh_devices() {
            warn!(error = %e, "HID refresh failed — using stale device list");
        }

        // Windows enumerates each HID collection as its own path; collapse
        // to one entry per (vid, pid).
        let mut seen: HashSet<(u16, u16)> = HashSet::new();
        let mut devices = Vec::new();
        for info in api.device_list() {
            let key = (info.vendor_id(), info.product_id());
            if !seen.insert(key) {
                continue;
            }
            devices.push(HidDeviceInfo {
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                manufacturer: info.manufacturer_string().map(str::to_string),
                product: info.product_string().map(str::to_string),
            });
        }
        debug!(count = devices.len(), "HID devices enumerated");
        devices
    }

    fn open(&self, vendor_id: u16, product_id: u16) -> Result<Box<dyn HidStream>, HardwareError> {
        let api = self.api.lock().unwrap_or_else(|e| e.into_inner());
        let device = api.open(vendor_id, product_id).map_err(|e| {
            HardwareError::Transport(TransportError::Open {
                port: format!("hid-{vendor_id:04x}:{product_id:04x}"),
                reason: e.to_string(),
            })
        })?;
        Ok(Box::new(HidDeviceStream {
            label: format!("hid-{vendor_id:04x}:{product_id:04x}"),
            device,
        }))
    }
}

struct HidDeviceStream {
    label: String,
    device: HidDevice,
}

impl HidStream for HidDeviceStream {
    fn read(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize, TransportError> {
        self.device
            .read_timeout(buf, timeout_ms.min(i32::MAX as u64) as i32)
            .map_err(|e| TransportError::Read {
                device: self.label.clone(),
                reason: e.to_string(),
            })
    }
}

/// No-op HID capability for hosts without a HID driver.
pub struct UnavailableHid;

impl HidCapability for UnavailableHid {
    fn is_available(&self) -> bool {
        false
    }

    fn enumerate(&self) -> Vec<HidDeviceInfo> {
        Vec::new()
    }

    fn open(&self, _vendor_id: u16, _product_id: u16) -> Result<Box<dyn HidStream>, HardwareError> {
        Err(HardwareError::CapabilityUnavailable("hid"))
    }
}

// ---------------------------------------------------------------------------
// Serial capability
// ---------------------------------------------------------------------------

/// Identity of one enumerated serial port.
#[derive(Debug, Clone)]
pub struct SerialPortDetails {
    pub port_name: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// Serial-port enumeration and open, behind the optional-driver boundary.
pub trait SerialCapability: Send + Sync {
    fn is_available(&self) -> bool;

    /// Enumerate serial ports with USB metadata where present. Empty when
    /// enumeration fails or the capability is unavailable.
    fn enumerate(&self) -> Vec<SerialPortDetails>;

    /// Open the named port, returning a ready transport.
    fn open(
        &self,
        port: &str,
        config: &SerialConfig,
    ) -> Result<Box<dyn ByteTransport>, HardwareError>;
}

/// Real serial capability backed by the `serialport` crate.
pub struct SerialPortCapability;

impl SerialCapability for SerialPortCapability {
    fn is_available(&self) -> bool {
        true
    }

    fn enumerate(&self) -> Vec<SerialPortDetails> {
        let ports = match serialport::available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!(error = %e, "Serial enumeration failed — treating as no ports");
                return Vec::new();
            }
        };

        ports
            .into_iter()
            .map(|p| match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => SerialPortDetails {
                    port_name: p.port_name,
                    manufacturer: usb.manufacturer,
                    product: usb.product,
                },
                _ => SerialPortDetails {
                    port_name: p.port_name,
                    manufacturer: None,
                    product: None,
                },
            })
            .collect()
    }

    fn open(
        &self,
        port: &str,
        config: &SerialConfig,
    ) -> Result<Box<dyn ByteTransport>, HardwareError> {
        let mut channel = SerialChannel::new(port);
        channel.open(config)?;
        Ok(Box::new(channel))
    }
}

/// No-op serial capability for hosts without a serial driver.
pub struct UnavailableSerial;

impl SerialCapability for UnavailableSerial {
    fn is_available(&self) -> bool {
        false
    }

    fn enumerate(&self) -> Vec<SerialPortDetails> {
        Vec::new()
    }

    fn open(
        &self,
        _port: &str,
        _config: &SerialConfig,
    ) -> Result<Box<dyn ByteTransport>, HardwareError> {
        Err(HardwareError::CapabilityUnavailable("serial"))
    }
}

// ---------------------------------------------------------------------------
// Capability set
// ---------------------------------------------------------------------------

/// The capability pair the registry runs against, chosen once at startup.
pub struct Capabilities {
    pub hid: Box<dyn HidCapability>,
    pub serial: Box<dyn SerialCapability>,
}

impl Capabilities {
    /// Probe the host and select real or unavailable implementations.
    pub fn detect_host() -> Self {
        let hid: Box<dyn HidCapability> = match HidApiCapability::probe() {
            Some(real) => Box::new(real),
            None => Box::new(UnavailableHid),
        };
        Self {
            hid,
            serial: Box::new(SerialPortCapability),
        }
    }

    /// Fully unavailable set — headless hosts and tests.
    pub fn unavailable() -> Self {
        Self {
            hid: Box::new(UnavailableHid),
            serial: Box::new(UnavailableSerial),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
