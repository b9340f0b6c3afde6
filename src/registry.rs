//! Device discovery, classification and session tracking.
//!
//! The registry owns the detected device set and every open hardware
//! session. Detection enumerates HID devices (scanners, matched against a
//! known vendor/product table) and serial ports (printers, cash drawers,
//! customer displays, classified by manufacturer/product strings). A pass
//! replaces the whole device set atomically and emits `devices-detected`.
//!
//! Missing drivers are not errors: an unavailable capability just
//! contributes zero devices of that class.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capability::{Capabilities, SerialPortDetails};
use crate::config::SerialConfig;
use crate::error::HardwareError;
use crate::events::{EventBus, HardwareEvent};
use crate::scanner::ScannerSession;
use crate::transport::ByteTransport;

/// Shared handle to an open printer channel.
pub type PrinterChannel = Arc<Mutex<Box<dyn ByteTransport>>>;

// ---------------------------------------------------------------------------
// Device model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    Scanner,
    Printer,
    CashDrawer,
    Display,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceKind::Scanner => "scanner",
            DeviceKind::Printer => "printer",
            DeviceKind::CashDrawer => "cash-drawer",
            DeviceKind::Display => "display",
        };
        f.write_str(label)
    }
}

/// One detected peripheral.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareDevice {
    pub id: String,
    pub kind: DeviceKind,
    pub name: String,
    pub manufacturer: String,
    pub connected: bool,
    /// Serial devices only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// HID devices only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<u16>,
}

// ---------------------------------------------------------------------------
// Classification tables
// ---------------------------------------------------------------------------

/// Known USB barcode scanner models by (vendor id, product id).
const KNOWN_SCANNERS: &[(u16, u16, &str, &str)] = &[
    (0x05E0, 0x1200, "Symbol LS2208", "Zebra"),
    (0x05E0, 0x1300, "Symbol DS2208", "Zebra"),
    (0x0C2E, 0x0B61, "Voyager 1250g", "Honeywell"),
    (0x0C2E, 0x0901, "Xenon 1900", "Honeywell"),
    (0x05F9, 0x2206, "QuickScan QD2430", "Datalogic"),
    (0x1EAB, 0x0C06, "NLS-HR22", "Newland"),
];

/// Manufacturer substrings that identify a receipt printer.
const PRINTER_MANUFACTURERS: &[&str] = &["epson", "star", "bixolon", "citizen", "snbc", "rongta"];

/// Product codes of serial cash drawer triggers.
const CASH_DRAWER_PRODUCTS: &[&str] = &["cd-415", "ec-410", "mk-410"];

/// Product/manufacturer markers for customer pole displays.
const DISPLAY_MARKERS: &[&str] = &["vfd", "cd5220", "display"];

fn known_scanner(vendor_id: u16, product_id: u16) -> Option<(&'static str, &'static str)> {
    KNOWN_SCANNERS
        .iter()
        .find(|(vid, pid, _, _)| *vid == vendor_id && *pid == product_id)
        .map(|(_, _, name, manufacturer)| (*name, *manufacturer))
}

/// Classify one serial port into a device. Unmatched ports default to
/// `printer` with a placeholder name — a thermal printer with a generic
/// USB-serial bridge reports nothing useful.
fn classify_serial_port(details: &SerialPortDetails) -> HardwareDevice {
    let manufacturer = details.manufacturer.clone().unwrap_or_default();
    let product = details.product.clone().unwrap_or_default();
    let manufacturer_lc = manufacturer.to_ascii_lowercase();
    let product_lc = product.to_ascii_lowercase();

    let (kind, name) = if CASH_DRAWER_PRODUCTS.iter().any(|c| product_lc.contains(c)) {
        (DeviceKind::CashDrawer, product.clone())
    } else if DISPLAY_MARKERS
        .iter()
        .any(|m| product_lc.contains(m) || manufacturer_lc.contains(m))
    {
        let name = if product.is_empty() {
            "Customer Display".to_string()
        } else {
            product.clone()
        };
        (DeviceKind::Display, name)
    } else if PRINTER_MANUFACTURERS
        .iter()
        .any(|m| manufacturer_lc.contains(m))
    {
        let name = if product.is_empty() {
            format!("{manufacturer} Printer")
        } else {
            product.clone()
        };
        (DeviceKind::Printer, name)
    } else {
        (DeviceKind::Printer, "Unknown Serial Device".to_string())
    };

    HardwareDevice {
        id: details.port_name.clone(),
        kind,
        name,
        manufacturer,
        connected: false,
        port: Some(details.port_name.clone()),
        vendor_id: None,
        product_id: None,
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owns the detected device set and all open hardware sessions.
pub struct DeviceRegistry {
    caps: Capabilities,
    events: EventBus,
    devices: Mutex<Vec<HardwareDevice>>,
    scanners: Mutex<HashMap<String, ScannerSession>>,
    printers: Mutex<HashMap<String, PrinterChannel>>,
}

impl DeviceRegistry {
    pub fn new(caps: Capabilities, events: EventBus) -> Self {
        Self {
            caps,
            events,
            devices: Mutex::new(Vec::new()),
            scanners: Mutex::new(HashMap::new()),
            printers: Mutex::new(HashMap::new()),
        }
    }

    /// Run a detection pass, replace the device set, emit `devices-detected`.
    ///
    /// Devices with a live session keep `connected = true` across passes so
    /// a UI refresh cannot orphan an open connection.
    pub fn detect(&self) -> Vec<HardwareDevice> {
        let mut found = Vec::new();

        for info in self.caps.hid.enumerate() {
            let Some((name, manufacturer)) = known_scanner(info.vendor_id, info.product_id)
            else {
                continue;
            };
            let id = format!("hid-{:04x}:{:04x}", info.vendor_id, info.product_id);
            let connected = self.lock_scanners().contains_key(&id);
            found.push(HardwareDevice {
                id,
                kind: DeviceKind::Scanner,
                name: name.to_string(),
                manufacturer: manufacturer.to_string(),
                connected,
                port: None,
                vendor_id: Some(info.vendor_id),
                product_id: Some(info.product_id),
            });
        }

        for details in self.caps.serial.enumerate() {
            let mut device = classify_serial_port(&details);
            device.connected = self
                .lock_printers()
                .get(&device.id)
                .map(|ch| ch.lock().unwrap_or_else(|e| e.into_inner()).is_open())
                .unwrap_or(false);
            found.push(device);
        }

        info!(count = found.len(), "Hardware detection pass complete");
        *self.lock_devices() = found.clone();
        self.events
            .emit(HardwareEvent::DevicesDetected(found.clone()));
        found
    }

    /// Look up a device from the last detection pass.
    pub fn device(&self, device_id: &str) -> Option<HardwareDevice> {
        self.lock_devices()
            .iter()
            .find(|d| d.id == device_id)
            .cloned()
    }

    /// Devices currently connected.
    pub fn connected_devices(&self) -> Vec<HardwareDevice> {
        self.lock_devices()
            .iter()
            .filter(|d| d.connected)
            .cloned()
            .collect()
    }

    /// Open the scanner's HID stream and start its reader session.
    pub fn connect_scanner(&self, device_id: &str) -> Result<(), HardwareError> {
        let device = self
            .device(device_id)
            .ok_or_else(|| HardwareError::DeviceNotFound(device_id.to_string()))?;
        if device.kind != DeviceKind::Scanner {
            return Err(HardwareError::UnsupportedDeviceType {
                id: device.id,
                kind: device.kind,
            });
        }
        if self.lock_scanners().contains_key(device_id) {
            debug!(device = %device_id, "Scanner already connected");
            return Ok(());
        }

        let (vendor_id, product_id) = match (device.vendor_id, device.product_id) {
            (Some(vid), Some(pid)) => (vid, pid),
            _ => return Err(HardwareError::DeviceNotFound(device_id.to_string())),
        };
        let stream = match self.caps.hid.open(vendor_id, product_id) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(device = %device_id, error = %e, "Scanner open failed");
                self.events.emit(HardwareEvent::ScannerError {
                    device_id: device_id.to_string(),
                    message: e.to_string(),
                });
                return Err(e);
            }
        };
        let session = ScannerSession::start(device_id, stream, self.events.clone());
        self.lock_scanners().insert(device_id.to_string(), session);
        self.mark_connected(device_id, true);

        let connected = self.device(device_id).unwrap_or(device);
        info!(device = %device_id, "Scanner connected");
        self.events
            .emit(HardwareEvent::ScannerConnected(connected));
        Ok(())
    }

    /// Open the printer's serial channel. The channel handle is shared with
    /// the print queue; `connected` flips only after the port reports open.
    pub fn connect_printer(
        &self,
        device_id: &str,
        config: &SerialConfig,
    ) -> Result<PrinterChannel, HardwareError> {
        let device = self
            .device(device_id)
            .ok_or_else(|| HardwareError::DeviceNotFound(device_id.to_string()))?;
        if device.kind != DeviceKind::Printer {
            return Err(HardwareError::UnsupportedDeviceType {
                id: device.id,
                kind: device.kind,
            });
        }
        if let Some(existing) = self.lock_printers().get(device_id) {
            let open = existing.lock().unwrap_or_else(|e| e.into_inner()).is_open();
            if open {
                debug!(device = %device_id, "Printer already connected");
                return Ok(existing.clone());
            }
        }

        let port = device.port.as_deref().unwrap_or(device_id);
        let transport = match self.caps.serial.open(port, config) {
            Ok(transport) => transport,
            Err(e) => {
                warn!(device = %device_id, error = %e, "Printer open failed");
                self.events.emit(HardwareEvent::PrinterError {
                    device_id: device_id.to_string(),
                    message: e.to_string(),
                });
                return Err(e);
            }
        };
        let channel: PrinterChannel = Arc::new(Mutex::new(transport));
        self.lock_printers()
            .insert(device_id.to_string(), channel.clone());
        self.mark_connected(device_id, true);

        let connected = self.device(device_id).unwrap_or(device);
        info!(device = %device_id, "Printer connected");
        self.events
            .emit(HardwareEvent::PrinterConnected(connected));
        Ok(channel)
    }

    /// Stop every scanner session and close every printer channel. Safe to
    /// call repeatedly; the second call is a no-op.
    pub fn disconnect_all(&self) {
        let sessions: Vec<ScannerSession> = {
            let mut scanners = self.lock_scanners();
            scanners.drain().map(|(_, s)| s).collect()
        };
        for mut session in sessions {
            session.stop();
        }

        let channels: Vec<(String, PrinterChannel)> = {
            let mut printers = self.lock_printers();
            printers.drain().collect()
        };
        let had_any = !channels.is_empty();
        for (id, channel) in channels {
            channel.lock().unwrap_or_else(|e| e.into_inner()).close();
            debug!(device = %id, "Printer channel closed");
        }

        for device in self.lock_devices().iter_mut() {
            device.connected = false;
        }
        if had_any {
            info!("All hardware sessions closed");
        }
    }

    fn mark_connected(&self, device_id: &str, connected: bool) {
        if let Some(device) = self
            .lock_devices()
            .iter_mut()
            .find(|d| d.id == device_id)
        {
            device.connected = connected;
        } else {
            warn!(device = %device_id, "Connection state change for untracked device");
        }
    }

    fn lock_devices(&self) -> std::sync::MutexGuard<'_, Vec<HardwareDevice>> {
        self.devices.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_scanners(&self) -> std::sync::MutexGuard<'_, HashMap<String, ScannerSession>> {
        self.scanners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_printers(&self) -> std::sync::MutexGuard<'_, HashMap<String, PrinterChannel>> {
        self.printers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        HidCapability, HidDeviceInfo, HidStream, SerialCapability, UnavailableHid,
        UnavailableSerial,
    };
    use crate::error::TransportError;

    struct QuietStream;

    impl HidStream for QuietStream {
        fn read(&mut self, _buf: &mut [u8], _timeout_ms: u64) -> Result<usize, TransportError> {
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(0)
        }
    }

    struct MockHid {
        devices: Vec<HidDeviceInfo>,
    }

    impl HidCapability for MockHid {
        fn is_available(&self) -> bool {
            true
        }

        fn enumerate(&self) -> Vec<HidDeviceInfo> {
            self.devices.clone()
        }

        fn open(
            &self,
            _vendor_id: u16,
            _product_id: u16,
        ) -> Result<Box<dyn HidStream>, HardwareError> {
            Ok(Box::new(QuietStream))
        }
    }

    struct MockSink {
        open: bool,
    }

    impl ByteTransport for MockSink {
        fn open(&mut self, _config: &SerialConfig) -> Result<(), TransportError> {
            self.open = true;
            Ok(())
        }

        fn write(&mut self, _data: &[u8]) -> Result<(), TransportError> {
            if self.open {
                Ok(())
            } else {
                Err(TransportError::NotOpen {
                    port: "mock".into(),
                })
            }
        }

        fn close(&mut self) {
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn description(&self) -> String {
            "MockSink".into()
        }
    }

    struct MockSerial {
        ports: Vec<SerialPortDetails>,
    }

    impl SerialCapability for MockSerial {
        fn is_available(&self) -> bool {
            true
        }

        fn enumerate(&self) -> Vec<SerialPortDetails> {
            self.ports.clone()
        }

        fn open(
            &self,
            _port: &str,
            _config: &SerialConfig,
        ) -> Result<Box<dyn ByteTransport>, HardwareError> {
            Ok(Box::new(MockSink { open: true }))
        }
    }

    fn test_caps() -> Capabilities {
        Capabilities {
            hid: Box::new(MockHid {
                devices: vec![
                    HidDeviceInfo {
                        vendor_id: 0x05E0,
                        product_id: 0x1200,
                        manufacturer: Some("Zebra".into()),
                        product: Some("LS2208".into()),
                    },
                    // Not in the known table — must be ignored.
                    HidDeviceInfo {
                        vendor_id: 0x046D,
                        product_id: 0xC31C,
                        manufacturer: Some("Logitech".into()),
                        product: Some("Keyboard".into()),
                    },
                ],
            }),
            serial: Box::new(MockSerial {
                ports: vec![
                    SerialPortDetails {
                        port_name: "/dev/ttyUSB0".into(),
                        manufacturer: Some("EPSON".into()),
                        product: Some("TM-T20III".into()),
                    },
                    SerialPortDetails {
                        port_name: "/dev/ttyUSB1".into(),
                        manufacturer: None,
                        product: None,
                    },
                    SerialPortDetails {
                        port_name: "/dev/ttyUSB2".into(),
                        manufacturer: Some("Generic".into()),
                        product: Some("CD-415 Drawer".into()),
                    },
                ],
            }),
        }
    }

    fn registry() -> (DeviceRegistry, tokio::sync::mpsc::UnboundedReceiver<HardwareEvent>) {
        let (bus, rx) = EventBus::new();
        (DeviceRegistry::new(test_caps(), bus), rx)
    }

    #[test]
    fn test_detect_classifies_devices() {
        let (registry, mut rx) = registry();
        let devices = registry.detect();

        assert_eq!(devices.len(), 4);
        let scanner = devices.iter().find(|d| d.kind == DeviceKind::Scanner).unwrap();
        assert_eq!(scanner.id, "hid-05e0:1200");
        assert_eq!(scanner.name, "Symbol LS2208");
        assert!(!scanner.connected);

        let epson = devices.iter().find(|d| d.id == "/dev/ttyUSB0").unwrap();
        assert_eq!(epson.kind, DeviceKind::Printer);
        assert_eq!(epson.name, "TM-T20III");

        let unknown = devices.iter().find(|d| d.id == "/dev/ttyUSB1").unwrap();
        assert_eq!(unknown.kind, DeviceKind::Printer);
        assert_eq!(unknown.name, "Unknown Serial Device");

        let drawer = devices.iter().find(|d| d.id == "/dev/ttyUSB2").unwrap();
        assert_eq!(drawer.kind, DeviceKind::CashDrawer);

        match rx.try_recv().unwrap() {
            HardwareEvent::DevicesDetected(list) => assert_eq!(list.len(), 4),
            other => panic!("expected devices-detected, got {other:?}"),
        }
    }

    #[test]
    fn test_detect_with_unavailable_capabilities_is_empty() {
        let (bus, mut rx) = EventBus::new();
        let registry = DeviceRegistry::new(
            Capabilities {
                hid: Box::new(UnavailableHid),
                serial: Box::new(UnavailableSerial),
            },
            bus,
        );
        let devices = registry.detect();
        assert!(devices.is_empty());
        match rx.try_recv().unwrap() {
            HardwareEvent::DevicesDetected(list) => assert!(list.is_empty()),
            other => panic!("expected devices-detected, got {other:?}"),
        }
    }

    #[test]
    fn test_connect_unknown_device_fails() {
        let (registry, _rx) = registry();
        registry.detect();
        let err = registry.connect_scanner("no-such-device").unwrap_err();
        assert!(matches!(err, HardwareError::DeviceNotFound(_)));
    }

    #[test]
    fn test_connect_wrong_kind_fails() {
        let (registry, _rx) = registry();
        registry.detect();

        // A printer through the scanner path
        let err = registry.connect_scanner("/dev/ttyUSB0").unwrap_err();
        assert!(matches!(
            err,
            HardwareError::UnsupportedDeviceType {
                kind: DeviceKind::Printer,
                ..
            }
        ));

        // A cash drawer through the printer path
        let err = registry
            .connect_printer("/dev/ttyUSB2", &SerialConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            HardwareError::UnsupportedDeviceType {
                kind: DeviceKind::CashDrawer,
                ..
            }
        ));
    }

    #[test]
    fn test_connect_printer_marks_connected_and_emits() {
        let (registry, mut rx) = registry();
        registry.detect();
        let _ = rx.try_recv();

        let channel = registry
            .connect_printer("/dev/ttyUSB0", &SerialConfig::default())
            .unwrap();
        assert!(channel.lock().unwrap().is_open());

        let connected = registry.connected_devices();
        assert_eq!(connected.len(), 1);
        assert_eq!(connected[0].id, "/dev/ttyUSB0");

        match rx.try_recv().unwrap() {
            HardwareEvent::PrinterConnected(device) => {
                assert!(device.connected);
                assert_eq!(device.id, "/dev/ttyUSB0");
            }
            other => panic!("expected printer-connected, got {other:?}"),
        }
    }

    #[test]
    fn test_connect_scanner_marks_connected_and_emits() {
        let (registry, mut rx) = registry();
        registry.detect();
        let _ = rx.try_recv();

        registry.connect_scanner("hid-05e0:1200").unwrap();
        match rx.try_recv().unwrap() {
            HardwareEvent::ScannerConnected(device) => {
                assert!(device.connected);
                assert_eq!(device.kind, DeviceKind::Scanner);
            }
            other => panic!("expected scanner-connected, got {other:?}"),
        }

        // Second connect is a no-op, not an error.
        registry.connect_scanner("hid-05e0:1200").unwrap();
        registry.disconnect_all();
    }

    #[test]
    fn test_disconnect_all_is_idempotent() {
        let (registry, _rx) = registry();
        registry.detect();
        registry.connect_scanner("hid-05e0:1200").unwrap();
        let channel = registry
            .connect_printer("/dev/ttyUSB0", &SerialConfig::default())
            .unwrap();

        registry.disconnect_all();
        assert!(registry.connected_devices().is_empty());
        assert!(!channel.lock().unwrap().is_open());

        // Second call must be safe.
        registry.disconnect_all();
        assert!(registry.connected_devices().is_empty());
    }

    struct FailingSerial {
        ports: Vec<SerialPortDetails>,
    }

    impl SerialCapability for FailingSerial {
        fn is_available(&self) -> bool {
            true
        }

        fn enumerate(&self) -> Vec<SerialPortDetails> {
            self.ports.clone()
        }

        fn open(
            &self,
            port: &str,
            _config: &SerialConfig,
        ) -> Result<Box<dyn ByteTransport>, HardwareError> {
            Err(HardwareError::Transport(
                crate::error::TransportError::Open {
                    port: port.to_string(),
                    reason: "port busy".into(),
                },
            ))
        }
    }

    #[test]
    fn test_printer_open_failure_emits_printer_error() {
        let (bus, mut rx) = EventBus::new();
        let registry = DeviceRegistry::new(
            Capabilities {
                hid: Box::new(UnavailableHid),
                serial: Box::new(FailingSerial {
                    ports: vec![SerialPortDetails {
                        port_name: "COM3".into(),
                        manufacturer: Some("EPSON".into()),
                        product: Some("TM-T20".into()),
                    }],
                }),
            },
            bus,
        );
        registry.detect();
        let _ = rx.try_recv();

        let err = registry
            .connect_printer("COM3", &SerialConfig::default())
            .unwrap_err();
        assert!(matches!(err, HardwareError::Transport(_)));

        match rx.try_recv().unwrap() {
            HardwareEvent::PrinterError { device_id, message } => {
                assert_eq!(device_id, "COM3");
                assert!(message.contains("port busy"));
            }
            other => panic!("expected printer-error, got {other:?}"),
        }
        // The failed device never reads as connected.
        assert!(registry.connected_devices().is_empty());
    }

    #[test]
    fn test_redetect_keeps_live_sessions_connected() {
        let (registry, _rx) = registry();
        registry.detect();
        registry
            .connect_printer("/dev/ttyUSB0", &SerialConfig::default())
            .unwrap();
        registry.connect_scanner("hid-05e0:1200").unwrap();

        // A fresh pass replaces the set but keeps live sessions marked.
        let devices = registry.detect();
        let epson = devices.iter().find(|d| d.id == "/dev/ttyUSB0").unwrap();
        assert!(epson.connected);
        let scanner = devices.iter().find(|d| d.id == "hid-05e0:1200").unwrap();
        assert!(scanner.connected);

        registry.disconnect_all();
    }
}
