//! Event channel between the peripheral core and the consuming application.
//!
//! The original design pushed device state changes through a shared global
//! emitter; here the host injects a channel at construction time and every
//! component reports through an [`EventBus`] handle. The host side holds the
//! receiver and drains events on its own schedule — a slow or absent
//! consumer never blocks hardware work (unbounded channel, send-and-forget).

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::barcode::ScanResult;
use crate::print::PrintJob;
use crate::registry::HardwareDevice;

/// Events emitted to the consuming application.
///
/// The serialized form uses the kebab-case event names the frontend listens
/// for (`devices-detected`, `barcode-scanned`, ...).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum HardwareEvent {
    DevicesDetected(Vec<HardwareDevice>),
    ScannerConnected(HardwareDevice),
    ScannerError { device_id: String, message: String },
    BarcodeScanned(ScanResult),
    PrinterConnected(HardwareDevice),
    PrinterError { device_id: String, message: String },
    JobCompleted(PrintJob),
    JobFailed { job: PrintJob, error: String },
}

/// Cloneable sender half handed to every component.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<HardwareEvent>,
}

impl EventBus {
    /// Create a bus and the receiver the host application drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HardwareEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event. Dropping the receiver does not fail hardware work.
    pub fn emit(&self, event: HardwareEvent) {
        if self.tx.send(event).is_err() {
            warn!("Event receiver dropped — hardware event discarded");
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DeviceKind;

    fn sample_device() -> HardwareDevice {
        HardwareDevice {
            id: "hid-05e0:1200".into(),
            kind: DeviceKind::Scanner,
            name: "Zebra/Symbol LS2208".into(),
            manufacturer: "Zebra".into(),
            connected: false,
            port: None,
            vendor_id: Some(0x05E0),
            product_id: Some(0x1200),
        }
    }

    #[test]
    fn test_event_names_are_kebab_case() {
        let event = HardwareEvent::DevicesDetected(vec![sample_device()]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "devices-detected");

        let event = HardwareEvent::ScannerError {
            device_id: "hid-05e0:1200".into(),
            message: "read failed".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "scanner-error");
        assert_eq!(json["payload"]["device_id"], "hid-05e0:1200");
    }

    #[test]
    fn test_emit_delivers_to_receiver() {
        let (bus, mut rx) = EventBus::new();
        bus.emit(HardwareEvent::PrinterConnected(sample_device()));
        let received = rx.try_recv().unwrap();
        assert!(matches!(received, HardwareEvent::PrinterConnected(_)));
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (bus, rx) = EventBus::new();
        drop(rx);
        // Must not panic or error — the warning is the whole story.
        bus.emit(HardwareEvent::ScannerConnected(sample_device()));
    }
}
