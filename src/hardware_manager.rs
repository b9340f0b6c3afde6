//! Hardware manager — peripheral orchestrator for POS.
//!
//! The single facade the host application talks to. Owns the device
//! registry and the print queue, and wires a connected printer's channel
//! into the queue so jobs start flowing the moment the port opens.
//!
//! Responsibilities:
//! - Detection passes and connect/disconnect orchestration
//! - Routing `connect(device_id)` to the right session path by device kind
//! - Print job intake (`enqueue` / `clear_queue`)
//! - Graceful shutdown: the host calls [`HardwareManager::shutdown`] from
//!   its own teardown path; there are no implicit process-exit hooks.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::capability::Capabilities;
use crate::config::PrinterConfig;
use crate::error::HardwareError;
use crate::events::{EventBus, HardwareEvent};
use crate::print::{JobPriority, PrintJob, PrintJobQueue, PrinterTarget};
use crate::receipt_renderer::PrintPayload;
use crate::registry::{DeviceKind, DeviceRegistry, HardwareDevice};

pub struct HardwareManager {
    registry: DeviceRegistry,
    queue: PrintJobQueue,
    config: PrinterConfig,
}

impl HardwareManager {
    /// Build a manager with its own event channel. Returns the receiver the
    /// host drains for the `devices-detected` / `barcode-scanned` /
    /// `job-completed` family of events.
    pub fn new(
        caps: Capabilities,
        config: PrinterConfig,
    ) -> (Self, UnboundedReceiver<HardwareEvent>) {
        let (bus, rx) = EventBus::new();
        (Self::with_bus(caps, config, bus), rx)
    }

    /// Build against an injected event bus (shared with other subsystems).
    pub fn with_bus(caps: Capabilities, config: PrinterConfig, bus: EventBus) -> Self {
        Self {
            registry: DeviceRegistry::new(caps, bus.clone()),
            queue: PrintJobQueue::new(bus),
            config,
        }
    }

    /// Run a detection pass. See [`DeviceRegistry::detect`].
    pub fn detect(&self) -> Vec<HardwareDevice> {
        self.registry.detect()
    }

    /// Connect a detected device, routed by its kind. Cash drawers and
    /// displays hang off the printer connection and cannot be connected
    /// directly.
    pub fn connect(&self, device_id: &str) -> Result<(), HardwareError> {
        let device = self
            .registry
            .device(device_id)
            .ok_or_else(|| HardwareError::DeviceNotFound(device_id.to_string()))?;

        match device.kind {
            DeviceKind::Scanner => self.registry.connect_scanner(device_id),
            DeviceKind::Printer => {
                let channel = self
                    .registry
                    .connect_printer(device_id, &self.config.serial)?;
                self.queue.bind_printer(PrinterTarget {
                    device_id: device_id.to_string(),
                    channel,
                    config: self.config.clone(),
                });
                Ok(())
            }
            kind => Err(HardwareError::UnsupportedDeviceType {
                id: device.id,
                kind,
            }),
        }
    }

    /// Close every open session. Pending print jobs stay queued and resume
    /// when a printer reconnects. Idempotent.
    pub fn disconnect_all(&self) {
        self.queue.unbind_printer();
        self.registry.disconnect_all();
    }

    /// Teardown entry point for the host application.
    pub fn shutdown(&self) {
        info!("Hardware manager: shutting down all peripherals");
        self.disconnect_all();
    }

    /// Queue a document for printing; returns the job id.
    pub fn enqueue(&self, payload: PrintPayload, priority: JobPriority) -> String {
        self.queue.enqueue(payload, priority)
    }

    /// Drop all pending print jobs; an in-flight job finishes.
    pub fn clear_queue(&self) -> usize {
        self.queue.clear_queue()
    }

    pub fn connected_devices(&self) -> Vec<HardwareDevice> {
        self.registry.connected_devices()
    }

    pub fn pending_jobs(&self) -> Vec<PrintJob> {
        self.queue.pending_jobs()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
