//! POS peripheral integration core.
//!
//! Discovery of barcode scanners and receipt printers, decoding and
//! validation of scanned barcodes, and ESC/POS encoding of receipt /
//! report / test print jobs delivered over a serial transport with
//! ordered, single-writer queuing.
//!
//! The host application constructs a [`HardwareManager`] against the host
//! [`Capabilities`] and drains the returned event channel:
//!
//! ```rust,ignore
//! use pos_periph::{Capabilities, HardwareManager, PrinterConfig};
//!
//! let (manager, mut events) = HardwareManager::new(
//!     Capabilities::detect_host(),
//!     PrinterConfig::default(),
//! );
//! manager.detect();
//! // ... connect devices, enqueue jobs, drain `events` ...
//! manager.shutdown();
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod barcode;
mod capability;
mod config;
mod error;
mod escpos;
mod events;
mod hardware_manager;
mod print;
mod receipt_renderer;
mod registry;
mod scanner;
mod transport;

pub use barcode::{decode as decode_barcode, validate_ean13, BarcodeFormat, ScanResult};
pub use capability::{
    Capabilities, HidCapability, HidDeviceInfo, HidStream, SerialCapability, SerialPortDetails,
};
pub use config::{Parity, PrinterConfig, SerialConfig};
pub use error::{HardwareError, TransportError};
pub use escpos::{CharacterEncoding, EscPosBuilder, PaperWidth, QrEcLevel};
pub use events::{EventBus, HardwareEvent};
pub use hardware_manager::HardwareManager;
pub use print::{JobKind, JobPriority, JobStatus, PrintJob, PrintJobQueue, PrinterTarget};
pub use receipt_renderer::{
    render, PaymentLine, PrintPayload, ReceiptDoc, ReceiptItem, ReportDoc, ReportLine,
    TestPageDoc, TotalsLine,
};
pub use registry::{DeviceKind, DeviceRegistry, HardwareDevice};
pub use scanner::ScannerSession;
pub use transport::{ByteTransport, SerialChannel, UnavailableTransport};

/// Initialize tracing for hosts and tests: fmt subscriber with an
/// `RUST_LOG`-style env filter, defaulting to `info`. Safe to call once;
/// later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
