//! Error taxonomy for the peripheral core.
//!
//! Every failure in this crate degrades to "feature unavailable" — nothing
//! here is allowed to take the terminal down. Barcode validation failure is
//! deliberately NOT an error: it is surfaced as `is_valid = false` on the
//! scan record and the accept/reject decision stays with the caller.

use thiserror::Error;

use crate::registry::DeviceKind;

/// Transport-level failure on a serial channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The port could not be opened (busy, absent, or driver error).
    #[error("failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    /// A write to an open port failed at the OS level.
    #[error("write to {port} failed: {reason}")]
    Write { port: String, reason: String },

    /// A read from an open device stream failed at the OS level.
    #[error("read from {device} failed: {reason}")]
    Read { device: String, reason: String },

    /// The channel was used before `open` or after `close`.
    #[error("port {port} is not open")]
    NotOpen { port: String },
}

/// Top-level error for registry and queue operations.
#[derive(Debug, Clone, Error)]
pub enum HardwareError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The device exists but its kind cannot be connected through the
    /// requested path (e.g. a cash drawer through the scanner path).
    #[error("device {id} is a {kind} and cannot be connected directly")]
    UnsupportedDeviceType { id: String, kind: DeviceKind },

    /// The optional host driver for this device class is missing. Detection
    /// degrades to an empty list; explicit opens report this.
    #[error("{0} capability is unavailable on this host")]
    CapabilityUnavailable(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Open {
            port: "COM7".into(),
            reason: "busy".into(),
        };
        assert_eq!(err.to_string(), "failed to open COM7: busy");

        let err = TransportError::NotOpen {
            port: "/dev/ttyUSB0".into(),
        };
        assert_eq!(err.to_string(), "port /dev/ttyUSB0 is not open");
    }

    #[test]
    fn test_hardware_error_wraps_transport() {
        let inner = TransportError::Write {
            port: "COM3".into(),
            reason: "pipe closed".into(),
        };
        let err: HardwareError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
    }

    #[test]
    fn test_unsupported_device_type_names_kind() {
        let err = HardwareError::UnsupportedDeviceType {
            id: "COM9".into(),
            kind: DeviceKind::CashDrawer,
        };
        assert!(err.to_string().contains("cash-drawer"));
    }
}
