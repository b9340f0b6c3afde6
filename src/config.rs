//! Configuration shapes for serial transports and printers.
//!
//! These mirror the terminal settings the host application syncs down:
//! serial framing for the port itself, and layout/encoding choices for the
//! ESC/POS encoder. Everything is serde-friendly so hosts can persist the
//! shapes however they like.

use serde::{Deserialize, Serialize};

use crate::escpos::{CharacterEncoding, PaperWidth};

/// Serial port parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Serial framing configuration for a peripheral port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    /// Write/read timeout for the underlying port handle.
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            timeout_ms: 1000,
        }
    }
}

/// Printer-level configuration applied to every job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterConfig {
    pub paper_width: PaperWidth,
    pub encoding: CharacterEncoding,
    /// Pause between jobs so the printer's buffer can drain.
    pub inter_job_delay_ms: u64,
    /// Append the drawer kick pulse after receipts.
    pub open_cash_drawer: bool,
    pub serial: SerialConfig,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            paper_width: PaperWidth::Mm80,
            encoding: CharacterEncoding::Utf8,
            inter_job_delay_ms: 100,
            open_cash_drawer: false,
            serial: SerialConfig::default(),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
