//! Barcode decoding and validation for scanner byte streams.
//!
//! Scanners deliver raw byte buffers (often framed with STX/ETX or
//! terminated with CR/LF). This module turns one complete buffer into a
//! classified, validated [`ScanResult`]. Invalid barcodes are still
//! produced with `is_valid = false` — whether to accept them is the
//! caller's business decision, not ours.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum cleaned-up length for a buffer to count as a scan at all.
const MIN_BARCODE_LEN: usize = 8;

/// Recognized barcode symbologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarcodeFormat {
    #[serde(rename = "EAN-13")]
    Ean13,
    #[serde(rename = "UPC-A")]
    UpcA,
    #[serde(rename = "Code-128")]
    Code128,
    Unknown,
}

/// One decoded scan event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub barcode: String,
    pub format: BarcodeFormat,
    pub is_valid: bool,
    pub timestamp: DateTime<Utc>,
}

/// Decode a raw scanner buffer into a scan record.
///
/// Control bytes (`0x00–0x1F`, `0x7F`) and non-ASCII bytes are stripped,
/// surrounding whitespace trimmed. Buffers shorter than 8 characters after
/// cleanup produce no record.
pub fn decode(raw: &[u8]) -> Option<ScanResult> {
    let cleaned: String = raw
        .iter()
        .filter(|&&b| (0x20..0x7F).contains(&b))
        .map(|&b| b as char)
        .collect();
    let barcode = cleaned.trim().to_string();

    if barcode.len() < MIN_BARCODE_LEN {
        return None;
    }

    let format = classify(&barcode);
    let is_valid = match format {
        BarcodeFormat::Ean13 => validate_ean13(&barcode),
        // Other formats carry no checksum we can verify here; the length
        // gate above is the whole structural check.
        _ => true,
    };

    Some(ScanResult {
        barcode,
        format,
        is_valid,
        timestamp: Utc::now(),
    })
}

/// Classify by length first, content second — a 12-digit code is UPC-A even
/// when it would also match the Code-128 character class.
fn classify(barcode: &str) -> BarcodeFormat {
    let all_digits = barcode.chars().all(|c| c.is_ascii_digit());
    if barcode.len() == 13 && all_digits {
        return BarcodeFormat::Ean13;
    }
    if barcode.len() == 12 && all_digits {
        return BarcodeFormat::UpcA;
    }
    if barcode.chars().all(is_code128_char) {
        return BarcodeFormat::Code128;
    }
    BarcodeFormat::Unknown
}

fn is_code128_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '$' | '/' | '+' | '%' | ' ')
}

/// EAN-13 weighted checksum: digits at even indices weigh 1, odd indices
/// weigh 3; the check digit is `(10 - sum mod 10) mod 10`.
pub fn validate_ean13(barcode: &str) -> bool {
    if barcode.len() != 13 || !barcode.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = barcode.chars().filter_map(|c| c.to_digit(10)).collect();
    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { *d * 3 })
        .sum();
    let check = (10 - (sum % 10)) % 10;
    check == digits[12]
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ean13_checksum() {
        assert!(validate_ean13("4006381333931"));
        assert!(validate_ean13("5901234123457"));
    }

    #[test]
    fn test_invalid_ean13_checksum() {
        assert!(!validate_ean13("4006381333932"));
        assert!(!validate_ean13("5901234123450"));
    }

    #[test]
    fn test_ean13_rejects_wrong_length_or_alpha() {
        assert!(!validate_ean13("400638133393"));
        assert!(!validate_ean13("40063813339311"));
        assert!(!validate_ean13("400638133393A"));
    }

    #[test]
    fn test_decode_valid_ean13() {
        let result = decode(b"4006381333931\r\n").unwrap();
        assert_eq!(result.barcode, "4006381333931");
        assert_eq!(result.format, BarcodeFormat::Ean13);
        assert!(result.is_valid);
    }

    #[test]
    fn test_decode_invalid_ean13_still_emitted() {
        let result = decode(b"4006381333932").unwrap();
        assert_eq!(result.format, BarcodeFormat::Ean13);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_decode_strips_framing_control_bytes() {
        // STX ... ETX framing — 12 digits left, so UPC-A by the length rule.
        let result = decode(b"\x02622400012345\x03").unwrap();
        assert_eq!(result.barcode, "622400012345");
        assert_eq!(result.format, BarcodeFormat::UpcA);
        assert!(result.is_valid);
    }

    #[test]
    fn test_decode_rejects_short_buffers() {
        assert!(decode(b"1234567").is_none());
        assert!(decode(b"\x02\x0312345\x00\x00").is_none());
        assert!(decode(b"   1234567   ").is_none());
        assert!(decode(b"").is_none());
    }

    #[test]
    fn test_decode_eight_chars_is_enough() {
        let result = decode(b"ABCD1234").unwrap();
        assert_eq!(result.format, BarcodeFormat::Code128);
        assert!(result.is_valid);
    }

    #[test]
    fn test_classify_code128_charset() {
        assert_eq!(classify("ABC-123.45/X+Y%"), BarcodeFormat::Code128);
        assert_eq!(classify("lowercase99"), BarcodeFormat::Code128);
        assert_eq!(classify("CODE 128 TEXT"), BarcodeFormat::Code128);
    }

    #[test]
    fn test_classify_unknown_on_odd_symbols() {
        assert_eq!(classify("ABC_12345"), BarcodeFormat::Unknown);
        assert_eq!(classify("12345678#"), BarcodeFormat::Unknown);
    }

    #[test]
    fn test_classification_is_length_exact() {
        // 14 digits: not EAN-13, falls through to Code-128 charset.
        assert_eq!(classify("40063813339311"), BarcodeFormat::Code128);
        // 13 digits with a letter: not EAN-13.
        assert_eq!(classify("400638133393A"), BarcodeFormat::Code128);
    }
}
