//! ESC/POS binary command builder for thermal receipt printers.
//!
//! Generates raw byte sequences for serial thermal printers. Supports text
//! formatting, alignment, fixed-column layout, Arabic character encoding
//! (CP864 / CP1256 / UTF-8 mode), QR code blocks, drawer kick, and paper
//! cutting. The builder is pure: it never touches a device, it only
//! assembles bytes.
//!
//! Glyph shaping and right-to-left layout are the printer firmware's job
//! once the code page command has been issued; this module only embeds the
//! correct byte sequence for each text field.

use serde::{Deserialize, Serialize};

// ESC/POS command bytes
const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const FS: u8 = 0x1C;
const LF: u8 = 0x0A;

/// Paper width in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperWidth {
    Mm58,
    Mm80,
}

impl PaperWidth {
    pub fn chars(self) -> usize {
        match self {
            PaperWidth::Mm58 => 32,
            PaperWidth::Mm80 => 48,
        }
    }

    pub fn from_mm(mm: i32) -> Self {
        if mm <= 58 {
            PaperWidth::Mm58
        } else {
            PaperWidth::Mm80
        }
    }
}

/// Character encoding used for text fields.
///
/// `Cp864` and `Cp1256` select the printer-resident code page and map text
/// through the in-crate tables; `Utf8` switches the printer into UTF-8
/// encode mode and passes text bytes through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterEncoding {
    Cp864,
    Cp1256,
    Utf8,
}

/// QR error-correction level (`GS ( k` function 69 operand).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrEcLevel {
    Low,
    Medium,
    Quartile,
    High,
}

impl QrEcLevel {
    fn operand(self) -> u8 {
        match self {
            QrEcLevel::Low => 48,
            QrEcLevel::Medium => 49,
            QrEcLevel::Quartile => 50,
            QrEcLevel::High => 51,
        }
    }
}

/// Builder for generating ESC/POS binary command buffers.
///
/// ```rust,ignore
/// let mut b = EscPosBuilder::new()
///     .with_paper(PaperWidth::Mm80)
///     .with_encoding(CharacterEncoding::Cp1256);
/// b.init()
///     .select_encoding()
///     .center()
///     .bold(true).text("RECEIPT").lf().bold(false)
///     .left()
///     .column_row(&[("2x Falafel", 36), ("12.00", 12)])
///     .feed(3)
///     .cut();
/// let data = b.build();
/// ```
pub struct EscPosBuilder {
    buffer: Vec<u8>,
    paper: PaperWidth,
    encoding: CharacterEncoding,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(512),
            paper: PaperWidth::Mm80,
            encoding: CharacterEncoding::Utf8,
        }
    }

    pub fn with_paper(mut self, paper: PaperWidth) -> Self {
        self.paper = paper;
        self
    }

    pub fn with_encoding(mut self, encoding: CharacterEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn columns(&self) -> usize {
        self.paper.chars()
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// ESC @ — Initialize printer, reset to defaults.
    pub fn init(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x40]);
        self
    }

    /// ESC t n — Select character code page.
    pub fn code_page(&mut self, page: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x74, page]);
        self
    }

    /// Emit the charset command matching the configured encoding.
    ///
    /// CP864 is code page 37, WPC1256 is code page 50 on the standard
    /// Epson table; UTF-8 uses `FS ( C` fn 48 m 2 (select encode method).
    pub fn select_encoding(&mut self) -> &mut Self {
        match self.encoding {
            CharacterEncoding::Cp864 => {
                self.code_page(37);
            }
            CharacterEncoding::Cp1256 => {
                self.code_page(50);
            }
            CharacterEncoding::Utf8 => {
                self.buffer
                    .extend_from_slice(&[FS, 0x28, 0x43, 0x02, 0x00, 0x30, 0x02]);
            }
        }
        self
    }

    // -----------------------------------------------------------------------
    // Text formatting
    // -----------------------------------------------------------------------

    /// ESC E n — Bold on/off.
    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.buffer
            .extend_from_slice(&[ESC, 0x45, if on { 1 } else { 0 }]);
        self
    }

    /// ESC - n — Underline (0=off, 1=thin, 2=thick).
    pub fn underline(&mut self, mode: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x2D, mode]);
        self
    }

    /// GS ! n — Set text size (width × height multiplier, 1–8 each).
    pub fn text_size(&mut self, width: u8, height: u8) -> &mut Self {
        let w = width.clamp(1, 8) - 1;
        let h = height.clamp(1, 8) - 1;
        self.buffer.extend_from_slice(&[GS, 0x21, (w << 4) | h]);
        self
    }

    /// Reset text size to 1×1.
    pub fn normal_size(&mut self) -> &mut Self {
        self.text_size(1, 1)
    }

    /// Double-width text (2×1).
    pub fn double_width(&mut self) -> &mut Self {
        self.text_size(2, 1)
    }

    /// Double-height text (1×2).
    pub fn double_height(&mut self) -> &mut Self {
        self.text_size(1, 2)
    }

    // -----------------------------------------------------------------------
    // Alignment
    // -----------------------------------------------------------------------

    /// ESC a 0 — Left-align.
    pub fn left(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, 0]);
        self
    }

    /// ESC a 1 — Centre-align.
    pub fn center(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, 1]);
        self
    }

    /// ESC a 2 — Right-align.
    pub fn right(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, 2]);
        self
    }

    // -----------------------------------------------------------------------
    // Text output
    // -----------------------------------------------------------------------

    /// Append text encoded per the configured character encoding.
    pub fn text(&mut self, s: &str) -> &mut Self {
        match self.encoding {
            CharacterEncoding::Utf8 => self.buffer.extend_from_slice(s.as_bytes()),
            CharacterEncoding::Cp1256 => self.buffer.extend(encode_cp1256(s)),
            CharacterEncoding::Cp864 => self.buffer.extend(encode_cp864(s)),
        }
        self
    }

    /// Append raw bytes (e.g. pre-encoded text).
    pub fn raw(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Append a line-feed.
    pub fn lf(&mut self) -> &mut Self {
        self.buffer.push(LF);
        self
    }

    /// A full-width row of a repeated character.
    pub fn rule(&mut self, ch: char) -> &mut Self {
        let row: String = std::iter::repeat(ch).take(self.paper.chars()).collect();
        self.text(&row);
        self.lf()
    }

    /// Dashed horizontal separator, matching paper width.
    pub fn separator(&mut self) -> &mut Self {
        self.rule('-')
    }

    /// Print a line with left-aligned label and right-aligned value.
    pub fn line_pair(&mut self, label: &str, value: &str) -> &mut Self {
        let width = self.paper.chars();
        let gap = width.saturating_sub(label.chars().count() + value.chars().count());
        self.text(label);
        for _ in 0..gap {
            self.buffer.push(b' ');
        }
        self.text(value);
        self.lf()
    }

    /// Fixed-column row: each field is truncated with a trailing ellipsis if
    /// it overflows its width, then right-padded to exactly its width. The
    /// row as a whole is clamped to the paper width, so the printed line
    /// never exceeds `columns()` characters.
    pub fn column_row(&mut self, cells: &[(&str, usize)]) -> &mut Self {
        let columns = self.paper.chars();
        let mut row = String::new();
        for (text, width) in cells {
            row.push_str(&fit_column(text, *width));
        }
        if row.chars().count() > columns {
            row = row.chars().take(columns).collect();
        }
        self.text(&row);
        self.lf()
    }

    // -----------------------------------------------------------------------
    // QR code
    // -----------------------------------------------------------------------

    /// QR code block: model, module size, error correction, data store and
    /// print sub-commands of `GS ( k`, in that fixed order.
    pub fn qr(&mut self, data: &str, module_size: u8, ec: QrEcLevel) -> &mut Self {
        // Function 65: select model 2.
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]);
        // Function 67: module size in dots (1–16).
        self.buffer.extend_from_slice(&[
            GS,
            0x28,
            0x6B,
            0x03,
            0x00,
            0x31,
            0x43,
            module_size.clamp(1, 16),
        ]);
        // Function 69: error-correction level.
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, ec.operand()]);
        // Function 80: store data. pL/pH cover the 3 function bytes + data.
        let len = data.len() + 3;
        self.buffer.extend_from_slice(&[
            GS,
            0x28,
            0x6B,
            (len & 0xFF) as u8,
            (len >> 8) as u8,
            0x31,
            0x50,
            0x30,
        ]);
        self.buffer.extend_from_slice(data.as_bytes());
        // Function 81: print the stored symbol.
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);
        self
    }

    // -----------------------------------------------------------------------
    // Feed / cut / drawer
    // -----------------------------------------------------------------------

    /// ESC d n — Feed n lines.
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x64, lines]);
        self
    }

    /// GS V A 16 — Partial cut with 16-dot feed.
    pub fn cut(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[GS, 0x56, 0x41, 0x10]);
        self
    }

    /// ESC p m t1 t2 — Kick cash drawer on pin 2 (50ms on / 500ms off).
    pub fn open_drawer(&mut self) -> &mut Self {
        self.buffer
            .extend_from_slice(&[ESC, 0x70, 0x00, 0x19, 0xFA]);
        self
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// Consume the builder and return the binary ESC/POS payload.
    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate/pad one cell to exactly `width` characters.
fn fit_column(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let len = text.chars().count();
    if len <= width {
        let mut cell = text.to_string();
        cell.extend(std::iter::repeat(' ').take(width - len));
        return cell;
    }
    if width > 3 {
        let mut cell: String = text.chars().take(width - 3).collect();
        cell.push_str("...");
        return cell;
    }
    text.chars().take(width).collect()
}

// ---------------------------------------------------------------------------
// CP1256 (Windows Arabic) character encoding
// ---------------------------------------------------------------------------

/// Encode a string to CP1256 bytes. ASCII passes through; Arabic letters,
/// harakat and punctuation map to their CP1256 byte values. Unknown
/// characters are replaced with `?` (0x3F).
fn encode_cp1256(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let code = ch as u32;
        if code < 0x80 {
            bytes.push(code as u8);
            continue;
        }
        bytes.push(arabic_to_cp1256(ch).unwrap_or(b'?'));
    }
    bytes
}

/// Map a Unicode character to its CP1256 byte value.
fn arabic_to_cp1256(ch: char) -> Option<u8> {
    match ch {
        // Punctuation
        '\u{060C}' => Some(0xA1), // ،
        '\u{061B}' => Some(0xBA), // ؛
        '\u{061F}' => Some(0xBF), // ؟
        '\u{20AC}' => Some(0x80), // €
        '\u{2026}' => Some(0x85), // …
        // Letters
        '\u{0621}' => Some(0xC1), // ء
        '\u{0622}' => Some(0xC2), // آ
        '\u{0623}' => Some(0xC3), // أ
        '\u{0624}' => Some(0xC4), // ؤ
        '\u{0625}' => Some(0xC5), // إ
        '\u{0626}' => Some(0xC6), // ئ
        '\u{0627}' => Some(0xC7), // ا
        '\u{0628}' => Some(0xC8), // ب
        '\u{0629}' => Some(0xC9), // ة
        '\u{062A}' => Some(0xCA), // ت
        '\u{062B}' => Some(0xCB), // ث
        '\u{062C}' => Some(0xCC), // ج
        '\u{062D}' => Some(0xCD), // ح
        '\u{062E}' => Some(0xCE), // خ
        '\u{062F}' => Some(0xCF), // د
        '\u{0630}' => Some(0xD0), // ذ
        '\u{0631}' => Some(0xD1), // ر
        '\u{0632}' => Some(0xD2), // ز
        '\u{0633}' => Some(0xD3), // س
        '\u{0634}' => Some(0xD4), // ش
        '\u{0635}' => Some(0xD5), // ص
        '\u{0636}' => Some(0xD6), // ض
        '\u{0637}' => Some(0xD8), // ط
        '\u{0638}' => Some(0xD9), // ظ
        '\u{0639}' => Some(0xDA), // ع
        '\u{063A}' => Some(0xDB), // غ
        '\u{0640}' => Some(0xDC), // ـ (tatweel)
        '\u{0641}' => Some(0xDD), // ف
        '\u{0642}' => Some(0xDE), // ق
        '\u{0643}' => Some(0xDF), // ك
        '\u{0644}' => Some(0xE1), // ل
        '\u{0645}' => Some(0xE3), // م
        '\u{0646}' => Some(0xE4), // ن
        '\u{0647}' => Some(0xE5), // ه
        '\u{0648}' => Some(0xE6), // و
        '\u{0649}' => Some(0xEC), // ى
        '\u{064A}' => Some(0xED), // ي
        // Harakat
        '\u{064B}' => Some(0xF0), // ً
        '\u{064C}' => Some(0xF1), // ٌ
        '\u{064D}' => Some(0xF2), // ٍ
        '\u{064E}' => Some(0xF3), // َ
        '\u{064F}' => Some(0xF5), // ُ
        '\u{0650}' => Some(0xF6), // ِ
        '\u{0651}' => Some(0xF8), // ّ
        '\u{0652}' => Some(0xFA), // ْ
        // Persian/Urdu extensions present in CP1256
        '\u{067E}' => Some(0x81), // پ
        '\u{0686}' => Some(0x8D), // چ
        '\u{0698}' => Some(0x8E), // ژ
        '\u{06AF}' => Some(0x90), // گ
        '\u{06A9}' => Some(0x98), // ک
        '\u{06D2}' => Some(0xFF), // ے
        // Arabic-Indic digits have no CP1256 slot — approximate with ASCII
        '\u{0660}'..='\u{0669}' => Some(b'0' + (ch as u32 - 0x0660) as u8),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// CP864 (DOS Arabic) character encoding
// ---------------------------------------------------------------------------

/// Encode a string to CP864 bytes. CP864 stores presentation forms, so each
/// base Arabic letter maps to its isolated-form byte; the lam-alef pairs
/// collapse to their ligature bytes. Unknown characters become `?`.
fn encode_cp864(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        let code = ch as u32;
        if code < 0x80 {
            bytes.push(code as u8);
            continue;
        }
        // Lam-alef ligatures
        if ch == '\u{0644}' {
            match chars.peek() {
                Some('\u{0627}') => {
                    chars.next();
                    bytes.push(0x9D); // ﻻ
                    continue;
                }
                Some('\u{0623}') => {
                    chars.next();
                    bytes.push(0x99); // ﻷ
                    continue;
                }
                Some('\u{0622}') => {
                    chars.next();
                    bytes.push(0xF9); // ﻵ
                    continue;
                }
                _ => {}
            }
        }
        bytes.push(arabic_to_cp864(ch).unwrap_or(b'?'));
    }
    bytes
}

/// Map a Unicode character to its CP864 byte (isolated presentation form).
fn arabic_to_cp864(ch: char) -> Option<u8> {
    match ch {
        // Punctuation and digits
        '\u{060C}' => Some(0xAC), // ،
        '\u{061B}' => Some(0xBB), // ؛
        '\u{061F}' => Some(0xBF), // ؟
        '\u{066A}' => Some(0x25), // ٪ shares the ASCII percent slot
        '\u{0660}'..='\u{0669}' => Some(0xB0 + (ch as u32 - 0x0660) as u8),
        // Letters (isolated forms)
        '\u{0621}' => Some(0xC1), // ء
        '\u{0622}' => Some(0xC2), // آ
        '\u{0623}' => Some(0xC3), // أ
        '\u{0624}' => Some(0xC4), // ؤ
        '\u{0625}' => Some(0xC7), // إ → ا (no hamza-below form in CP864)
        '\u{0626}' => Some(0xC6), // ئ
        '\u{0627}' => Some(0xC7), // ا
        '\u{0628}' => Some(0xA9), // ب
        '\u{0629}' => Some(0xC9), // ة
        '\u{062A}' => Some(0xAA), // ت
        '\u{062B}' => Some(0xAB), // ث
        '\u{062C}' => Some(0xAD), // ج
        '\u{062D}' => Some(0xAE), // ح
        '\u{062E}' => Some(0xAF), // خ
        '\u{062F}' => Some(0xCF), // د
        '\u{0630}' => Some(0xD0), // ذ
        '\u{0631}' => Some(0xD1), // ر
        '\u{0632}' => Some(0xD2), // ز
        '\u{0633}' => Some(0xBC), // س
        '\u{0634}' => Some(0xBD), // ش
        '\u{0635}' => Some(0xBE), // ص
        '\u{0636}' => Some(0xEB), // ض
        '\u{0637}' => Some(0xD7), // ط
        '\u{0638}' => Some(0xD8), // ظ
        '\u{0639}' => Some(0xDF), // ع
        '\u{063A}' => Some(0xEE), // غ
        '\u{0640}' => Some(0xE0), // ـ (tatweel)
        '\u{0641}' => Some(0xBA), // ف
        '\u{0642}' => Some(0xF8), // ق
        '\u{0643}' => Some(0xFC), // ك
        '\u{0644}' => Some(0xFB), // ل
        '\u{0645}' => Some(0xEF), // م
        '\u{0646}' => Some(0xF2), // ن
        '\u{0647}' => Some(0xF3), // ه
        '\u{0648}' => Some(0xE8), // و
        '\u{0649}' => Some(0xE9), // ى
        '\u{064A}' => Some(0xFD), // ي
        '\u{0651}' => Some(0xF1), // ّ (shadda)
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_command() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.init();
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x40]);
    }

    #[test]
    fn test_bold_on_off() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.bold(true).text("HI").bold(false);
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x45, 1, b'H', b'I', 0x1B, 0x45, 0]);
    }

    #[test]
    fn test_alignment_commands() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.left().center().right();
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x61, 0, 0x1B, 0x61, 1, 0x1B, 0x61, 2]);
    }

    #[test]
    fn test_cut() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.cut();
            b.build()
        };
        assert_eq!(data, vec![0x1D, 0x56, 0x41, 0x10]);
    }

    #[test]
    fn test_text_size() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.text_size(2, 2);
            b.build()
        };
        // GS ! n where n = ((2-1) << 4) | (2-1) = 0x11
        assert_eq!(data, vec![0x1D, 0x21, 0x11]);
    }

    #[test]
    fn test_select_encoding_cp864() {
        let data = {
            let mut b = EscPosBuilder::new().with_encoding(CharacterEncoding::Cp864);
            b.select_encoding();
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x74, 37]);
    }

    #[test]
    fn test_select_encoding_cp1256() {
        let data = {
            let mut b = EscPosBuilder::new().with_encoding(CharacterEncoding::Cp1256);
            b.select_encoding();
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x74, 50]);
    }

    #[test]
    fn test_select_encoding_utf8() {
        let data = {
            let mut b = EscPosBuilder::new().with_encoding(CharacterEncoding::Utf8);
            b.select_encoding();
            b.build()
        };
        assert_eq!(data, vec![0x1C, 0x28, 0x43, 0x02, 0x00, 0x30, 0x02]);
    }

    #[test]
    fn test_cp1256_letter_block() {
        // "ءاب" — hamza, alef, beh
        let bytes = encode_cp1256("\u{0621}\u{0627}\u{0628}");
        assert_eq!(bytes, vec![0xC1, 0xC7, 0xC8]);
        // Letters after the Latin gaps: lam/meem/noon
        let bytes = encode_cp1256("\u{0644}\u{0645}\u{0646}");
        assert_eq!(bytes, vec![0xE1, 0xE3, 0xE4]);
    }

    #[test]
    fn test_cp1256_mixed_ascii_passthrough() {
        let bytes = encode_cp1256("AB \u{0633}");
        assert_eq!(bytes, vec![b'A', b'B', b' ', 0xD3]);
    }

    #[test]
    fn test_cp1256_unknown_becomes_question_mark() {
        let bytes = encode_cp1256("\u{4E2D}");
        assert_eq!(bytes, vec![b'?']);
    }

    #[test]
    fn test_cp864_isolated_forms() {
        // "سلم" — seen, lam, meem (no lam-alef pair)
        let bytes = encode_cp864("\u{0633}\u{0644}\u{0645}");
        assert_eq!(bytes, vec![0xBC, 0xFB, 0xEF]);
    }

    #[test]
    fn test_cp864_lam_alef_ligature() {
        // "لا" collapses into a single ligature byte
        let bytes = encode_cp864("\u{0644}\u{0627}");
        assert_eq!(bytes, vec![0x9D]);
        // "لأ" likewise
        let bytes = encode_cp864("\u{0644}\u{0623}");
        assert_eq!(bytes, vec![0x99]);
    }

    #[test]
    fn test_cp864_arabic_indic_digits() {
        let bytes = encode_cp864("\u{0660}\u{0665}\u{0669}");
        assert_eq!(bytes, vec![0xB0, 0xB5, 0xB9]);
    }

    #[test]
    fn test_rule_spans_paper_width() {
        let data = {
            let mut b = EscPosBuilder::new().with_paper(PaperWidth::Mm58);
            b.rule('=');
            b.build()
        };
        assert_eq!(data.len(), 33);
        assert!(data[..32].iter().all(|&b| b == b'='));
        assert_eq!(data[32], 0x0A);
    }

    #[test]
    fn test_line_pair() {
        let data = {
            let mut b = EscPosBuilder::new().with_paper(PaperWidth::Mm58);
            b.line_pair("Item", "$5.00");
            b.build()
        };
        // "Item" (4) + spaces (23) + "$5.00" (5) + LF = 33 bytes
        assert_eq!(data.len(), 33);
        assert_eq!(&data[..4], b"Item");
        assert_eq!(&data[27..32], b"$5.00");
        assert_eq!(data[32], 0x0A);
    }

    #[test]
    fn test_column_row_pads_to_exact_widths() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.column_row(&[("Qty", 6), ("Item", 30), ("Total", 12)]);
            b.build()
        };
        // 48 chars + LF
        assert_eq!(data.len(), 49);
        assert_eq!(&data[..6], b"Qty   ");
        assert_eq!(&data[6..10], b"Item");
    }

    #[test]
    fn test_column_row_truncates_with_ellipsis() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.column_row(&[
                ("An extremely long product name that overflows", 20),
                ("9.99", 8),
            ]);
            b.build()
        };
        let row = std::str::from_utf8(&data[..data.len() - 1]).unwrap();
        assert_eq!(row.len(), 28);
        assert!(row[..20].ends_with("..."));
        assert!(row.ends_with("9.99    "));
    }

    #[test]
    fn test_column_row_never_exceeds_paper_width() {
        let data = {
            let mut b = EscPosBuilder::new().with_paper(PaperWidth::Mm58);
            // Widths sum to 40 > 32 columns — the row must clamp.
            b.column_row(&[("AAAAAAAAAAAAAAAAAAAA", 20), ("BBBBBBBBBBBBBBBBBBBB", 20)]);
            b.build()
        };
        // 32 chars + LF
        assert_eq!(data.len(), 33);
    }

    #[test]
    fn test_fit_column_edge_widths() {
        assert_eq!(fit_column("ABCDEF", 3), "ABC");
        assert_eq!(fit_column("ABCDEF", 0), "");
        assert_eq!(fit_column("AB", 4), "AB  ");
        assert_eq!(fit_column("ABCDEF", 5), "AB...");
    }

    #[test]
    fn test_qr_block_structure() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.qr("https://example.test/r/1", 4, QrEcLevel::Medium);
            b.build()
        };
        // Model select comes first
        assert_eq!(
            &data[..9],
            &[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]
        );
        // Module size follows
        assert_eq!(&data[9..17], &[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, 4]);
        // EC level M = 49
        assert_eq!(
            &data[17..25],
            &[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 49]
        );
        // Store: pL counts function bytes + payload
        let payload_len = "https://example.test/r/1".len();
        assert_eq!(data[28], (payload_len + 3) as u8);
        assert_eq!(data[29], 0);
        // Print command is the final 8 bytes
        let tail = &data[data.len() - 8..];
        assert_eq!(tail, &[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);
    }

    #[test]
    fn test_open_drawer() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.open_drawer();
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x70, 0x00, 0x19, 0xFA]);
    }

    #[test]
    fn test_feed() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.feed(4);
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x64, 4]);
    }
}
