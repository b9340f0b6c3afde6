//! Print document shapes and the pure ESC/POS renderers for them.
//!
//! The host application assembles one of these documents (it owns the
//! business content); this module converts it into device bytes. Rendering
//! is stateless — same document + config in, same bytes out.

use serde::{Deserialize, Serialize};

use crate::config::PrinterConfig;
use crate::escpos::{EscPosBuilder, QrEcLevel};

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: f64,
    pub total: f64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TotalsLine {
    pub label: String,
    pub amount: f64,
    #[serde(default)]
    pub emphasize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaymentLine {
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReceiptDoc {
    pub store_name: String,
    #[serde(default)]
    pub store_address: Option<String>,
    #[serde(default)]
    pub store_phone: Option<String>,
    pub receipt_number: String,
    pub created_at: String,
    #[serde(default)]
    pub cashier: Option<String>,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
    #[serde(default)]
    pub totals: Vec<TotalsLine>,
    #[serde(default)]
    pub payments: Vec<PaymentLine>,
    #[serde(default)]
    pub footer_text: Option<String>,
    /// When set, a QR block is printed above the footer.
    #[serde(default)]
    pub qr_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportLine {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub emphasize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportDoc {
    pub title: String,
    pub report_date: String,
    pub generated_at: String,
    pub terminal_name: String,
    #[serde(default)]
    pub lines: Vec<ReportLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TestPageDoc {
    pub printer_name: String,
    pub printed_at: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// The payload a caller enqueues; the job kind derives from the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "doc", rename_all = "snake_case")]
pub enum PrintPayload {
    Receipt(ReceiptDoc),
    Report(ReportDoc),
    TestPage(TestPageDoc),
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn qty(value: f64) -> String {
    if (value.round() - value).abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Greedy word wrap to `width` characters per line. Words longer than the
/// width are split hard.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();
        if current_len == 0 && word_len <= width {
            current.push_str(word);
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut rest: Vec<char> = word.chars().collect();
            while rest.len() > width {
                lines.push(rest.drain(..width).collect());
            }
            current = rest.into_iter().collect();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn emit_wrapped(builder: &mut EscPosBuilder, text: &str, width: usize) {
    for line in wrap(text, width) {
        builder.text(&line).lf();
    }
}

fn emit_pair(builder: &mut EscPosBuilder, label: &str, value: &str, width: usize) {
    let label_len = label.chars().count();
    let value_len = value.chars().count();
    if label_len + value_len < width {
        builder.line_pair(label, value);
        return;
    }
    for line in wrap(label, width.saturating_sub(value_len + 1).max(8)) {
        builder.text(&line).lf();
    }
    builder.right().text(value).lf().left();
}

fn builder_for(cfg: &PrinterConfig) -> EscPosBuilder {
    let mut builder = EscPosBuilder::new()
        .with_paper(cfg.paper_width)
        .with_encoding(cfg.encoding);
    builder.init().select_encoding();
    builder
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// Render any payload with the given printer configuration.
pub fn render(payload: &PrintPayload, cfg: &PrinterConfig) -> Vec<u8> {
    match payload {
        PrintPayload::Receipt(doc) => render_receipt(doc, cfg),
        PrintPayload::Report(doc) => render_report(doc, cfg),
        PrintPayload::TestPage(doc) => render_test_page(doc, cfg),
    }
}

pub fn render_receipt(doc: &ReceiptDoc, cfg: &PrinterConfig) -> Vec<u8> {
    let mut builder = builder_for(cfg);
    let width = builder.columns();

    builder
        .center()
        .bold(true)
        .double_height()
        .text(&doc.store_name)
        .lf()
        .normal_size()
        .bold(false);
    if let Some(address) = doc
        .store_address
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        emit_wrapped(&mut builder, address, width);
    }
    if let Some(phone) = doc
        .store_phone
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        builder.text(phone).lf();
    }
    builder.left().separator();

    emit_pair(
        &mut builder,
        "Receipt",
        &format!("#{}", doc.receipt_number),
        width,
    );
    emit_pair(&mut builder, "Date", &doc.created_at, width);
    if let Some(cashier) = doc
        .cashier
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        emit_pair(&mut builder, "Cashier", cashier, width);
    }
    builder.separator();

    // Item rows: qty | name | amount, widths summing to the paper width.
    let qty_w = 4;
    let amount_w = 10;
    let name_w = width - qty_w - amount_w;
    for item in &doc.items {
        let qty_cell = format!("{}x", qty(item.quantity));
        let amount_cell = money(item.total);
        builder.column_row(&[
            (qty_cell.as_str(), qty_w),
            (item.name.as_str(), name_w),
            (amount_cell.as_str(), amount_w),
        ]);
        if let Some(note) = item
            .note
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            emit_wrapped(&mut builder, &format!("  Note: {note}"), width);
        }
    }
    if doc.items.is_empty() {
        builder.text("No items").lf();
    }
    builder.separator();

    for total in &doc.totals {
        if total.emphasize {
            builder.bold(true).double_height();
            emit_pair(&mut builder, &total.label, &money(total.amount), width);
            builder.normal_size().bold(false);
        } else {
            emit_pair(&mut builder, &total.label, &money(total.amount), width);
        }
    }
    if !doc.payments.is_empty() {
        builder.separator();
        for payment in &doc.payments {
            emit_pair(&mut builder, &payment.label, &money(payment.amount), width);
        }
    }

    if let Some(qr_data) = doc
        .qr_data
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        builder.lf().center().qr(qr_data, 4, QrEcLevel::Medium).lf();
        builder.left();
    }
    if let Some(footer) = doc
        .footer_text
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        builder.center();
        emit_wrapped(&mut builder, footer, width);
        builder.left();
    }

    if cfg.open_cash_drawer {
        builder.open_drawer();
    }
    builder.feed(4).cut();
    builder.build()
}

pub fn render_report(doc: &ReportDoc, cfg: &PrinterConfig) -> Vec<u8> {
    let mut builder = builder_for(cfg);
    let width = builder.columns();

    builder
        .center()
        .bold(true)
        .text(&doc.title)
        .lf()
        .bold(false)
        .left()
        .separator();
    emit_pair(&mut builder, "Date", &doc.report_date, width);
    emit_pair(&mut builder, "Generated", &doc.generated_at, width);
    emit_pair(&mut builder, "Terminal", &doc.terminal_name, width);
    builder.separator();

    for line in &doc.lines {
        if line.emphasize {
            builder.bold(true);
            emit_pair(&mut builder, &line.label, &line.value, width);
            builder.bold(false);
        } else {
            emit_pair(&mut builder, &line.label, &line.value, width);
        }
    }

    builder.feed(4).cut();
    builder.build()
}

pub fn render_test_page(doc: &TestPageDoc, cfg: &PrinterConfig) -> Vec<u8> {
    let mut builder = builder_for(cfg);
    let width = builder.columns();

    builder
        .center()
        .bold(true)
        .text("TEST PRINT")
        .lf()
        .bold(false)
        .left()
        .separator();
    emit_pair(&mut builder, "Printer", &doc.printer_name, width);
    emit_pair(&mut builder, "Date", &doc.printed_at, width);
    if let Some(note) = doc.note.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        emit_wrapped(&mut builder, note, width);
    }
    builder.separator();
    builder.text("ABCDEFGHIJKLMNOPQRSTUVWXYZ").lf();
    builder.text("0123456789 !@#$%^&*()").lf();
    builder
        .bold(true)
        .text("Bold")
        .bold(false)
        .text("  ")
        .double_height()
        .text("Tall")
        .normal_size()
        .lf();
    builder.separator();
    builder.center().text("-- End of Test --").lf().left();
    builder.feed(4).cut();
    builder.build()
}

// ===========================================================================
// Tests
// ===========================================================================
