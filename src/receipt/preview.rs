//! On-screen receipt preview.
//!
//! Same field order as the printed receipt, drawn inside a double-line box.
//! Nothing here touches the command encoder, so the preview can show any
//! Unicode text unchanged.

use super::model::{Receipt, ReceiptDesign};
use super::render::{DATE_FORMAT, ReceiptRenderer, store_name};
use crate::layout::{center, format_rupiah, format_thousands, pair_columns, rule, truncate_with_ellipsis};

/// A horizontal border with the given corner glyphs.
fn border(left: char, right: char, inner: usize) -> String {
    format!("{left}{}{right}", rule('═', inner))
}

/// One boxed row. Text wider than the box is cut with an ellipsis.
fn row(content: &str, inner: usize) -> String {
    let text = truncate_with_ellipsis(content, inner);
    let pad = inner - text.chars().count();
    format!("║{text}{}║", " ".repeat(pad))
}

impl ReceiptRenderer {
    /// Render `receipt` as boxed text for display.
    ///
    /// Every line is at most `design.paper_width` characters: rows are laid
    /// out two columns narrower to leave room for the borders.
    pub fn render_preview(&self, receipt: &Receipt, design: &ReceiptDesign) -> String {
        let width = design.paper_width;
        let inner = width.saturating_sub(2);
        let centered = |text: &str| row(&center(text, inner), inner);

        let mut lines = vec![String::new(), String::new()];

        let sheet = format!("Lembar ke: {}", receipt.lembar_ke);
        if receipt.keterangan.trim().is_empty() {
            lines.push(sheet);
        } else {
            let note = format!("Ket: {}", receipt.keterangan);
            lines.push(pair_columns(&sheet, &note, width));
        }

        lines.push(border('╔', '╗', inner));
        if !design.header_text.trim().is_empty() {
            lines.push(centered(&design.header_text));
        }
        lines.push(centered(store_name(receipt, design)));
        if !design.store_address.trim().is_empty() {
            lines.push(centered(&design.store_address));
        }
        if !design.store_phone.trim().is_empty() {
            lines.push(centered(&design.store_phone));
        }
        lines.push(border('╠', '╣', inner));

        if design.show_date_time || design.show_kasir {
            if design.show_date_time {
                lines.push(centered(
                    &self.format_timestamp(receipt.timestamp_millis, DATE_FORMAT),
                ));
            }
            if design.show_kasir {
                lines.push(centered(&format!("Kasir: {}", receipt.kasir)));
            }
            lines.push(border('╠', '╣', inner));
        }

        lines.push(centered("--- DAFTAR BELANJA ---"));
        lines.push(row("", inner));
        for item in &receipt.items {
            lines.push(row(&item.name.to_uppercase(), inner));
            let detail = format!("  {} x {}", item.quantity, format_thousands(item.price));
            lines.push(row(
                &pair_columns(&detail, &format_rupiah(item.subtotal()), inner),
                inner,
            ));
        }
        lines.push(border('╠', '╣', inner));

        let label = format!("TOTAL ({} item)", receipt.items.len());
        lines.push(row(
            &pair_columns(&label, &format_rupiah(receipt.total), inner),
            inner,
        ));
        lines.push(border('╠', '╣', inner));

        lines.push(centered(&design.footer_text));
        lines.push(border('╚', '╝', inner));

        lines.join("\n")
    }
}
