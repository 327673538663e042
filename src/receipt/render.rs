//! Printable receipt rendering.
//!
//! Layout of a 32-column receipt:
//!
//! ```text
//!
//!
//! Lembar ke: 1           Ket: TUNAI
//! --------------------------------
//!           WARMA STORE              (bold, double size)
//!        Jl. Contoh No. 123
//!        Telp: 08123456789
//!         27/01/2026 09:05
//!           Kasir: Admin
//! ================================
//! INDOMIE GORENG                     (bold)
//!   3 x 3.500             Rp10.500   (subtotal bold)
//! ================================
//! TOTAL                   Rp10.500   (bold)
//! --------------------------------
//!          Terima Kasih!
//! ```
//!
//! followed by three feeds and a partial cut.

use chrono::{DateTime, FixedOffset, Local, Utc};

use super::model::{Receipt, ReceiptDesign, ReceiptItem};
use crate::error::{EncodeError, PrintResult};
use crate::layout::{format_rupiah, format_thousands, pair_columns_split, truncate_with_ellipsis};
use crate::protocol::CommandEncoder;
use crate::protocol::latin1::sanitize;
use crate::store::KeyValueStore;
use crate::transport::{Adapter, Clock, PrinterManager};

/// Line spacing (dots) for the item block
const ITEM_LINE_SPACING: u8 = 32;

/// Timestamp format on the printed receipt
pub(crate) const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Renders receipts to printer bytes and to a text preview.
///
/// Timestamps are shown in the local time zone unless a fixed offset is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptRenderer {
    offset: Option<FixedOffset>,
}

impl ReceiptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show timestamps at a fixed UTC offset instead of local time.
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }

    pub(crate) fn format_timestamp(&self, millis: i64, format: &str) -> String {
        let utc = DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        match self.offset {
            Some(offset) => utc.with_timezone(&offset).format(format).to_string(),
            None => utc.with_timezone(&Local).format(format).to_string(),
        }
    }

    /// Build the full command sequence for `receipt`.
    ///
    /// Text from the receipt and design is reduced to the printer's character
    /// set first: unprintable characters and controls come out as `?`, line
    /// breaks as spaces.
    pub fn render_bytes(
        &self,
        receipt: &Receipt,
        design: &ReceiptDesign,
    ) -> Result<Vec<u8>, EncodeError> {
        let width = design.paper_width;
        let mut enc = CommandEncoder::new(width);

        enc.init().feed(2);

        // Sheet number and note
        let sheet = format!("Lembar ke: {}", receipt.lembar_ke);
        enc.align_left();
        if receipt.keterangan.trim().is_empty() {
            enc.print_line(&sheet);
        } else {
            let note = format!("Ket: {}", receipt.keterangan);
            enc.print_double_column(&sheet, &sanitize(&note));
        }
        enc.separator('-');

        // Header
        if !design.header_text.trim().is_empty() {
            enc.align_center().print_line(&sanitize(&design.header_text));
        }

        enc.align_center()
            .bold(true)
            .double_size(true)
            .print_line(&sanitize(store_name(receipt, design)))
            .double_size(false)
            .bold(false);

        if !design.store_address.trim().is_empty() {
            enc.print_line(&sanitize(&design.store_address));
        }
        if !design.store_phone.trim().is_empty() {
            enc.print_line(&sanitize(&design.store_phone));
        }
        if design.show_date_time {
            enc.print_line(&self.format_timestamp(receipt.timestamp_millis, DATE_FORMAT));
        }
        if design.show_kasir {
            enc.print_line(&sanitize(&format!("Kasir: {}", receipt.kasir)));
        }

        enc.align_left().double_separator();

        // Items
        enc.set_line_spacing(ITEM_LINE_SPACING);
        for item in &receipt.items {
            render_item(&mut enc, item, width);
        }
        enc.reset_line_spacing();

        enc.double_separator();

        // Total
        enc.bold(true)
            .print_double_column("TOTAL", &format_rupiah(receipt.total))
            .bold(false);

        enc.separator('-');

        // Footer
        enc.align_center().print_line(&sanitize(&design.footer_text));

        enc.feed(3).cut(true);
        enc.build()
    }

    /// Render and send `receipt` through `printer`.
    pub fn print<A: Adapter, S: KeyValueStore, C: Clock>(
        &self,
        printer: &mut PrinterManager<A, S, C>,
        receipt: &Receipt,
        design: &ReceiptDesign,
    ) -> PrintResult<()> {
        let data = self.render_bytes(receipt, design)?;
        printer.send_raw(&data)
    }

    /// A short page for checking the printer responds.
    pub fn test_page(&self, paper_width: usize, now_millis: i64) -> Result<Vec<u8>, EncodeError> {
        let mut enc = CommandEncoder::new(paper_width);
        enc.init()
            .align_center()
            .print_line("=== TEST PRINT ===")
            .print_line("Printer OK!")
            .print_line(&self.format_timestamp(now_millis, "%H:%M:%S"))
            .feed(3)
            .cut(true);
        enc.build()
    }

    /// Print [`test_page`](Self::test_page) stamped with the current time.
    pub fn print_test_page<A: Adapter, S: KeyValueStore, C: Clock>(
        &self,
        printer: &mut PrinterManager<A, S, C>,
        paper_width: usize,
    ) -> PrintResult<()> {
        let data = self.test_page(paper_width, Utc::now().timestamp_millis())?;
        printer.send_raw(&data)
    }
}

/// Name line in bold, then quantity × price against the bold subtotal.
fn render_item(enc: &mut CommandEncoder, item: &ReceiptItem, width: usize) {
    let name = sanitize(&item.name.to_uppercase()).into_owned();
    enc.bold(true)
        .print_line(&truncate_with_ellipsis(&name, width))
        .bold(false);

    let detail = format!("  {} x {}", item.quantity, format_thousands(item.price));
    let subtotal = format_rupiah(item.subtotal());
    let (left, right) = pair_columns_split(&detail, &subtotal, width);
    enc.print(&left).bold(true).print_line(right).bold(false);
}

/// The design's store name, or the one recorded on the receipt.
pub(crate) fn store_name<'a>(receipt: &'a Receipt, design: &'a ReceiptDesign) -> &'a str {
    if design.store_name.trim().is_empty() {
        receipt.store_name.as_str()
    } else {
        design.store_name.as_str()
    }
}
