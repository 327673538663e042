//! Sale records and receipt design settings.
//!
//! Both are supplied by the surrounding application and are read-only to the
//! renderer. The JSON shapes match what the point-of-sale app stores, so a
//! saved receipt file can be printed as-is.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::printer::PaperProfile;

/// One line of a sale, snapshotted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    #[serde(default)]
    pub sku: String,
    pub price: i64,
    pub quantity: u32,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "pcs".to_string()
}

impl ReceiptItem {
    pub fn new(name: impl Into<String>, price: i64, quantity: u32) -> Self {
        Self {
            name: name.into(),
            sku: String::new(),
            price,
            quantity,
            unit: default_unit(),
        }
    }

    /// Price times quantity. Always derived, never stored.
    ///
    /// Saturates at the `i64` bounds instead of overflowing.
    pub fn subtotal(&self) -> i64 {
        self.price.saturating_mul(i64::from(self.quantity))
    }
}

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    /// Milliseconds since the Unix epoch
    #[serde(rename = "timestamp")]
    pub timestamp_millis: i64,
    #[serde(default = "default_kasir")]
    pub kasir: String,
    #[serde(default)]
    pub store_name: String,
    pub items: Vec<ReceiptItem>,
    pub total: i64,
    /// Sheet number when several copies of one sale are printed
    #[serde(default = "default_lembar")]
    pub lembar_ke: u32,
    /// Free-form note printed beside the sheet number
    #[serde(default)]
    pub keterangan: String,
}

fn default_kasir() -> String {
    "Kasir".to_string()
}

fn default_lembar() -> u32 {
    1
}

impl Receipt {
    /// A fresh receipt stamped now, totalling its items.
    pub fn new(items: Vec<ReceiptItem>) -> Self {
        let total = sum_subtotals(&items);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp_millis: Utc::now().timestamp_millis(),
            kasir: default_kasir(),
            store_name: String::new(),
            items,
            total,
            lembar_ke: default_lembar(),
            keterangan: String::new(),
        }
    }

    /// Sum of the item subtotals.
    ///
    /// May differ from [`total`](Self::total) when the sale carried a
    /// discount; the printed TOTAL always uses `total`.
    pub fn items_total(&self) -> i64 {
        sum_subtotals(&self.items)
    }
}

fn sum_subtotals(items: &[ReceiptItem]) -> i64 {
    items
        .iter()
        .map(ReceiptItem::subtotal)
        .fold(0, i64::saturating_add)
}

/// Store branding and layout options.
///
/// `paper_width` is the only source of truth for line width: every line the
/// renderer produces is laid out against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReceiptDesign {
    pub store_name: String,
    pub store_address: String,
    pub store_phone: String,
    pub header_text: String,
    pub footer_text: String,
    pub show_date_time: bool,
    pub show_kasir: bool,
    /// Characters per line
    pub paper_width: usize,
}

impl Default for ReceiptDesign {
    fn default() -> Self {
        Self {
            store_name: "WARMA STORE".to_string(),
            store_address: String::new(),
            store_phone: String::new(),
            header_text: String::new(),
            footer_text: "Terima Kasih!".to_string(),
            show_date_time: true,
            show_kasir: true,
            paper_width: PaperProfile::MM58.columns,
        }
    }
}

impl ReceiptDesign {
    /// Defaults laid out for `profile`.
    pub fn for_paper(profile: PaperProfile) -> Self {
        Self {
            paper_width: profile.columns,
            ..Default::default()
        }
    }
}
