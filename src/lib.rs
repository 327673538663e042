//! # Struk - Bluetooth Receipt Printing
//!
//! Struk prints sale receipts on cheap ESC/POS thermal printers over
//! Bluetooth serial (RFCOMM). It provides:
//!
//! - **Protocol implementation**: ESC/POS command builders and a fluent encoder
//! - **Layout**: fixed-width text fitting (centering, columns, truncation)
//! - **Receipts**: printable bytes and an on-screen preview from one sale
//! - **Transport**: a retrying, self-healing printer connection
//!
//! ## Quick Start
//!
//! ```no_run
//! use struk::{PrinterManager, Receipt, ReceiptDesign, ReceiptItem, ReceiptRenderer, RfcommAdapter};
//! use struk::store::JsonFileStore;
//!
//! let store = JsonFileStore::open("struk.json")?;
//! let mut printer = PrinterManager::new(RfcommAdapter::default(), store)?;
//! printer.connect_and_save("00:11:22:33:44:55", "RPP02N")?;
//!
//! let receipt = Receipt::new(vec![
//!     ReceiptItem::new("Indomie Goreng", 3500, 3),
//!     ReceiptItem::new("Aqua 600ml", 4000, 2),
//! ]);
//!
//! ReceiptRenderer::new().print(&mut printer, &receipt, &ReceiptDesign::default())?;
//! # Ok::<(), struk::PrinterError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | ESC/POS opcodes and the command encoder |
//! | [`layout`] | Fixed-width text layout and amount formatting |
//! | [`receipt`] | Receipt model, byte renderer and preview |
//! | [`transport`] | Adapters and the printer connection manager |
//! | [`printer`] | Paper profiles and connection tuning |
//! | [`store`] | Saved printer and design persistence |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Tested against 58mm handheld ESC/POS printers with the Bluetooth Serial
//! Port Profile. 80mm printers work with [`PaperProfile::MM80`].

pub mod error;
pub mod layout;
pub mod printer;
pub mod protocol;
pub mod receipt;
pub mod store;
pub mod transport;

// Re-exports for convenience
pub use error::{EncodeError, PrintResult, PrinterError};
pub use printer::{ConnectionConfig, PaperProfile};
pub use protocol::CommandEncoder;
pub use receipt::{Receipt, ReceiptDesign, ReceiptItem, ReceiptRenderer};
pub use transport::{PrinterManager, RfcommAdapter, SharedPrinter};
