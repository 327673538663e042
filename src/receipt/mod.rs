//! # Receipts
//!
//! The sale record and design settings, and the renderer that turns them
//! into printer bytes ([`ReceiptRenderer::render_bytes`]) or a boxed text
//! preview ([`ReceiptRenderer::render_preview`]).

mod model;
mod preview;
mod render;

pub use model::{Receipt, ReceiptDesign, ReceiptItem};
pub use render::ReceiptRenderer;
