//! # ESC/POS Protocol Implementation
//!
//! Low-level command builders for the thermal receipt printers struk drives.
//!
//! ## Module Structure
//!
//! - [`commands`]: one function per opcode, returning its exact bytes
//! - [`latin1`]: single-byte text encoding
//! - [`encoder`]: the fluent [`CommandEncoder`] that chains the above
//!
//! ## Usage Example
//!
//! ```
//! use struk::protocol::commands;
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(commands::bold(true));
//! data.extend(b"RECEIPT\n");
//! data.extend(commands::bold(false));
//! data.extend(commands::cut(true));
//! ```

pub mod commands;
pub mod encoder;
pub mod latin1;

pub use encoder::CommandEncoder;
