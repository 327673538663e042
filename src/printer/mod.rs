//! # Printer Module
//!
//! Printer-specific configuration.
//!
//! ## Modules
//!
//! - [`config`]: paper geometry and connection tuning

pub mod config;

pub use config::{ConnectionConfig, PaperProfile};
