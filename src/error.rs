//! # Error Types
//!
//! This module defines error types used throughout the struk library.
//!
//! Low-level I/O failures are caught at the boundary of connect, write and
//! disconnect and converted into one of the [`PrinterError`] kinds. Nothing
//! here is fatal to the process; callers decide how to present failures.

use std::io;

use thiserror::Error;

/// Text could not be encoded in the printer's single-byte character set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Character outside the Latin-1 range
    #[error("character {ch:?} at position {position} is not printable")]
    Unrepresentable { ch: char, position: usize },
}

/// Main error type for printer operations
#[derive(Debug, Error)]
pub enum PrinterError {
    /// The platform refused Bluetooth access
    #[error("Bluetooth permission not granted")]
    PermissionDenied,

    /// The Bluetooth adapter is missing or switched off
    #[error("Bluetooth is not enabled")]
    BluetoothDisabled,

    /// `ensure_connected` was called with no saved printer to fall back on
    #[error("no saved printer; choose a printer in the settings first")]
    NoSavedDevice,

    /// The address does not name a reachable device
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Every connect attempt failed; carries the last underlying cause
    #[error("failed to connect to {address} after {attempts} attempts: {source}")]
    ConnectFailed {
        address: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// A write was requested without an open connection
    #[error("not connected to a printer")]
    NotConnected,

    /// Writing or flushing failed; the connection has been dropped
    #[error("connection lost while writing: {0}")]
    ConnectionLost(#[source] io::Error),

    /// `send_raw` failed on every pass
    #[error("printing failed after {attempts} attempts; reconnect the printer in the settings")]
    AllAttemptsExhausted {
        attempts: u32,
        #[source]
        last: Box<PrinterError>,
    },

    /// Receipt text could not be encoded
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodeError),

    /// Settings store failure
    #[error("settings store error: {0}")]
    Store(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for PrinterError {
    fn from(e: serde_json::Error) -> Self {
        PrinterError::Store(e.to_string())
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrinterError>;
