//! # Printer Transport Layer
//!
//! Connection management for a Bluetooth serial printer.
//!
//! ## Layers
//!
//! - [`Adapter`] and [`Link`]: what the platform must provide (device list,
//!   permission check, opening a byte stream to an address)
//! - [`connection::PrinterManager`]: the single logical connection, with
//!   retries, staleness detection and the saved printer
//!
//! ## Available Adapters
//!
//! - [`bluetooth`]: Bluetooth RFCOMM via BlueZ tools (Linux)
//! - [`mock`]: scriptable in-memory adapter for tests

pub mod bluetooth;
pub mod connection;
pub mod mock;

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

pub use bluetooth::RfcommAdapter;
pub use connection::{ConnectionState, PrinterManager, SharedPrinter};

/// A paired device as reported by discovery.
///
/// A snapshot: refreshed on demand and thrown away, never owned by the
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub address: String,
    pub name: String,
    /// Whether this is the saved printer
    pub is_saved: bool,
}

/// How to reach the serial service on the remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Look the service channel up on the device
    Negotiated,
    /// Skip the lookup and use this RFCOMM channel directly
    Fixed(u8),
}

/// An open byte stream to a printer.
pub trait Link: Write + Send {
    /// Close the stream. Called once; errors are reported but not acted on.
    fn close(&mut self) -> io::Result<()>;

    /// Whether the platform still reports the stream as open.
    fn is_open(&self) -> bool {
        true
    }
}

/// Platform Bluetooth capabilities the connection manager relies on.
pub trait Adapter: Send {
    type Link: Link;

    /// Whether the process may use Bluetooth at all. Checked before every
    /// discovery or connect.
    fn has_permission(&self) -> bool;

    /// Whether an adapter is present and powered.
    fn is_enabled(&self) -> bool;

    /// Paired devices as `(address, name)`.
    fn paired_devices(&self) -> io::Result<Vec<(String, String)>>;

    /// Stop any running device scan. Scanning slows connection setup.
    fn cancel_discovery(&self);

    /// Open a stream to `address`.
    fn open(&mut self, address: &str, channel: Channel) -> io::Result<Self::Link>;
}

/// Time source for retry delays and staleness.
pub trait Clock: Send {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}
