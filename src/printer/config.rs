//! # Printer Configuration
//!
//! Paper profiles and connection tuning.
//!
//! ## Paper Profiles
//!
//! | Profile | Paper | Columns (font A) |
//! |---------|-------|------------------|
//! | MM58 | 58mm | 32 |
//! | MM80 | 80mm | 48 |
//!
//! ## Connection Tuning
//!
//! The retry delays, attempt counts and staleness threshold below were tuned
//! against cheap SPP printers that drop idle links without telling the host.
//! They are plain values so deployments can adjust them from a JSON file:
//!
//! ```
//! use struk::printer::ConnectionConfig;
//!
//! let config: ConnectionConfig =
//!     serde_json::from_str(r#"{ "staleAfterMs": 60000, "fallbackChannel": null }"#)?;
//! assert_eq!(config.stale_after().as_secs(), 60);
//! assert_eq!(config.attempt_plan().len(), 2);
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::Channel;

/// # Paper Profile
///
/// Character-grid geometry of one paper size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaperProfile {
    /// Profile name
    pub name: &'static str,

    /// Paper roll width in millimeters
    pub paper_mm: u16,

    /// Characters per line in the standard font
    pub columns: usize,
}

impl PaperProfile {
    /// 58mm roll, the common size for handheld Bluetooth printers.
    pub const MM58: Self = Self {
        name: "58mm",
        paper_mm: 58,
        columns: 32,
    };

    /// 80mm roll.
    pub const MM80: Self = Self {
        name: "80mm",
        paper_mm: 80,
        columns: 48,
    };

    /// Look up a profile by roll width in millimeters.
    pub fn by_width_mm(mm: u16) -> Option<Self> {
        match mm {
            58 => Some(Self::MM58),
            80 => Some(Self::MM80),
            _ => None,
        }
    }
}

impl Default for PaperProfile {
    fn default() -> Self {
        Self::MM58
    }
}

/// # Connection Configuration
///
/// Tunables for connect retries, staleness and chunked writes.
///
/// All durations are stored in milliseconds so the JSON form stays readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// Wait before the first connect attempt
    pub first_attempt_delay_ms: u64,

    /// Wait before every later connect attempt
    pub retry_delay_ms: u64,

    /// Attempts that use the negotiated service channel
    pub standard_attempts: u32,

    /// Fixed RFCOMM channel for one last attempt; `None` skips it
    pub fallback_channel: Option<u8>,

    /// Idle time after which a connected link is treated as dead
    pub stale_after_ms: u64,

    /// Full ensure-connected + write passes made by `send_raw`
    pub send_attempts: u32,

    /// Largest single write handed to the link
    pub chunk_size: usize,

    /// Pause between chunks of a large write
    pub chunk_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            first_attempt_delay_ms: 300,
            retry_delay_ms: 500,
            standard_attempts: 2,
            fallback_channel: Some(1),
            stale_after_ms: 5 * 60 * 1000,
            send_attempts: 2,
            chunk_size: 512,
            chunk_delay_ms: 2,
        }
    }
}

impl ConnectionConfig {
    /// Delay and channel for every connect attempt, in order.
    ///
    /// With the defaults this is 300ms/negotiated, 500ms/negotiated,
    /// 500ms/fixed channel 1.
    pub fn attempt_plan(&self) -> Vec<(Duration, Channel)> {
        let fallback = self.fallback_channel.map(Channel::Fixed);
        (0..self.standard_attempts)
            .map(|_| Channel::Negotiated)
            .chain(fallback)
            .enumerate()
            .map(|(i, channel)| {
                let delay = if i == 0 {
                    self.first_attempt_delay_ms
                } else {
                    self.retry_delay_ms
                };
                (Duration::from_millis(delay), channel)
            })
            .collect()
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}
