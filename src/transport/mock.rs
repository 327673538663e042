//! # Mock Transport
//!
//! An in-memory [`Adapter`] and a manually driven [`Clock`] for exercising
//! connection logic without hardware.
//!
//! ```
//! use std::time::Duration;
//! use struk::store::MemoryStore;
//! use struk::transport::PrinterManager;
//! use struk::transport::mock::{FakeClock, MockAdapter};
//! use struk::printer::ConnectionConfig;
//!
//! let adapter = MockAdapter::new().with_device("00:11:22:33:44:55", "RPP02N");
//! let handle = adapter.handle();
//! let clock = FakeClock::new();
//!
//! let mut printer = PrinterManager::with_clock(
//!     adapter,
//!     MemoryStore::new(),
//!     clock.clone(),
//!     ConnectionConfig::default(),
//! )?;
//! printer.connect("00:11:22:33:44:55")?;
//!
//! assert_eq!(handle.opens().len(), 1);
//! assert_eq!(clock.sleeps(), vec![Duration::from_millis(300)]);
//! # Ok::<(), struk::PrinterError>(())
//! ```

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::{Adapter, Channel, Clock, Link};

#[derive(Debug)]
struct MockState {
    permission: bool,
    enabled: bool,
    devices: Vec<(String, String)>,
    open_failures: VecDeque<io::ErrorKind>,
    fail_all_opens: bool,
    opens: Vec<(String, Channel)>,
    discovery_cancels: usize,
    write_failures: usize,
    written: Vec<u8>,
    closes: usize,
    link_dropped: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            permission: true,
            enabled: true,
            devices: Vec::new(),
            open_failures: VecDeque::new(),
            fail_all_opens: false,
            opens: Vec::new(),
            discovery_cancels: 0,
            write_failures: 0,
            written: Vec::new(),
            closes: 0,
            link_dropped: false,
        }
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scriptable adapter. Opens succeed unless told otherwise.
#[derive(Debug, Default)]
pub struct MockAdapter {
    state: Arc<Mutex<MockState>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a paired device.
    pub fn with_device(self, address: &str, name: &str) -> Self {
        lock(&self.state)
            .devices
            .push((address.to_string(), name.to_string()));
        self
    }

    /// A handle for scripting and inspecting the adapter after it has been
    /// moved into a manager.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Adapter for MockAdapter {
    type Link = MockLink;

    fn has_permission(&self) -> bool {
        lock(&self.state).permission
    }

    fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    fn paired_devices(&self) -> io::Result<Vec<(String, String)>> {
        Ok(lock(&self.state).devices.clone())
    }

    fn cancel_discovery(&self) {
        lock(&self.state).discovery_cancels += 1;
    }

    fn open(&mut self, address: &str, channel: Channel) -> io::Result<MockLink> {
        let mut state = lock(&self.state);
        state.opens.push((address.to_string(), channel));
        if state.fail_all_opens {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("scripted failure #{}", state.opens.len()),
            ));
        }
        if let Some(kind) = state.open_failures.pop_front() {
            return Err(io::Error::new(
                kind,
                format!("scripted failure #{}", state.opens.len()),
            ));
        }
        state.link_dropped = false;
        Ok(MockLink {
            state: Arc::clone(&self.state),
        })
    }
}

/// Inspection and scripting side of a [`MockAdapter`].
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    pub fn set_permission(&self, granted: bool) {
        lock(&self.state).permission = granted;
    }

    pub fn set_enabled(&self, enabled: bool) {
        lock(&self.state).enabled = enabled;
    }

    /// Fail the next `n` opens.
    pub fn fail_next_opens(&self, n: usize) {
        let mut state = lock(&self.state);
        for _ in 0..n {
            state.open_failures.push_back(io::ErrorKind::ConnectionRefused);
        }
    }

    /// Fail every open from now on.
    pub fn fail_all_opens(&self) {
        lock(&self.state).fail_all_opens = true;
    }

    /// Fail the next `n` writes with a broken pipe.
    pub fn fail_next_writes(&self, n: usize) {
        lock(&self.state).write_failures = n;
    }

    /// Make the current link report itself closed.
    pub fn drop_link(&self) {
        lock(&self.state).link_dropped = true;
    }

    /// Every open attempt, in order.
    pub fn opens(&self) -> Vec<(String, Channel)> {
        lock(&self.state).opens.clone()
    }

    pub fn discovery_cancels(&self) -> usize {
        lock(&self.state).discovery_cancels
    }

    /// Bytes successfully written across all links.
    pub fn written(&self) -> Vec<u8> {
        lock(&self.state).written.clone()
    }

    /// Number of links closed.
    pub fn closes(&self) -> usize {
        lock(&self.state).closes
    }
}

/// Link handed out by [`MockAdapter`].
#[derive(Debug)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = lock(&self.state);
        if state.write_failures > 0 {
            state.write_failures -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"));
        }
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Link for MockLink {
    fn close(&mut self) -> io::Result<()> {
        lock(&self.state).closes += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !lock(&self.state).link_dropped
    }
}

// ============================================================================
// FAKE CLOCK
// ============================================================================

#[derive(Debug)]
struct ClockState {
    now: Instant,
    sleeps: Vec<Duration>,
}

/// Clock that only moves when slept on or advanced.
#[derive(Debug, Clone)]
pub struct FakeClock {
    state: Arc<Mutex<ClockState>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                now: Instant::now(),
                sleeps: Vec::new(),
            })),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.now += by;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.sleeps.clone()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.sleeps.push(duration);
        state.now += duration;
    }
}
