//! # Printer Connection Manager
//!
//! Owns the one logical connection to the printer.
//!
//! ## State Machine
//!
//! ```text
//!  Disconnected ──connect()──▶ Connecting ──ok──▶ Connected
//!        ▲                         │                  │
//!        └──────── all attempts ───┘                  │
//!        └──── disconnect() / write failure / stale ──┘
//! ```
//!
//! ## Connect Retries
//!
//! `connect` makes up to three attempts (see
//! [`ConnectionConfig::attempt_plan`]): 300ms before the first, 500ms before
//! each later one. The first two look the serial channel up on the device;
//! the last goes straight to a fixed RFCOMM channel, which older printers
//! without a service record still answer on. Every attempt starts by closing
//! whatever the previous one left behind.
//!
//! ## Staleness
//!
//! Cheap SPP printers drop idle links while the host still reports them as
//! open. [`ensure_connected`](PrinterManager::ensure_connected) therefore
//! treats a link idle for longer than `stale_after` (5 minutes) as dead and
//! reconnects. There is no background timer; the check runs at the start of
//! each print.
//!
//! ## Concurrency
//!
//! Every operation blocks and takes `&mut self`, so one manager serves one
//! operation at a time. Share it between threads through [`SharedPrinter`].

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use super::{Adapter, Clock, Device, Link, SystemClock, is_valid_mac};
use crate::error::{PrintResult, PrinterError};
use crate::printer::ConnectionConfig;
use crate::store::{KeyValueStore, SavedPrinter};

/// Name shown for devices that do not report one
const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// Connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { address: String },
    Connected { device: Device, last_activity: Instant },
}

/// # Printer Manager
///
/// Connection lifecycle, saved-printer persistence and the retrying print
/// path, over an injected [`Adapter`], [`KeyValueStore`] and [`Clock`].
pub struct PrinterManager<A: Adapter, S: KeyValueStore, C: Clock = SystemClock> {
    adapter: A,
    store: S,
    clock: C,
    config: ConnectionConfig,
    state: ConnectionState,
    link: Option<A::Link>,
    saved: Option<SavedPrinter>,
}

impl<A: Adapter, S: KeyValueStore> PrinterManager<A, S, SystemClock> {
    /// Create a manager with the default tuning and the system clock.
    ///
    /// Loads the saved printer from `store`.
    pub fn new(adapter: A, store: S) -> PrintResult<Self> {
        Self::with_clock(adapter, store, SystemClock, ConnectionConfig::default())
    }
}

impl<A: Adapter, S: KeyValueStore, C: Clock> PrinterManager<A, S, C> {
    pub fn with_clock(adapter: A, store: S, clock: C, config: ConnectionConfig) -> PrintResult<Self> {
        let saved = SavedPrinter::load(&store)?;
        Ok(Self {
            adapter,
            store,
            clock,
            config,
            state: ConnectionState::Disconnected,
            link: None,
            saved,
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    /// The device currently connected, if any.
    pub fn connected_device(&self) -> Option<&Device> {
        match &self.state {
            ConnectionState::Connected { device, .. } => Some(device),
            _ => None,
        }
    }

    pub fn saved_printer(&self) -> Option<&SavedPrinter> {
        self.saved.as_ref()
    }

    pub fn is_bluetooth_enabled(&self) -> bool {
        self.adapter.is_enabled()
    }

    /// The settings store, for callers that keep other records beside the
    /// saved printer.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ========================================================================
    // DISCOVERY
    // ========================================================================

    /// Paired devices, with the saved printer marked and listed first.
    pub fn list_devices(&self) -> PrintResult<Vec<Device>> {
        if !self.adapter.has_permission() {
            return Err(PrinterError::PermissionDenied);
        }
        if !self.adapter.is_enabled() {
            return Err(PrinterError::BluetoothDisabled);
        }

        let saved_address = self.saved.as_ref().map(|s| s.address.as_str());
        let mut devices: Vec<Device> = self
            .adapter
            .paired_devices()?
            .into_iter()
            .map(|(address, name)| Device {
                is_saved: saved_address.is_some_and(|saved| saved.eq_ignore_ascii_case(&address)),
                name: if name.trim().is_empty() {
                    UNKNOWN_DEVICE_NAME.to_string()
                } else {
                    name
                },
                address,
            })
            .collect();
        // stable: paired order is kept otherwise
        devices.sort_by_key(|d| !d.is_saved);
        Ok(devices)
    }

    // ========================================================================
    // CONNECTION LIFECYCLE
    // ========================================================================

    /// Connect to `address`, retrying per the attempt plan.
    ///
    /// Any existing connection is torn down first. On failure the last
    /// underlying error is returned inside [`PrinterError::ConnectFailed`].
    #[instrument(skip(self))]
    pub fn connect(&mut self, address: &str) -> PrintResult<()> {
        if !self.adapter.has_permission() {
            return Err(PrinterError::PermissionDenied);
        }
        if !is_valid_mac(address) {
            return Err(PrinterError::DeviceNotFound(address.to_string()));
        }

        self.disconnect();
        self.adapter.cancel_discovery();
        self.state = ConnectionState::Connecting {
            address: address.to_string(),
        };

        let plan = self.config.attempt_plan();
        let attempts = plan.len() as u32;
        let mut last_error = None;

        for (i, (delay, channel)) in plan.into_iter().enumerate() {
            let attempt = i + 1;
            self.clock.sleep(delay);
            self.drop_link();

            debug!(attempt, ?channel, delay_ms = delay.as_millis() as u64, "Connect attempt");
            match self.adapter.open(address, channel) {
                Ok(link) => {
                    self.link = Some(link);
                    let device = Device {
                        address: address.to_string(),
                        name: self.device_name(address),
                        is_saved: self.is_saved_address(address),
                    };
                    info!(attempt, name = %device.name, "Connected to printer");
                    self.state = ConnectionState::Connected {
                        device,
                        last_activity: self.clock.now(),
                    };
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, ?channel, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        self.drop_link();
        self.state = ConnectionState::Disconnected;
        Err(PrinterError::ConnectFailed {
            address: address.to_string(),
            attempts,
            source: last_error
                .unwrap_or_else(|| io::Error::other("no connect attempts configured")),
        })
    }

    /// Connect, then remember the printer only if that worked.
    pub fn connect_and_save(&mut self, address: &str, name: &str) -> PrintResult<()> {
        self.connect(address)?;
        self.save_printer(address, name)
    }

    /// Close the link and return to `Disconnected`.
    ///
    /// Close errors are logged and dropped; there is nothing to do about them.
    pub fn disconnect(&mut self) {
        self.drop_link();
        if !matches!(self.state, ConnectionState::Disconnected) {
            debug!("Disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Make sure a fresh connection is open, reconnecting to the saved
    /// printer when needed.
    #[instrument(skip(self))]
    pub fn ensure_connected(&mut self) -> PrintResult<()> {
        if let ConnectionState::Connected { last_activity, .. } = &self.state {
            let idle = self.clock.now().saturating_duration_since(*last_activity);
            let link_open = self.link.as_ref().is_some_and(|link| link.is_open());

            if idle > self.config.stale_after() {
                info!(idle_secs = idle.as_secs(), "Connection idle too long, reconnecting");
                self.disconnect();
            } else if !link_open {
                info!("Link reported closed, reconnecting");
                self.disconnect();
            } else {
                return Ok(());
            }
        }

        let address = match &self.saved {
            Some(saved) => saved.address.clone(),
            None => return Err(PrinterError::NoSavedDevice),
        };
        self.connect(&address)?;
        self.touch();
        Ok(())
    }

    // ========================================================================
    // SAVED PRINTER
    // ========================================================================

    pub fn save_printer(&mut self, address: &str, name: &str) -> PrintResult<()> {
        let saved = SavedPrinter::new(address, name);
        saved.save(&mut self.store)?;
        info!(address, name, "Saved printer");
        self.saved = Some(saved);
        Ok(())
    }

    pub fn clear_saved_printer(&mut self) -> PrintResult<()> {
        SavedPrinter::clear(&mut self.store)?;
        self.saved = None;
        Ok(())
    }

    // ========================================================================
    // WRITING
    // ========================================================================

    /// Write `data` to the open link and flush.
    ///
    /// A failure drops the connection before it is returned.
    pub fn write(&mut self, data: &[u8]) -> PrintResult<()> {
        if !self.is_connected() {
            return Err(PrinterError::NotConnected);
        }
        let link = self.link.as_mut().ok_or(PrinterError::NotConnected)?;

        match write_chunked(
            link,
            data,
            self.config.chunk_size,
            self.config.chunk_delay(),
            &self.clock,
        ) {
            Ok(()) => {
                self.touch();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Write failed, dropping connection");
                self.disconnect();
                Err(PrinterError::ConnectionLost(e))
            }
        }
    }

    /// Send `data`, connecting to the saved printer if needed.
    ///
    /// The whole ensure-connected + write path is retried once (by default)
    /// since the first failure is usually a dead link that a reconnect fixes.
    /// If every pass fails the result is
    /// [`PrinterError::AllAttemptsExhausted`] wrapping the last cause.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub fn send_raw(&mut self, data: &[u8]) -> PrintResult<()> {
        let attempts = self.config.send_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.try_send(data) {
                Ok(()) => {
                    info!(attempt, "Print job sent");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Print attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(PrinterError::AllAttemptsExhausted {
            attempts,
            last: Box::new(last_error.unwrap_or(PrinterError::NotConnected)),
        })
    }

    fn try_send(&mut self, data: &[u8]) -> PrintResult<()> {
        self.ensure_connected()?;
        self.write(data)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn touch(&mut self) {
        let now = self.clock.now();
        if let ConnectionState::Connected { last_activity, .. } = &mut self.state {
            *last_activity = now;
        }
    }

    /// Close the link without touching the state.
    fn drop_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.flush().and_then(|_| link.close()) {
                warn!(error = %e, "Error closing printer link");
            }
        }
    }

    fn is_saved_address(&self, address: &str) -> bool {
        self.saved
            .as_ref()
            .is_some_and(|s| s.address.eq_ignore_ascii_case(address))
    }

    fn device_name(&self, address: &str) -> String {
        let paired = self.adapter.paired_devices().unwrap_or_default();
        paired
            .into_iter()
            .find(|(a, _)| a.eq_ignore_ascii_case(address))
            .map(|(_, name)| name)
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                self.saved
                    .as_ref()
                    .filter(|s| s.address.eq_ignore_ascii_case(address))
                    .map(|s| s.name.clone())
            })
            .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string())
    }
}

impl<A: Adapter, S: KeyValueStore, C: Clock> Drop for PrinterManager<A, S, C> {
    fn drop(&mut self) {
        self.drop_link();
    }
}

/// Write `data` in chunks of at most `chunk_size` bytes, then flush.
///
/// Small SPP printers have tiny receive buffers; pacing large jobs keeps them
/// from overflowing.
fn write_chunked<W: Write, C: Clock>(
    out: &mut W,
    data: &[u8],
    chunk_size: usize,
    chunk_delay: Duration,
    clock: &C,
) -> io::Result<()> {
    if chunk_size == 0 || data.len() <= chunk_size {
        out.write_all(data)?;
    } else {
        for (i, chunk) in data.chunks(chunk_size).enumerate() {
            if i > 0 {
                clock.sleep(chunk_delay);
            }
            out.write_all(chunk)?;
        }
    }
    out.flush()
}

// ============================================================================
// SHARED ACCESS
// ============================================================================

/// A [`PrinterManager`] behind a mutex, for callers on several threads.
///
/// Each call holds the lock for the whole operation, so connects and prints
/// never interleave.
pub struct SharedPrinter<A: Adapter, S: KeyValueStore, C: Clock = SystemClock> {
    inner: Arc<Mutex<PrinterManager<A, S, C>>>,
}

impl<A: Adapter, S: KeyValueStore, C: Clock> Clone for SharedPrinter<A, S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Adapter, S: KeyValueStore, C: Clock> SharedPrinter<A, S, C> {
    pub fn new(manager: PrinterManager<A, S, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// Lock the manager for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, PrinterManager<A, S, C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn send_raw(&self, data: &[u8]) -> PrintResult<()> {
        self.lock().send_raw(data)
    }

    pub fn connect_and_save(&self, address: &str, name: &str) -> PrintResult<()> {
        self.lock().connect_and_save(address, name)
    }

    pub fn disconnect(&self) {
        self.lock().disconnect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::Channel;
    use crate::transport::mock::{FakeClock, MockAdapter, MockHandle};

    const MAC: &str = "00:11:22:33:44:55";

    type TestManager = PrinterManager<MockAdapter, MemoryStore, FakeClock>;

    fn manager(adapter: MockAdapter, store: MemoryStore) -> (TestManager, MockHandle, FakeClock) {
        let handle = adapter.handle();
        let clock = FakeClock::new();
        let manager =
            PrinterManager::with_clock(adapter, store, clock.clone(), ConnectionConfig::default())
                .unwrap();
        (manager, handle, clock)
    }

    fn saved_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        SavedPrinter::new(MAC, "RPP02N").save(&mut store).unwrap();
        store
    }

    #[test]
    fn test_list_devices_saved_first() {
        let adapter = MockAdapter::new()
            .with_device("AA:AA:AA:AA:AA:AA", "Headset")
            .with_device(MAC, "RPP02N")
            .with_device("BB:BB:BB:BB:BB:BB", "");
        let (m, _, _) = manager(adapter, saved_store());

        let devices = m.list_devices().unwrap();
        assert_eq!(devices[0].address, MAC);
        assert!(devices[0].is_saved);
        assert_eq!(devices[1].name, "Headset");
        assert_eq!(devices[2].name, "Unknown");
        assert!(devices[1..].iter().all(|d| !d.is_saved));
    }

    #[test]
    fn test_list_devices_requires_permission() {
        let (m, handle, _) = manager(MockAdapter::new(), MemoryStore::new());
        handle.set_permission(false);
        assert!(matches!(m.list_devices(), Err(PrinterError::PermissionDenied)));
    }

    #[test]
    fn test_list_devices_bluetooth_off() {
        let (m, handle, _) = manager(MockAdapter::new(), MemoryStore::new());
        handle.set_enabled(false);
        assert!(matches!(m.list_devices(), Err(PrinterError::BluetoothDisabled)));
    }

    #[test]
    fn test_connect_first_attempt() {
        let adapter = MockAdapter::new().with_device(MAC, "RPP02N");
        let (mut m, handle, clock) = manager(adapter, MemoryStore::new());

        m.connect(MAC).unwrap();

        assert_eq!(handle.opens(), vec![(MAC.to_string(), Channel::Negotiated)]);
        assert_eq!(handle.discovery_cancels(), 1);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(300)]);
        assert_eq!(m.connected_device().unwrap().name, "RPP02N");
    }

    #[test]
    fn test_connect_falls_back_to_fixed_channel() {
        let (mut m, handle, _) = manager(MockAdapter::new(), MemoryStore::new());
        handle.fail_next_opens(2);

        m.connect(MAC).unwrap();

        let channels: Vec<Channel> = handle.opens().into_iter().map(|(_, c)| c).collect();
        assert_eq!(
            channels,
            vec![Channel::Negotiated, Channel::Negotiated, Channel::Fixed(1)]
        );
        assert!(m.is_connected());
    }

    #[test]
    fn test_connect_invalid_address() {
        let (mut m, handle, _) = manager(MockAdapter::new(), MemoryStore::new());
        assert!(matches!(
            m.connect("not-a-mac"),
            Err(PrinterError::DeviceNotFound(_))
        ));
        assert!(handle.opens().is_empty());
    }

    #[test]
    fn test_connect_without_permission() {
        let (mut m, handle, _) = manager(MockAdapter::new(), MemoryStore::new());
        handle.set_permission(false);
        assert!(matches!(m.connect(MAC), Err(PrinterError::PermissionDenied)));
        assert!(handle.opens().is_empty());
    }

    #[test]
    fn test_connect_replaces_existing_link() {
        let (mut m, handle, _) = manager(MockAdapter::new(), MemoryStore::new());
        m.connect(MAC).unwrap();
        m.connect("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(handle.closes(), 1);
        assert_eq!(m.connected_device().unwrap().address, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_connect_and_save_only_on_success() {
        let (mut m, handle, _) = manager(MockAdapter::new(), MemoryStore::new());
        handle.fail_all_opens();
        assert!(m.connect_and_save(MAC, "RPP02N").is_err());
        assert!(m.saved_printer().is_none());
        assert_eq!(SavedPrinter::load(m.store_mut()).unwrap(), None);
    }

    #[test]
    fn test_connect_and_save_persists() {
        let (mut m, _, _) = manager(MockAdapter::new(), MemoryStore::new());
        m.connect_and_save(MAC, "RPP02N").unwrap();
        assert_eq!(m.saved_printer(), Some(&SavedPrinter::new(MAC, "RPP02N")));
        assert_eq!(
            SavedPrinter::load(m.store_mut()).unwrap(),
            Some(SavedPrinter::new(MAC, "RPP02N"))
        );
    }

    #[test]
    fn test_saved_printer_loaded_at_construction() {
        let (m, _, _) = manager(MockAdapter::new(), saved_store());
        assert_eq!(m.saved_printer().unwrap().name, "RPP02N");
    }

    #[test]
    fn test_clear_saved_printer() {
        let (mut m, _, _) = manager(MockAdapter::new(), saved_store());
        m.clear_saved_printer().unwrap();
        assert!(m.saved_printer().is_none());
        assert!(matches!(m.ensure_connected(), Err(PrinterError::NoSavedDevice)));
    }

    #[test]
    fn test_disconnect_resets_state() {
        let (mut m, handle, _) = manager(MockAdapter::new(), MemoryStore::new());
        m.connect(MAC).unwrap();
        m.disconnect();
        assert_eq!(m.state(), &ConnectionState::Disconnected);
        assert_eq!(handle.closes(), 1);
        // idempotent
        m.disconnect();
        assert_eq!(handle.closes(), 1);
    }

    #[test]
    fn test_write_requires_connection() {
        let (mut m, _, _) = manager(MockAdapter::new(), MemoryStore::new());
        assert!(matches!(m.write(b"x"), Err(PrinterError::NotConnected)));
    }

    #[test]
    fn test_write_failure_disconnects() {
        let (mut m, handle, _) = manager(MockAdapter::new(), MemoryStore::new());
        m.connect(MAC).unwrap();
        handle.fail_next_writes(1);

        assert!(matches!(m.write(b"x"), Err(PrinterError::ConnectionLost(_))));
        assert!(!m.is_connected());
    }

    #[test]
    fn test_write_updates_activity() {
        let (mut m, _, clock) = manager(MockAdapter::new(), MemoryStore::new());
        m.connect(MAC).unwrap();
        clock.advance(Duration::from_secs(60));
        m.write(b"x").unwrap();

        match m.state() {
            ConnectionState::Connected { last_activity, .. } => {
                assert_eq!(*last_activity, clock.now());
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_ensure_connected_fresh_link_is_reused() {
        let (mut m, handle, clock) = manager(MockAdapter::new(), saved_store());
        m.ensure_connected().unwrap();
        clock.advance(Duration::from_secs(4 * 60));
        m.ensure_connected().unwrap();
        assert_eq!(handle.opens().len(), 1);
    }

    #[test]
    fn test_ensure_connected_reconnects_closed_link() {
        let (mut m, handle, _) = manager(MockAdapter::new(), saved_store());
        m.ensure_connected().unwrap();
        handle.drop_link();
        m.ensure_connected().unwrap();
        assert_eq!(handle.opens().len(), 2);
    }

    #[test]
    fn test_large_write_is_chunked() {
        let config = ConnectionConfig {
            chunk_size: 4,
            ..Default::default()
        };
        let adapter = MockAdapter::new();
        let handle = adapter.handle();
        let clock = FakeClock::new();
        let mut m =
            PrinterManager::with_clock(adapter, MemoryStore::new(), clock.clone(), config).unwrap();
        m.connect(MAC).unwrap();

        m.write(b"0123456789").unwrap();

        assert_eq!(handle.written(), b"0123456789".to_vec());
        // 300ms connect delay, then two gaps between three chunks
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(300),
                Duration::from_millis(2),
                Duration::from_millis(2)
            ]
        );
    }

    #[test]
    fn test_send_raw_no_saved_device() {
        let (mut m, _, _) = manager(MockAdapter::new(), MemoryStore::new());
        match m.send_raw(b"x") {
            Err(PrinterError::AllAttemptsExhausted { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, PrinterError::NoSavedDevice));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_shared_printer_serializes_access() {
        let (m, handle, _) = manager(MockAdapter::new(), saved_store());
        let shared = SharedPrinter::new(m);

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.send_raw(&[b'a' + i as u8; 8]))
            })
            .collect();
        for t in threads {
            t.join().unwrap().unwrap();
        }

        let written = handle.written();
        assert_eq!(written.len(), 32);
        // each job lands as one contiguous run
        for job in written.chunks(8) {
            assert!(job.iter().all(|b| *b == job[0]));
        }
        assert_eq!(handle.opens().len(), 1);
    }
}
