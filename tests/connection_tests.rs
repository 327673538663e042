//! # Connection Scenarios
//!
//! The printer manager driven end to end against the mock adapter and a fake
//! clock: retry timing, staleness and recovery from a dead link.

use std::time::Duration;

use pretty_assertions::assert_eq;
use struk::store::{KeyValueStore, MemoryStore, SavedPrinter};
use struk::transport::mock::{FakeClock, MockAdapter, MockHandle};
use struk::transport::{Channel, ConnectionState};
use struk::{ConnectionConfig, PrinterError, PrinterManager};

const MAC: &str = "00:11:22:33:44:55";

type Manager = PrinterManager<MockAdapter, MemoryStore, FakeClock>;

fn manager_with(store: MemoryStore) -> (Manager, MockHandle, FakeClock) {
    let adapter = MockAdapter::new().with_device(MAC, "RPP02N");
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
fn connect_with_all_attempts_failing() {
    let (mut printer, handle, clock) = manager_with(MemoryStore::new());
    handle.fail_all_opens();

    let err = printer.connect(MAC).unwrap_err();

    assert_eq!(handle.opens().len(), 3);
    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_millis(300),
            Duration::from_millis(500),
            Duration::from_millis(500),
        ]
    );
    match err {
        PrinterError::ConnectFailed {
            address,
            attempts,
            source,
        } => {
            assert_eq!(address, MAC);
            assert_eq!(attempts, 3);
            // The mock numbers its failures; the last one is reported
            assert!(source.to_string().contains("#3"), "got {source}");
        }
        other => panic!("expected ConnectFailed, got {other:?}"),
    }
    assert_eq!(*printer.state(), ConnectionState::Disconnected);
}

#[test]
fn third_attempt_uses_fixed_channel() {
    let (mut printer, handle, _clock) = manager_with(MemoryStore::new());
    handle.fail_next_opens(2);

    printer.connect(MAC).unwrap();

    let channels: Vec<Channel> = handle.opens().into_iter().map(|(_, c)| c).collect();
    assert_eq!(
        channels,
        vec![Channel::Negotiated, Channel::Negotiated, Channel::Fixed(1)]
    );
    assert!(printer.is_connected());
}

#[test]
fn stale_connection_reconnects_before_print() {
    let (mut printer, handle, clock) = manager_with(saved_store());
    printer.connect(MAC).unwrap();

    clock.advance(Duration::from_secs(6 * 60));
    printer.ensure_connected().unwrap();

    assert_eq!(handle.closes(), 1);
    assert_eq!(handle.opens().len(), 2);
    assert!(printer.is_connected());
}

#[test]
fn recent_connection_is_reused() {
    let (mut printer, handle, clock) = manager_with(saved_store());
    printer.connect(MAC).unwrap();

    clock.advance(Duration::from_secs(4 * 60));
    printer.ensure_connected().unwrap();

    assert_eq!(handle.closes(), 0);
    assert_eq!(handle.opens().len(), 1);
}

#[test]
fn send_recovers_from_dead_link() {
    let (mut printer, handle, _clock) = manager_with(saved_store());
    printer.connect(MAC).unwrap();
    handle.fail_next_writes(1);

    printer.send_raw(b"HELLO\n").unwrap();

    assert_eq!(handle.written(), b"HELLO\n");
    assert_eq!(handle.opens().len(), 2);
    assert_eq!(handle.closes(), 1);
    assert!(printer.is_connected());
}

#[test]
fn send_without_saved_printer() {
    let (mut printer, handle, _clock) = manager_with(MemoryStore::new());

    let err = printer.send_raw(b"x").unwrap_err();

    match err {
        PrinterError::AllAttemptsExhausted { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last, PrinterError::NoSavedDevice));
        }
        other => panic!("expected AllAttemptsExhausted, got {other:?}"),
    }
    assert!(handle.opens().is_empty());
}

#[test]
fn send_gives_up_when_printer_unreachable() {
    let (mut printer, handle, _clock) = manager_with(saved_store());
    handle.fail_all_opens();

    let err = printer.send_raw(b"x").unwrap_err();

    assert!(matches!(err, PrinterError::AllAttemptsExhausted { attempts: 2, .. }));
    // Two passes of three connect attempts each
    assert_eq!(handle.opens().len(), 6);
    assert!(handle.written().is_empty());
}

#[test]
fn large_jobs_are_chunked() {
    let (mut printer, handle, clock) = manager_with(saved_store());
    printer.connect(MAC).unwrap();
    let data = vec![b'A'; 1300];

    printer.send_raw(&data).unwrap();

    assert_eq!(handle.written(), data);
    // 300ms connect delay, then two pauses between three chunks
    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_millis(300),
            Duration::from_millis(2),
            Duration::from_millis(2),
        ]
    );
}

#[test]
fn saved_printer_survives_new_manager() {
    let (mut printer, _handle, _clock) = manager_with(MemoryStore::new());
    printer.connect_and_save(MAC, "RPP02N").unwrap();
    let store = printer.store_mut().clone();
    drop(printer);

    let raw = store.get("saved_printer").unwrap().unwrap();
    assert!(raw.contains("\"savedAddress\":\"00:11:22:33:44:55\""));

    let (printer, _handle, _clock) = manager_with(store);
    assert_eq!(printer.saved_printer().map(|s| s.name.as_str()), Some("RPP02N"));
}

#[test]
fn device_list_puts_saved_printer_first() {
    let adapter = MockAdapter::new()
        .with_device("AA:AA:AA:AA:AA:AA", "Headset")
        .with_device(MAC, "RPP02N");
    let printer = PrinterManager::with_clock(
        adapter,
        saved_store(),
        FakeClock::new(),
        ConnectionConfig::default(),
    )
    .unwrap();

    let devices = printer.list_devices().unwrap();

    assert_eq!(devices[0].address, MAC);
    assert!(devices[0].is_saved);
    assert_eq!(devices[1].name, "Headset");
    assert!(!devices[1].is_saved);
}

#[test]
fn permission_checked_before_anything_else() {
    let (mut printer, handle, _clock) = manager_with(MemoryStore::new());
    handle.set_permission(false);

    assert!(matches!(printer.list_devices(), Err(PrinterError::PermissionDenied)));
    assert!(matches!(printer.connect(MAC), Err(PrinterError::PermissionDenied)));
    assert!(handle.opens().is_empty());
}
