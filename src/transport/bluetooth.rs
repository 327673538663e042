//! # Bluetooth RFCOMM Adapter
//!
//! [`Adapter`] implementation for Linux, driving BlueZ through its command
//! line tools and talking to the printer over an RFCOMM TTY.
//!
//! ## Bluetooth Setup
//!
//! The printer must be paired once:
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# scan on
//! # Look for the printer, e.g. "RPP02N" or "BlueTooth Printer"
//! [bluetooth]# pair 00:11:62:XX:XX:XX
//! ```
//!
//! Binding to `/dev/rfcommN` is done on demand by [`RfcommAdapter::open`]
//! and needs root (or `CAP_NET_ADMIN`).
//!
//! ## Permission
//!
//! [`RfcommAdapter::has_permission`] holds for root, for members of the
//! `bluetooth` group (the group BlueZ's D-Bus policy admits), and for users
//! who can already write an existing `/dev/rfcomm*` node. Listing paired
//! devices needs nothing more; a later bind without root fails in `open`.
//!
//! ## Channels
//!
//! - [`Channel::Negotiated`]: reuse an existing binding for the address, or
//!   ask the device which channel its Serial Port service listens on
//!   (`sdptool search SP`) and bind that.
//! - [`Channel::Fixed`]: bind the given channel without asking. Many cheap
//!   printers publish no service record but answer on channel 1.
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode so binary commands pass through
//! unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, etc. cleared
//! - **No output processing**: OPOST cleared (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **No echo, non-canonical**: ECHO, ECHONL, ICANON cleared

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Adapter, Channel, Link};

/// RFCOMM device number used for on-demand bindings (`/dev/rfcomm0`)
pub const DEFAULT_RFCOMM_INDEX: u8 = 0;

/// How long to wait for udev to create the device node after binding
const NODE_WAIT: Duration = Duration::from_millis(500);

/// Poll interval while waiting for the device node
const NODE_POLL: Duration = Duration::from_millis(50);

/// Group admitted to BlueZ's D-Bus interface on common distributions
const BLUETOOTH_GROUP: &str = "bluetooth";

/// # RFCOMM Adapter
///
/// ## Example
///
/// ```no_run
/// use struk::store::JsonFileStore;
/// use struk::transport::{PrinterManager, RfcommAdapter};
///
/// let store = JsonFileStore::open("struk.json")?;
/// let mut printer = PrinterManager::new(RfcommAdapter::default(), store)?;
/// printer.connect_and_save("00:11:62:AA:BB:CC", "RPP02N")?;
/// printer.send_raw(b"\x1B\x40Hello\n")?;
/// # Ok::<(), struk::PrinterError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RfcommAdapter {
    index: u8,
}

impl RfcommAdapter {
    /// Use `/dev/rfcomm{index}` for bindings.
    pub fn new(index: u8) -> Self {
        Self { index }
    }

    fn device_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/rfcomm{}", self.index))
    }

    /// Bind `mac` on `channel` to this adapter's device node and wait for it.
    fn bind(&self, mac: &str, channel: u8) -> io::Result<PathBuf> {
        let path = self.device_path();

        // A stale binding on our index would make bind fail
        match Command::new("rfcomm")
            .arg("release")
            .arg(self.index.to_string())
            .output()
        {
            Ok(output) if !output.status.success() => debug!(
                index = self.index,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "rfcomm release failed"
            ),
            Ok(_) => {}
            Err(e) => debug!(index = self.index, error = %e, "rfcomm release failed"),
        }

        info!(mac, channel, device = %path.display(), "Binding RFCOMM");
        let output = Command::new("rfcomm")
            .arg("bind")
            .arg(self.index.to_string())
            .arg(mac)
            .arg(channel.to_string())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(io::Error::other(format!(
                "rfcomm bind failed: {}",
                stderr.trim()
            )));
        }

        let mut waited = Duration::ZERO;
        while !path.exists() {
            if waited >= NODE_WAIT {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("Device {} was not created", path.display()),
                ));
            }
            thread::sleep(NODE_POLL);
            waited += NODE_POLL;
        }
        Ok(path)
    }
}

impl Default for RfcommAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_RFCOMM_INDEX)
    }
}

impl Adapter for RfcommAdapter {
    type Link = RfcommLink;

    fn has_permission(&self) -> bool {
        is_root() || in_group(BLUETOOTH_GROUP) || rfcomm_nodes().iter().any(|p| is_writable(p))
    }

    fn is_enabled(&self) -> bool {
        match Command::new("bluetoothctl").arg("show").output() {
            Ok(output) => String::from_utf8_lossy(&output.stdout).contains("Powered: yes"),
            Err(e) => {
                debug!(error = %e, "bluetoothctl show failed");
                false
            }
        }
    }

    fn paired_devices(&self) -> io::Result<Vec<(String, String)>> {
        // BlueZ 5.65+ spells it "devices Paired", older releases "paired-devices"
        let output = Command::new("bluetoothctl")
            .args(["devices", "Paired"])
            .output()?;
        let mut devices = parse_device_lines(&String::from_utf8_lossy(&output.stdout));
        if devices.is_empty() {
            let output = Command::new("bluetoothctl").arg("paired-devices").output()?;
            devices = parse_device_lines(&String::from_utf8_lossy(&output.stdout));
        }
        Ok(devices)
    }

    fn cancel_discovery(&self) {
        if let Err(e) = Command::new("bluetoothctl").args(["scan", "off"]).output() {
            debug!(error = %e, "Could not stop discovery");
        }
    }

    fn open(&mut self, address: &str, channel: Channel) -> io::Result<RfcommLink> {
        let path = match channel {
            Channel::Negotiated => match find_rfcomm_for_mac(address)? {
                Some(existing) => existing,
                None => {
                    let ch = lookup_spp_channel(address)?.ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::NotFound,
                            format!("{} advertises no serial port service", address),
                        )
                    })?;
                    self.bind(address, ch)?
                }
            },
            Channel::Fixed(ch) => self.bind(address, ch)?,
        };
        RfcommLink::open(path)
    }
}

// ============================================================================
// LINK
// ============================================================================

/// Raw-mode RFCOMM TTY.
#[derive(Debug)]
pub struct RfcommLink {
    file: Option<File>,
    path: PathBuf,
}

impl RfcommLink {
    /// Open an RFCOMM TTY for writing and put it in raw mode.
    ///
    /// ## Errors
    ///
    /// - The device doesn't exist
    /// - Permission denied (may need root or the dialout group)
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(device: P) -> io::Result<Self> {
        let path = device.as_ref().to_path_buf();

        let file = OpenOptions::new().write(true).open(&path).map_err(|e| {
            io::Error::new(e.kind(), format!("Failed to open {}: {}", path.display(), e))
        })?;

        #[cfg(unix)]
        configure_tty_raw(file.as_raw_fd())?;

        debug!(device = %path.display(), "Opened RFCOMM TTY");
        Ok(Self {
            file: Some(file),
            path,
        })
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "link closed"))
    }
}

impl Write for RfcommLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

impl Link for RfcommLink {
    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    /// The node disappears when the kernel tears the binding down.
    fn is_open(&self) -> bool {
        self.file.is_some() && self.path.exists()
    }
}

/// Configure a file descriptor for raw TTY mode.
///
/// Note: IXON/IXOFF/IXANY disable XON/XOFF software flow control. This is
/// critical because 0x11 and 0x13 appear in command parameters.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> io::Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(io::Error::other(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(io::Error::other(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

// ============================================================================
// BLUEZ HELPERS
// ============================================================================

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Checks `/proc/net/rfcomm` and falls back to `rfcomm -a`.
pub fn find_rfcomm_for_mac(mac: &str) -> io::Result<Option<PathBuf>> {
    if let Ok(contents) = fs::read_to_string("/proc/net/rfcomm") {
        if let Some(path) = parse_rfcomm_binding(&contents, mac) {
            return Ok(Some(path));
        }
    }

    let output = match Command::new("rfcomm").arg("-a").output() {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("rfcomm tool not installed");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    Ok(parse_rfcomm_binding(
        &String::from_utf8_lossy(&output.stdout),
        mac,
    ))
}

/// Ask the device which RFCOMM channel its Serial Port service uses.
pub fn lookup_spp_channel(mac: &str) -> io::Result<Option<u8>> {
    let output = Command::new("sdptool")
        .args(["search", "--bdaddr", mac, "SP"])
        .output()?;
    Ok(parse_sdp_channel(&String::from_utf8_lossy(&output.stdout)))
}

/// Pick the bound device for `mac` out of `rfcomm -a` style output
/// (`rfcomm0: XX:XX:XX:XX:XX:XX channel 1 clean`). Only existing nodes count.
fn parse_rfcomm_binding(listing: &str, mac: &str) -> Option<PathBuf> {
    let mac_upper = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(|dev| PathBuf::from(format!("/dev/{}", dev.trim())))
        .find(|path| path.exists())
}

/// Extract the first `Channel: N` from `sdptool search` output.
fn parse_sdp_channel(output: &str) -> Option<u8> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Channel:"))
        .find_map(|rest| rest.trim().parse().ok())
}

/// Parse `Device XX:XX:XX:XX:XX:XX Name With Spaces` lines.
fn parse_device_lines(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (address, name) = rest.split_once(' ').unwrap_or((rest, ""));
            super::is_valid_mac(address).then(|| (address.to_string(), name.trim().to_string()))
        })
        .collect()
}

fn rfcomm_nodes() -> Vec<PathBuf> {
    fs::read_dir("/dev")
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("rfcomm"))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(unix)]
fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

/// Whether the process's effective or supplementary groups include `name`.
#[cfg(unix)]
fn in_group(name: &str) -> bool {
    use std::ffi::CString;

    let Ok(c_name) = CString::new(name) else {
        return false;
    };
    let group = unsafe { libc::getgrnam(c_name.as_ptr()) };
    if group.is_null() {
        return false;
    }
    let gid = unsafe { (*group).gr_gid };

    let count = unsafe { libc::getgroups(0, std::ptr::null_mut()) };
    let mut groups = vec![0 as libc::gid_t; usize::try_from(count).unwrap_or(0)];
    let filled = unsafe { libc::getgroups(count.max(0), groups.as_mut_ptr()) };
    groups.truncate(usize::try_from(filled).unwrap_or(0));

    has_gid(gid, unsafe { libc::getegid() }, &groups)
}

#[cfg(not(unix))]
fn in_group(_name: &str) -> bool {
    false
}

#[cfg(unix)]
fn has_gid(gid: libc::gid_t, egid: libc::gid_t, supplementary: &[libc::gid_t]) -> bool {
    egid == gid || supplementary.contains(&gid)
}

#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    match CString::new(path.as_os_str().as_bytes()) {
        Ok(c_path) => unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 },
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_writable(_path: &Path) -> bool {
    false
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_path() {
        assert_eq!(
            RfcommAdapter::default().device_path(),
            PathBuf::from("/dev/rfcomm0")
        );
        assert_eq!(RfcommAdapter::new(3).device_path(), PathBuf::from("/dev/rfcomm3"));
    }

    #[test]
    fn test_parse_device_lines() {
        let output = "Device 00:11:22:33:44:55 RPP02N\n\
                      Device AA:BB:CC:DD:EE:FF BlueTooth Printer\n\
                      Device 11:22:33:44:55:66\n\
                      [CHG] Controller 99:99:99:99:99:99 Discovering: no\n";
        assert_eq!(
            parse_device_lines(output),
            vec![
                ("00:11:22:33:44:55".to_string(), "RPP02N".to_string()),
                ("AA:BB:CC:DD:EE:FF".to_string(), "BlueTooth Printer".to_string()),
                ("11:22:33:44:55:66".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_device_lines_skips_garbage() {
        assert!(parse_device_lines("No default controller available\n").is_empty());
        assert!(parse_device_lines("Device not-a-mac Foo\n").is_empty());
    }

    #[test]
    fn test_parse_sdp_channel() {
        let output = "Searching for SP on 00:11:22:33:44:55 ...\n\
                      Service Name: SerialPort\n\
                      Protocol Descriptor List:\n  \"L2CAP\" (0x0100)\n  \"RFCOMM\" (0x0003)\n    Channel: 2\n";
        assert_eq!(parse_sdp_channel(output), Some(2));
        assert_eq!(parse_sdp_channel("Failed to connect to SDP server"), None);
    }

    #[test]
    fn test_parse_rfcomm_binding_requires_node() {
        // /dev/rfcomm250 will not exist on a test machine
        let listing = "rfcomm250: 00:11:22:33:44:55 channel 1 clean\n";
        assert_eq!(parse_rfcomm_binding(listing, "00:11:22:33:44:55"), None);
        assert_eq!(parse_rfcomm_binding(listing, "AA:BB:CC:DD:EE:FF"), None);
    }

    #[test]
    fn test_link_open_missing_device() {
        let err = RfcommLink::open("/dev/rfcomm-does-not-exist").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_closed_link_rejects_writes() {
        let file = tempfile::tempfile().unwrap();
        let mut link = RfcommLink {
            file: Some(file),
            path: PathBuf::from("/nonexistent"),
        };
        link.close().unwrap();
        assert!(!link.is_open());
        assert_eq!(link.write(b"x").unwrap_err().kind(), io::ErrorKind::NotConnected);
    }

    #[cfg(unix)]
    #[test]
    fn test_group_membership() {
        assert!(has_gid(110, 110, &[]));
        assert!(has_gid(110, 1000, &[4, 110, 1000]));
        assert!(!has_gid(110, 1000, &[4, 24, 1000]));
    }

    #[test]
    fn test_unknown_group_grants_nothing() {
        assert!(!in_group("struk-no-such-group"));
        assert!(!in_group("nul\0byte"));
    }

    // Note: open/bind tests require actual hardware.
}
