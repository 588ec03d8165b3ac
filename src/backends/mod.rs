//! Platform transport backends.
//!
//! Each operating system gets its own implementation of [`Transport`], the
//! primitive capability set the rest of the crate is written against:
//! write an output report, read an input report with a timeout, exchange
//! feature reports, query descriptor strings. Session teardown is RAII —
//! dropping a transport releases the OS handle — so there is no `close` in
//! the trait; [`HidDevice`](crate::HidDevice) drops the box when it closes.
//!
//! Selection happens at build time via `cfg(target_os)`:
//! - **Linux** — `/dev/hidrawN` device files ([`linux`])
//! - **Windows** — HID device interfaces with overlapped I/O (`windows`)
//! - anything else — a stub whose operations fail `Unsupported`
//!
//! The [`mock`] backend is always compiled; it backs the test suite and is
//! exported for consumers that want to exercise device logic without
//! hardware.

use crate::error::HidResult;
use crate::info::DeviceInfo;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "linux")]
use linux as platform;

#[cfg(target_os = "windows")]
pub mod windows;
#[cfg(target_os = "windows")]
use windows as platform;

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
mod unsupported;
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
use unsupported as platform;

pub mod mock;

/// Which descriptor string a [`Transport::read_string`] call wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringQuery {
    Manufacturer,
    Product,
    SerialNumber,
    /// A string descriptor by raw index (USB iString values).
    Indexed(i32),
}

/// Primitive operations a platform backend supplies for one open session.
///
/// Buffer conventions follow the host HID driver's:
/// - `write`: `data[0]` is the report ID (`0x00` when the device has no
///   numbered reports), the rest is payload.
/// - `send_feature_report`: same framing, already assembled by the caller.
/// - `get_feature_report`: the caller seeds `buf[0]` with the report ID;
///   the backend overwrites `buf` with what the device returned and reports
///   the received length.
/// - `read`: `timeout_ms < 0` blocks indefinitely, `0` polls once, `> 0`
///   waits at most that long. Returns `Ok(0)` when no report arrived.
pub trait Transport: Send {
    fn write(&mut self, data: &[u8]) -> HidResult<usize>;

    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> HidResult<usize>;

    fn send_feature_report(&mut self, data: &[u8]) -> HidResult<usize>;

    fn get_feature_report(&mut self, buf: &mut [u8]) -> HidResult<usize>;

    fn read_string(&mut self, query: StringQuery) -> HidResult<String>;
}

/// Enumerate HID interfaces via the build-selected platform backend.
pub(crate) fn enumerate() -> HidResult<Vec<DeviceInfo>> {
    platform::enumerate()
}

/// Open a platform transport session by device path.
pub(crate) fn open_path(path: &str) -> HidResult<Box<dyn Transport>> {
    platform::open_path(path)
}
