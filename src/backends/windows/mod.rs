#![cfg(target_os = "windows")]

//! Windows backend: HID device interfaces.
//!
//! - [`hid_discovery`] — enumeration via the HID device-interface class
//!   (`CM_Get_Device_Interface_ListW`), with identity and capabilities
//!   queried through `HidD_GetAttributes` / `HidP_GetCaps` on zero-access
//!   handles.
//! - [`hid_device`] — the transport: an overlapped-I/O file handle, so
//!   reads can honor the blocking / poll-once / N-milliseconds timeout
//!   contract, plus `HidD_SetFeature` / `HidD_GetFeature` for feature
//!   reports and the `HidD_Get*String` family for descriptor strings.

pub mod hid_device;
pub mod hid_discovery;

use crate::backends::Transport;
use crate::error::HidResult;
use crate::info::DeviceInfo;

pub(crate) fn enumerate() -> HidResult<Vec<DeviceInfo>> {
    hid_discovery::enumerate()
}

pub(crate) fn open_path(path: &str) -> HidResult<Box<dyn Transport>> {
    Ok(Box::new(hid_device::WinHidTransport::open(path)?))
}

/// NUL-terminated UTF-16 for Win32 calls.
pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    std::ffi::OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// UTF-16 buffer (NUL-terminated or full) to an owned string; `None` when
/// empty.
pub(crate) fn from_wide(buf: &[u16]) -> Option<String> {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    if len == 0 {
        return None;
    }
    Some(String::from_utf16_lossy(&buf[..len]))
}
