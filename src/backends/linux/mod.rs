#![cfg(target_os = "linux")]

//! Linux backend: `/dev/hidrawN` device files.
//!
//! Two halves:
//! - [`hidraw`] — the [`Transport`](crate::backends::Transport)
//!   implementation over an open hidraw file descriptor: `poll(2)`-gated
//!   reads, `write(2)` output reports, `HIDIOCSFEATURE`/`HIDIOCGFEATURE`
//!   ioctls for feature reports.
//! - [`discovery`] — enumeration over `/sys/class/hidraw`, which needs no
//!   permission to open any device node: identity comes from the kernel's
//!   uevent attributes and the report descriptor sysfs file.
//!
//! Device permissions are a deployment concern: distributions usually
//! require a udev rule before unprivileged users may open a hidraw node.
//! Opening without one surfaces as `AccessDenied`.

pub mod discovery;
pub mod hidraw;

use crate::backends::Transport;
use crate::error::HidResult;
use crate::info::DeviceInfo;

pub(crate) fn enumerate() -> HidResult<Vec<DeviceInfo>> {
    discovery::enumerate()
}

pub(crate) fn open_path(path: &str) -> HidResult<Box<dyn Transport>> {
    Ok(Box::new(hidraw::HidrawTransport::open(path)?))
}
