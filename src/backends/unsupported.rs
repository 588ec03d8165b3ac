//! Fallback backend for targets without a raw-HID implementation.
//!
//! Enumeration reports an empty bus; opening anything fails with
//! [`HidError::Unsupported`].

use crate::backends::Transport;
use crate::error::{HidError, HidResult};
use crate::info::DeviceInfo;

pub(crate) fn enumerate() -> HidResult<Vec<DeviceInfo>> {
    Ok(Vec::new())
}

pub(crate) fn open_path(_path: &str) -> HidResult<Box<dyn Transport>> {
    Err(HidError::Unsupported)
}
