//! Error types shared across the crate.
//!
//! Every fallible operation returns [`HidResult`]. The variants of
//! [`HidError`] are intentionally coarse: they tell the caller *what class*
//! of thing went wrong (missing device, permissions, transport failure, bad
//! call), not platform minutiae. The platform detail, when there is any,
//! rides along in the `Io` source or the `AccessDenied` reason string and is
//! also kept retrievable per handle via
//! [`HidDevice::last_error`](crate::HidDevice::last_error).

use thiserror::Error;

/// Result alias used throughout the crate.
pub type HidResult<T> = Result<T, HidError>;

/// Errors produced by context, enumeration, and device operations.
#[derive(Debug, Error)]
pub enum HidError {
    /// No device matched the requested ids/serial, or the path did not
    /// resolve to an openable device.
    #[error("device not found")]
    DeviceNotFound,

    /// The device exists but the current user/process may not open it.
    ///
    /// On Linux this usually means a missing udev rule for the hidraw node.
    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    /// Transport-level failure during read/write/feature transfer.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The caller passed something unusable (e.g. an empty report).
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Operation attempted on a handle that has already been closed.
    #[error("device handle is closed")]
    InvalidState,

    /// The device or platform does not expose the requested capability
    /// (typically a descriptor string query).
    #[error("not supported by this device or platform")]
    Unsupported,

    /// The library context was never initialized, or has been torn down.
    #[error("library context not initialized")]
    NotInitialized,
}

impl HidError {
    /// Map an open(2)/CreateFile failure onto the public error kinds.
    ///
    /// Permission problems become [`HidError::AccessDenied`], a missing node
    /// becomes [`HidError::DeviceNotFound`], everything else stays an
    /// [`HidError::Io`].
    pub(crate) fn from_open_failure(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => HidError::AccessDenied {
                reason: format!("{path}: {err}"),
            },
            std::io::ErrorKind::NotFound => HidError::DeviceNotFound,
            _ => HidError::Io { source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn permission_denied_maps_to_access_denied() {
        let err = HidError::from_open_failure(
            "/dev/hidraw0",
            io::Error::new(io::ErrorKind::PermissionDenied, "EACCES"),
        );
        assert!(matches!(err, HidError::AccessDenied { .. }));
    }

    #[test]
    fn missing_node_maps_to_device_not_found() {
        let err = HidError::from_open_failure(
            "/dev/hidraw99",
            io::Error::new(io::ErrorKind::NotFound, "ENOENT"),
        );
        assert!(matches!(err, HidError::DeviceNotFound));
    }

    #[test]
    fn other_failures_stay_io() {
        let err = HidError::from_open_failure(
            "/dev/hidraw0",
            io::Error::new(io::ErrorKind::Other, "EBUSY"),
        );
        assert!(matches!(err, HidError::Io { .. }));
    }
}
