//! Open HID device handles.
//!
//! [`HidDevice`] owns one open transport session and exposes the public
//! read/write/report API. It is responsible for:
//! - resolving ids/serial to a path and opening the platform transport
//! - the `Open -> Closed` state machine (close is idempotent, terminal)
//! - blocking vs non-blocking read semantics (a handle-local flag)
//! - report-ID framing for feature reports
//! - remembering the most recent failure for [`HidDevice::last_error`]
//!
//! This module does **not**:
//! - talk to the OS itself (that is the backend's job)
//! - lock anything per handle — a single `HidDevice` is `Send` but not
//!   `Sync`; callers needing concurrent access serialize it themselves.
//!   Two handles to two sessions are independent.
//!
//! The OS session is released whenever the handle is closed or dropped,
//! including on every early-exit path during construction, because the
//! boxed transport releases it on drop.

use tracing::debug;

use crate::backends::{self, StringQuery, Transport};
use crate::context::HidContext;
use crate::error::{HidError, HidResult};

/// A live session to one HID interface.
///
/// Obtain one through [`HidDevice::open_by_ids`],
/// [`HidDevice::open_by_path`], or [`DeviceInfo::open`](crate::DeviceInfo::open).
/// Reads block by default; flip with [`HidDevice::set_nonblocking`].
pub struct HidDevice {
    /// `None` once closed.
    transport: Option<Box<dyn Transport>>,
    /// Context generation captured at open; I/O fails `NotInitialized`
    /// if the context has been torn down since.
    generation: u64,
    blocking: bool,
    last_error: Option<String>,
}

impl HidDevice {
    /// Open the first device matching `vendor_id`/`product_id` (and
    /// `serial_number`, when given).
    ///
    /// Fails with [`HidError::DeviceNotFound`] when nothing matches and
    /// [`HidError::AccessDenied`] when a match exists but cannot be opened
    /// by the current user.
    pub fn open_by_ids(
        ctx: &HidContext,
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<&str>,
    ) -> HidResult<Self> {
        ctx.ensure_active()?;

        let candidates = ctx.enumerate(Some(vendor_id), Some(product_id))?;
        let info = candidates
            .iter()
            .find(|d| match serial_number {
                Some(wanted) => d.serial_number.as_deref() == Some(wanted),
                None => true,
            })
            .ok_or(HidError::DeviceNotFound)?;

        Self::open_by_path(ctx, &info.path)
    }

    /// Open a device by its platform path (as reported during enumeration).
    ///
    /// Fails with [`HidError::DeviceNotFound`] when the path does not
    /// currently resolve to an openable device.
    pub fn open_by_path(ctx: &HidContext, path: &str) -> HidResult<Self> {
        ctx.ensure_active()?;

        let transport = backends::open_path(path)?;
        debug!(path, "opened HID device");
        Ok(Self {
            transport: Some(transport),
            generation: ctx.generation(),
            blocking: true,
            last_error: None,
        })
    }

    /// Wrap an already-open transport (mock or custom) in a handle.
    ///
    /// This is the seam the test suite uses to drive the full device API
    /// without hardware.
    pub fn from_transport(ctx: &HidContext, transport: Box<dyn Transport>) -> HidResult<Self> {
        ctx.ensure_active()?;
        Ok(Self {
            transport: Some(transport),
            generation: ctx.generation(),
            blocking: true,
            last_error: None,
        })
    }

    /// Toggle non-blocking reads.
    ///
    /// Affects all subsequent [`read`](HidDevice::read) calls on this
    /// handle only; the flag is handle state, never shared between two
    /// sessions to the same physical device.
    pub fn set_nonblocking(&mut self, enabled: bool) -> HidResult<()> {
        self.ensure_usable()?;
        self.blocking = !enabled;
        Ok(())
    }

    /// Send `report` as a single HID output report.
    ///
    /// The first byte is the report ID by driver convention (`0x00` when
    /// the device has no numbered reports). Returns the number of bytes
    /// written.
    pub fn write(&mut self, report: &[u8]) -> HidResult<usize> {
        // Handle state is checked first: a closed handle fails
        // InvalidState whatever the arguments look like.
        self.ensure_usable()?;
        if report.is_empty() {
            return self.record(Err(HidError::InvalidArgument {
                reason: "output report must not be empty".into(),
            }));
        }
        let result = self.transport_mut()?.write(report);
        self.record(result)
    }

    /// Read the next input report, up to `buffer_size` bytes.
    ///
    /// Blocks until a report arrives when the handle is in blocking mode;
    /// in non-blocking mode returns an empty vector — not an error — when
    /// nothing is pending. The result preserves exact report length,
    /// embedded zero bytes included.
    pub fn read(&mut self, buffer_size: usize) -> HidResult<Vec<u8>> {
        let timeout_ms = if self.blocking { -1 } else { 0 };
        self.read_timeout(buffer_size, timeout_ms)
    }

    /// As [`read`](HidDevice::read), waiting at most `timeout_ms`
    /// milliseconds. Negative waits indefinitely, `0` polls once. An empty
    /// vector means the timeout expired with no data.
    pub fn read_timeout(&mut self, buffer_size: usize, timeout_ms: i32) -> HidResult<Vec<u8>> {
        self.ensure_usable()?;
        if buffer_size == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; buffer_size];
        let result = self.transport_mut()?.read(&mut buf, timeout_ms);
        let n = self.record(result)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Send a feature report: `report_id` first, then `payload`.
    pub fn send_feature_report(&mut self, report_id: u8, payload: &[u8]) -> HidResult<usize> {
        self.ensure_usable()?;

        let mut framed = Vec::with_capacity(payload.len() + 1);
        framed.push(report_id);
        framed.extend_from_slice(payload);

        let result = self.transport_mut()?.send_feature_report(&framed);
        self.record(result)
    }

    /// Request the feature report identified by `report_id`, receiving up
    /// to `max_length` bytes.
    ///
    /// When the device numbers its reports the leading byte of the result
    /// is the report ID, matching the driver's wire framing.
    pub fn get_feature_report(&mut self, report_id: u8, max_length: usize) -> HidResult<Vec<u8>> {
        self.ensure_usable()?;
        if max_length == 0 {
            return self.record(Err(HidError::InvalidArgument {
                reason: "feature report buffer must not be empty".into(),
            }));
        }

        let mut buf = vec![0u8; max_length];
        buf[0] = report_id;
        let result = self.transport_mut()?.get_feature_report(&mut buf);
        let n = self.record(result)?;
        buf.truncate(n.min(max_length));
        Ok(buf)
    }

    /// Manufacturer string, when the platform/device exposes one.
    pub fn get_manufacturer_string(&mut self) -> HidResult<String> {
        self.read_string(StringQuery::Manufacturer)
    }

    /// Product string, when the platform/device exposes one.
    pub fn get_product_string(&mut self) -> HidResult<String> {
        self.read_string(StringQuery::Product)
    }

    /// Serial number string, when the platform/device exposes one.
    pub fn get_serial_number_string(&mut self) -> HidResult<String> {
        self.read_string(StringQuery::SerialNumber)
    }

    /// String descriptor by raw index.
    pub fn get_indexed_string(&mut self, index: i32) -> HidResult<String> {
        self.read_string(StringQuery::Indexed(index))
    }

    /// Most recent error message recorded on this handle, if any.
    ///
    /// Mirrors the native driver's per-handle `hid_error` convention for
    /// callers that want a message rather than a structured kind.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    /// Whether the handle is still in the `Open` state.
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Close the handle, releasing the OS session.
    ///
    /// Idempotent: closing an already-closed handle is a no-op. Also runs
    /// implicitly when the handle is dropped.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            debug!("closed HID device");
        }
    }

    fn read_string(&mut self, query: StringQuery) -> HidResult<String> {
        self.ensure_usable()?;
        let result = self.transport_mut()?.read_string(query);
        self.record(result)
    }

    /// Reject operations on closed handles and on handles whose context
    /// has been torn down — before any transport access.
    fn ensure_usable(&mut self) -> HidResult<()> {
        if self.transport.is_none() {
            return self.record(Err(HidError::InvalidState));
        }
        let active = HidContext::from_generation(self.generation).ensure_active();
        self.record(active)
    }

    fn transport_mut(&mut self) -> HidResult<&mut Box<dyn Transport>> {
        self.transport.as_mut().ok_or(HidError::InvalidState)
    }

    /// Remember the failure message (for [`last_error`](HidDevice::last_error))
    /// and pass the result through unchanged.
    fn record<T>(&mut self, result: HidResult<T>) -> HidResult<T> {
        if let Err(ref err) = result {
            self.last_error = Some(err.to_string());
        }
        result
    }
}

impl std::fmt::Debug for HidDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidDevice")
            .field("open", &self.is_open())
            .field("blocking", &self.blocking)
            .field("last_error", &self.last_error)
            .finish()
    }
}
