//! Device descriptor snapshot.
//!
//! [`DeviceInfo`] is a lightweight, cloneable description of one HID
//! interface as seen during enumeration, suitable for UI display, logging,
//! and persistence. Mutating it has no effect on the physical device.
//!
//! # Conventions
//! - `path` is an opaque, platform-specific identifier (`/dev/hidrawN` on
//!   Linux, a device-interface path on Windows). It is stable for the
//!   lifetime of the physical connection and is what you hand back to
//!   [`DeviceInfo::open`] to re-open the device.
//! - `manufacturer_string` / `product_string` / `serial_number` are filled
//!   when the platform reports them; unknown fields remain `None`.
//! - `interface_number` is the USB interface index, or `-1` when not
//!   applicable (non-USB buses).
//!
//! ## Persistence notes
//! - `vendor_id`/`product_id` and `serial_number` (when present) are
//!   generally stable and useful for re-identification.
//! - `path` may change across ports, drivers, and reconnects; treat it as
//!   diagnostic first, identity second.

use serde::{Deserialize, Serialize};

use crate::context::HidContext;
use crate::device::HidDevice;
use crate::error::HidResult;

/// Bus a HID interface hangs off of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    #[default]
    Unknown,
    Usb,
    Bluetooth,
    I2c,
    Spi,
}

impl BusType {
    /// Map a Linux kernel bus code (`BUS_USB` etc., as reported in the
    /// hidraw uevent `HID_ID` field) onto a [`BusType`].
    pub fn from_bus_code(code: u32) -> Self {
        match code {
            0x03 => BusType::Usb,
            0x05 => BusType::Bluetooth,
            0x18 => BusType::I2c,
            0x1C => BusType::Spi,
            _ => BusType::Unknown,
        }
    }
}

/// Snapshot of metadata describing a single discoverable HID interface.
///
/// Produced by [`HidContext::enumerate`](crate::HidContext::enumerate).
/// Immutable as far as the device is concerned; clone freely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Platform-specific device path, usable with
    /// [`HidDevice::open_by_path`](crate::HidDevice::open_by_path).
    pub path: String,

    /// USB Vendor ID (VID).
    pub vendor_id: u16,

    /// USB Product ID (PID).
    pub product_id: u16,

    /// Serial number supplied by firmware/OS, if the device reports one.
    pub serial_number: Option<String>,

    /// Device release number in binary-coded decimal (bcdDevice).
    pub release_number: u16,

    /// Manufacturer string from the driver/firmware.
    pub manufacturer_string: Option<String>,

    /// Human-readable product name from the driver/firmware.
    pub product_string: Option<String>,

    /// HID Usage Page of this interface (e.g. `0x01` Generic Desktop).
    pub usage_page: u16,

    /// HID Usage within the page (e.g. `0x06` Keyboard).
    pub usage: u16,

    /// USB interface index this logical device represents, or `-1` when not
    /// applicable.
    pub interface_number: i32,

    /// Bus this interface was discovered on.
    pub bus_type: BusType,
}

impl DeviceInfo {
    /// Open the device this descriptor points at (by its `path`).
    pub fn open(&self, ctx: &HidContext) -> HidResult<HidDevice> {
        HidDevice::open_by_path(ctx, &self.path)
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} {} ({})",
            self.vendor_id,
            self.product_id,
            self.product_string.as_deref().unwrap_or("?"),
            self.path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_bus_codes_map() {
        assert_eq!(BusType::from_bus_code(0x03), BusType::Usb);
        assert_eq!(BusType::from_bus_code(0x05), BusType::Bluetooth);
        assert_eq!(BusType::from_bus_code(0x18), BusType::I2c);
        assert_eq!(BusType::from_bus_code(0x1C), BusType::Spi);
        assert_eq!(BusType::from_bus_code(0x19), BusType::Unknown);
    }

    #[test]
    fn descriptor_survives_serde() {
        let info = DeviceInfo {
            path: "/dev/hidraw3".into(),
            vendor_id: 0x054C,
            product_id: 0x0CE6,
            serial_number: Some("a0:ab:51:00:00:01".into()),
            release_number: 0x0100,
            manufacturer_string: Some("Sony Interactive Entertainment".into()),
            product_string: Some("Wireless Controller".into()),
            usage_page: 0x01,
            usage: 0x05,
            interface_number: 3,
            bus_type: BusType::Usb,
        };

        let json = serde_json::to_string(&info).unwrap();
        let back: DeviceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back.path, info.path);
        assert_eq!(back.bus_type, info.bus_type);
        assert_eq!(back.serial_number, info.serial_number);
    }
}
