//! sysfs-based hidraw enumeration.
//!
//! Walks `/sys/class/hidraw` and builds a [`DeviceInfo`] per node without
//! opening any `/dev` entry (so enumeration works even where the nodes
//! themselves need a udev rule to open):
//!
//! - identity (bus, VID, PID) and the optional name/serial come from the
//!   kernel's `uevent` attributes (`HID_ID`, `HID_NAME`, `HID_UNIQ`)
//! - usage page / usage are scanned out of the `report_descriptor` file
//! - the USB interface number falls out of the sysfs device link
//!   (`...:1.3` → 3)
//! - manufacturer / product / serial / bcdDevice are read from the nearest
//!   USB device ancestor when the interface is USB-backed
//!
//! Nodes that cannot be probed are skipped with a debug line rather than
//! failing the whole enumeration.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backends::StringQuery;
use crate::error::{HidError, HidResult};
use crate::info::{BusType, DeviceInfo};

const SYSFS_HIDRAW: &str = "/sys/class/hidraw";

/// Enumerate every hidraw node currently registered.
pub(crate) fn enumerate() -> HidResult<Vec<DeviceInfo>> {
    let mut devices = Vec::new();

    let entries = match fs::read_dir(SYSFS_HIDRAW) {
        Ok(entries) => entries,
        // No hidraw class directory means no HID support or no devices.
        Err(_) => return Ok(devices),
    };

    for entry in entries.flatten() {
        let node = entry.file_name();
        let Some(node) = node.to_str() else { continue };
        if !node.starts_with("hidraw") {
            continue;
        }
        match probe_node(node) {
            Ok(info) => devices.push(info),
            Err(err) => debug!(node, error = %err, "skipping hidraw node"),
        }
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(devices)
}

/// Resolve a `/dev/hidrawN` path to its `/sys/class/hidraw/hidrawN/device`
/// directory, when the path has that shape.
pub(crate) fn sysfs_device_dir(dev_path: &str) -> Option<PathBuf> {
    let node = Path::new(dev_path).file_name()?.to_str()?;
    if !node.starts_with("hidraw") {
        return None;
    }
    let dir = Path::new(SYSFS_HIDRAW).join(node).join("device");
    dir.exists().then_some(dir)
}

/// Answer a descriptor-string query from sysfs for one HID device dir.
///
/// Used both during enumeration and by the transport's string operations.
pub(crate) fn read_device_string(device_dir: &Path, query: StringQuery) -> HidResult<String> {
    let uevent = fs::read_to_string(device_dir.join("uevent")).unwrap_or_default();
    let parsed = parse_uevent(&uevent);
    let usb = usb_ancestor(device_dir);

    let value = match query {
        StringQuery::Manufacturer => usb.and_then(|d| read_attr(&d, "manufacturer")),
        StringQuery::Product => parsed
            .name
            .or_else(|| usb.and_then(|d| read_attr(&d, "product"))),
        StringQuery::SerialNumber => parsed
            .uniq
            .or_else(|| usb.and_then(|d| read_attr(&d, "serial"))),
        // hidraw has no path to arbitrary string descriptors.
        StringQuery::Indexed(_) => None,
    };

    value.ok_or(HidError::Unsupported)
}

fn probe_node(node: &str) -> HidResult<DeviceInfo> {
    let class_dir = Path::new(SYSFS_HIDRAW).join(node);
    let device_dir = class_dir.join("device");

    let uevent = fs::read_to_string(device_dir.join("uevent"))?;
    let parsed = parse_uevent(&uevent);
    let (bus_code, vendor_id, product_id) = parsed.id.ok_or_else(|| HidError::Io {
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{node}: uevent has no HID_ID"),
        ),
    })?;

    let descriptor = fs::read(device_dir.join("report_descriptor")).unwrap_or_default();
    let (usage_page, usage) = scan_usage(&descriptor);

    let canonical = fs::canonicalize(&device_dir).unwrap_or(device_dir.clone());
    let interface_number = interface_number_from_sysfs(&canonical).unwrap_or(-1);

    let usb = usb_ancestor(&device_dir);
    let manufacturer_string = usb
        .as_ref()
        .and_then(|d| read_attr(d, "manufacturer"));
    let product_string = parsed
        .name
        .or_else(|| usb.as_ref().and_then(|d| read_attr(d, "product")));
    let serial_number = parsed
        .uniq
        .or_else(|| usb.as_ref().and_then(|d| read_attr(d, "serial")));
    let release_number = usb
        .as_ref()
        .and_then(|d| read_attr(d, "bcdDevice"))
        .and_then(|s| u16::from_str_radix(&s, 16).ok())
        .unwrap_or(0);

    Ok(DeviceInfo {
        path: format!("/dev/{node}"),
        vendor_id,
        product_id,
        serial_number,
        release_number,
        manufacturer_string,
        product_string,
        usage_page,
        usage,
        interface_number,
        bus_type: BusType::from_bus_code(bus_code),
    })
}

#[derive(Default)]
struct UeventInfo {
    /// `(bus, vendor, product)` from `HID_ID=0003:0000054C:00000CE6`.
    id: Option<(u32, u16, u16)>,
    name: Option<String>,
    uniq: Option<String>,
}

/// Parse the kernel's HID uevent attributes. Empty values become `None`.
fn parse_uevent(text: &str) -> UeventInfo {
    let mut info = UeventInfo::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key {
            "HID_ID" => {
                let mut parts = value.split(':');
                let bus = parts.next().and_then(|p| u32::from_str_radix(p, 16).ok());
                let vid = parts.next().and_then(|p| u32::from_str_radix(p, 16).ok());
                let pid = parts.next().and_then(|p| u32::from_str_radix(p, 16).ok());
                if let (Some(bus), Some(vid), Some(pid)) = (bus, vid, pid) {
                    info.id = Some((bus, vid as u16, pid as u16));
                }
            }
            "HID_NAME" => {
                if !value.is_empty() {
                    info.name = Some(value.to_string());
                }
            }
            "HID_UNIQ" => {
                if !value.is_empty() {
                    info.uniq = Some(value.to_string());
                }
            }
            _ => {}
        }
    }
    info
}

/// Scan a HID report descriptor for the usage page and usage of its first
/// top-level collection.
///
/// Walks short items only (long items are skipped) and stops at the first
/// Collection item, so nested usages never override the toplevel ones.
fn scan_usage(descriptor: &[u8]) -> (u16, u16) {
    let mut usage_page: u16 = 0;
    let mut usage: u16 = 0;

    let mut i = 0;
    while i < descriptor.len() {
        let item = descriptor[i];
        // Long item: skip its declared payload.
        if item == 0xFE {
            let len = descriptor.get(i + 1).copied().unwrap_or(0) as usize;
            i += 3 + len;
            continue;
        }

        let size = match item & 0x03 {
            3 => 4,
            s => s as usize,
        };
        let data = descriptor.get(i + 1..i + 1 + size).unwrap_or(&[]);
        let value = data
            .iter()
            .rev()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));

        match item & 0xFC {
            // Usage Page (global)
            0x04 => usage_page = value as u16,
            // Usage (local)
            0x08 => usage = value as u16,
            // Collection: the toplevel usage pair is now fixed.
            0xA0 => break,
            _ => {}
        }

        i += 1 + size;
    }

    (usage_page, usage)
}

/// Derive the USB interface number from a canonical sysfs device path.
///
/// USB interface directories are named `<port-path>:<config>.<interface>`
/// (e.g. `3-4:1.2` → interface 2). The port path always carries a `-`,
/// which keeps the HID device directory itself (`0003:054C:0CE6.0006`)
/// from matching.
fn interface_number_from_sysfs(canonical: &Path) -> Option<i32> {
    for component in canonical.components() {
        let s = component.as_os_str().to_string_lossy();
        let Some((port, config_iface)) = s.split_once(':') else {
            continue;
        };
        if !port.contains('-') {
            continue;
        }
        let Some((config, iface)) = config_iface.split_once('.') else {
            continue;
        };
        if !config.is_empty() && config.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(value) = iface.parse::<i32>() {
                return Some(value);
            }
        }
    }
    None
}

/// Nearest ancestor of the HID device dir that is a USB *device* (has an
/// `idVendor` attribute); that is where the string attributes live.
fn usb_ancestor(device_dir: &Path) -> Option<PathBuf> {
    let canonical = fs::canonicalize(device_dir).ok()?;
    canonical
        .ancestors()
        .take(6)
        .find(|dir| dir.join("idVendor").is_file())
        .map(Path::to_path_buf)
}

fn read_attr(dir: &Path, attr: &str) -> Option<String> {
    let raw = fs::read_to_string(dir.join(attr)).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uevent_parses_id_name_and_uniq() {
        let text = "DRIVER=playstation\n\
                    HID_ID=0003:0000054C:00000CE6\n\
                    HID_NAME=Sony Interactive Entertainment Wireless Controller\n\
                    HID_PHYS=usb-0000:00:14.0-2/input3\n\
                    HID_UNIQ=a0:ab:51:00:00:01\n\
                    MODALIAS=hid:b0003g0001v0000054Cp00000CE6\n";
        let parsed = parse_uevent(text);
        assert_eq!(parsed.id, Some((0x03, 0x054C, 0x0CE6)));
        assert_eq!(
            parsed.name.as_deref(),
            Some("Sony Interactive Entertainment Wireless Controller")
        );
        assert_eq!(parsed.uniq.as_deref(), Some("a0:ab:51:00:00:01"));
    }

    #[test]
    fn uevent_empty_uniq_is_none() {
        let parsed = parse_uevent("HID_ID=0005:0000046D:0000B33C\nHID_UNIQ=\n");
        assert_eq!(parsed.id, Some((0x05, 0x046D, 0xB33C)));
        assert!(parsed.uniq.is_none());
    }

    #[test]
    fn usage_scan_reads_one_byte_items() {
        // Usage Page (Generic Desktop), Usage (Keyboard), Collection (Application)
        let descriptor = [0x05, 0x01, 0x09, 0x06, 0xA1, 0x01];
        assert_eq!(scan_usage(&descriptor), (0x01, 0x06));
    }

    #[test]
    fn usage_scan_reads_two_byte_items() {
        // Usage Page (Vendor 0xFF00), Usage (0x0001), Collection
        let descriptor = [0x06, 0x00, 0xFF, 0x0A, 0x01, 0x00, 0xA1, 0x01];
        assert_eq!(scan_usage(&descriptor), (0xFF00, 0x0001));
    }

    #[test]
    fn usage_scan_stops_at_first_collection() {
        // Toplevel gamepad collection containing a nested X-axis usage.
        let descriptor = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x05, // Usage (Gamepad)
            0xA1, 0x01, // Collection (Application)
            0x09, 0x30, // Usage (X) — must not win
            0xC0, // End Collection
        ];
        assert_eq!(scan_usage(&descriptor), (0x01, 0x05));
    }

    #[test]
    fn usage_scan_handles_empty_descriptor() {
        assert_eq!(scan_usage(&[]), (0, 0));
    }

    #[test]
    fn interface_number_from_usb_component() {
        let path = Path::new(
            "/sys/devices/pci0000:00/0000:00:14.0/usb3/3-4/3-4:1.3/0003:054C:0CE6.0006",
        );
        assert_eq!(interface_number_from_sysfs(path), Some(3));
    }

    #[test]
    fn interface_number_absent_for_bluetooth_paths() {
        // The HID device dir component carries ':' and '.', but no USB
        // port path, so it must not be mistaken for an interface dir.
        let path = Path::new("/sys/devices/virtual/misc/uhid/0005:046D:B33C.0002");
        assert_eq!(interface_number_from_sysfs(path), None);
    }
}
