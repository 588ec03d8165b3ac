#![cfg(target_os = "windows")]

//! Windows HID enumeration.
//!
//! Lists present device interfaces of the HID class with
//! `CM_Get_Device_Interface_ListW`, then probes each path with a
//! zero-access handle (no read/write permission needed) for attributes,
//! capabilities, and descriptor strings. Interfaces that refuse even the
//! metadata handle are skipped with a debug line.
//!
//! Platform-specific detail worth knowing:
//! - the USB interface number is encoded as `&mi_XX` inside the interface
//!   path; paths without it report `-1`
//! - Bluetooth-backed interfaces are recognized by their `bthenum` /
//!   `bthledevice` enumerator segment; everything else is assumed USB,
//!   which is what the HID class driver services in practice

use core::ffi::c_void;
use std::io;

use tracing::debug;

use windows_sys::core::GUID;
use windows_sys::Win32::Devices::DeviceAndDriverInstallation::{
    CM_Get_Device_Interface_ListW, CM_Get_Device_Interface_List_SizeW,
    CM_GET_DEVICE_INTERFACE_LIST_PRESENT, CR_BUFFER_SMALL, CR_SUCCESS,
};
use windows_sys::Win32::Devices::HumanInterfaceDevice::{
    HidD_FreePreparsedData, HidD_GetAttributes, HidD_GetHidGuid, HidD_GetManufacturerString,
    HidD_GetPreparsedData, HidD_GetProductString, HidD_GetSerialNumberString, HidP_GetCaps,
    HIDD_ATTRIBUTES, HIDP_CAPS, HIDP_STATUS_SUCCESS, PHIDP_PREPARSED_DATA,
};
use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};

use crate::backends::windows::{from_wide, to_wide};
use crate::error::HidResult;
use crate::info::{BusType, DeviceInfo};

/// Enumerate every present HID device interface.
pub(crate) fn enumerate() -> HidResult<Vec<DeviceInfo>> {
    let mut devices = Vec::new();

    for path in interface_paths()? {
        match probe_interface(&path) {
            Some(info) => devices.push(info),
            None => debug!(%path, "skipping unprobeable HID interface"),
        }
    }

    Ok(devices)
}

/// All present HID-class device-interface paths.
fn interface_paths() -> HidResult<Vec<String>> {
    let mut guid: GUID = unsafe { std::mem::zeroed() };
    unsafe { HidD_GetHidGuid(&mut guid) };

    // Size-then-fetch can race against hotplug; retry on CR_BUFFER_SMALL.
    let buffer = loop {
        let mut chars: u32 = 0;
        let ret = unsafe {
            CM_Get_Device_Interface_List_SizeW(
                &mut chars,
                &guid,
                std::ptr::null(),
                CM_GET_DEVICE_INTERFACE_LIST_PRESENT,
            )
        };
        if ret != CR_SUCCESS || chars == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u16; chars as usize];
        let ret = unsafe {
            CM_Get_Device_Interface_ListW(
                &guid,
                std::ptr::null(),
                buffer.as_mut_ptr(),
                chars,
                CM_GET_DEVICE_INTERFACE_LIST_PRESENT,
            )
        };
        match ret {
            CR_SUCCESS => break buffer,
            CR_BUFFER_SMALL => continue,
            _ => return Ok(Vec::new()),
        }
    };

    // The list is a sequence of NUL-terminated strings ending in an empty one.
    let mut paths = Vec::new();
    for chunk in buffer.split(|&c| c == 0) {
        if chunk.is_empty() {
            continue;
        }
        paths.push(String::from_utf16_lossy(chunk));
    }
    Ok(paths)
}

/// Build a [`DeviceInfo`] for one interface path, or `None` when the
/// metadata handle cannot be opened.
fn probe_interface(path: &str) -> Option<DeviceInfo> {
    let handle = open_metadata_handle(path).ok()?;

    let mut attrs: HIDD_ATTRIBUTES = unsafe { std::mem::zeroed() };
    attrs.Size = std::mem::size_of::<HIDD_ATTRIBUTES>() as u32;
    if unsafe { HidD_GetAttributes(handle, &mut attrs) } == 0 {
        unsafe { CloseHandle(handle) };
        return None;
    }

    let (usage_page, usage) = interface_usage(handle);
    let manufacturer_string = read_wide_string(handle, HidD_GetManufacturerString);
    let product_string = read_wide_string(handle, HidD_GetProductString);
    let serial_number = read_wide_string(handle, HidD_GetSerialNumberString);
    unsafe { CloseHandle(handle) };

    Some(DeviceInfo {
        path: path.to_string(),
        vendor_id: attrs.VendorID,
        product_id: attrs.ProductID,
        serial_number,
        release_number: attrs.VersionNumber,
        manufacturer_string,
        product_string,
        usage_page,
        usage,
        interface_number: interface_number_from_path(path).unwrap_or(-1),
        bus_type: bus_type_from_path(path),
    })
}

/// Open an interface path with zero access rights — enough for attribute
/// and string queries, no read/write permission required.
fn open_metadata_handle(path: &str) -> io::Result<HANDLE> {
    let wide = to_wide(path);
    let handle = unsafe {
        CreateFileW(
            wide.as_ptr(),
            0,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            std::ptr::null(),
            OPEN_EXISTING,
            0,
            std::ptr::null_mut(),
        )
    };
    if handle == INVALID_HANDLE_VALUE {
        return Err(io::Error::last_os_error());
    }
    Ok(handle)
}

fn interface_usage(handle: HANDLE) -> (u16, u16) {
    let mut preparsed: PHIDP_PREPARSED_DATA = unsafe { std::mem::zeroed() };
    if unsafe { HidD_GetPreparsedData(handle, &mut preparsed) } == 0 {
        return (0, 0);
    }

    let mut caps: HIDP_CAPS = unsafe { std::mem::zeroed() };
    let status = unsafe { HidP_GetCaps(preparsed, &mut caps) };
    unsafe { HidD_FreePreparsedData(preparsed) };

    if status != HIDP_STATUS_SUCCESS {
        return (0, 0);
    }
    (caps.UsagePage, caps.Usage)
}

fn read_wide_string(
    handle: HANDLE,
    query: unsafe extern "system" fn(HANDLE, *mut c_void, u32) -> u8,
) -> Option<String> {
    let mut wide = [0u16; 256];
    let ok = unsafe { query(handle, wide.as_mut_ptr() as *mut c_void, (wide.len() * 2) as u32) };
    if ok == 0 {
        return None;
    }
    from_wide(&wide)
}

/// USB interface index from the `&mi_XX` segment of an interface path.
fn interface_number_from_path(path: &str) -> Option<i32> {
    let lower = path.to_ascii_lowercase();
    let start = lower.find("&mi_")? + 4;
    let digits: String = lower[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    i32::from_str_radix(&digits, 16).ok()
}

fn bus_type_from_path(path: &str) -> BusType {
    let lower = path.to_ascii_lowercase();
    if lower.contains("bthenum") || lower.contains("bthledevice") {
        BusType::Bluetooth
    } else {
        BusType::Usb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_number_parses_mi_segment() {
        let path = r"\\?\hid#vid_054c&pid_0ce6&mi_03#8&2de99099&0&0000#{4d1e55b2-f16f-11cf-88cb-001111000030}";
        assert_eq!(interface_number_from_path(path), Some(3));
    }

    #[test]
    fn interface_number_absent_without_mi_segment() {
        let path = r"\\?\hid#vid_046d&pid_c52b#7&2d45a32&0&0000#{4d1e55b2-f16f-11cf-88cb-001111000030}";
        assert_eq!(interface_number_from_path(path), None);
    }

    #[test]
    fn bluetooth_paths_are_classified() {
        let path = r"\\?\bthenum#{00001124-0000-1000-8000-00805f9b34fb}_vid&0002054c_pid&0ce6#9&1a2b3c4d&0&001";
        assert_eq!(bus_type_from_path(path), BusType::Bluetooth);
        assert_eq!(
            bus_type_from_path(r"\\?\hid#vid_054c&pid_0ce6#..."),
            BusType::Usb
        );
    }
}
