#![cfg(target_os = "windows")]

//! Windows HID transport over an overlapped file handle.
//!
//! The handle is opened with `FILE_FLAG_OVERLAPPED` so reads can be waited
//! on with a timeout and cancelled on expiry; writes wait for completion.
//! The Windows HID stack requires transfer buffers sized to the interface's
//! report lengths (`HidP_GetCaps`), so the transport keeps a scratch buffer
//! of the input report length and pads short output reports.

use core::ffi::c_void;
use std::io;

use windows_sys::Win32::Devices::HumanInterfaceDevice::{
    HidD_FreePreparsedData, HidD_GetFeature, HidD_GetIndexedString,
    HidD_GetManufacturerString, HidD_GetPreparsedData, HidD_GetProductString,
    HidD_GetSerialNumberString, HidD_SetFeature, HidP_GetCaps, HIDP_CAPS,
    HIDP_STATUS_SUCCESS, PHIDP_PREPARSED_DATA,
};
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_IO_PENDING, GENERIC_READ, GENERIC_WRITE, HANDLE,
    INVALID_HANDLE_VALUE, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadFile, WriteFile, FILE_FLAG_OVERLAPPED, FILE_SHARE_READ, FILE_SHARE_WRITE,
    OPEN_EXISTING,
};
use windows_sys::Win32::System::IO::{CancelIo, GetOverlappedResult, OVERLAPPED};
use windows_sys::Win32::System::Threading::{CreateEventW, WaitForSingleObject, INFINITE};

use crate::backends::windows::{from_wide, to_wide};
use crate::backends::{StringQuery, Transport};
use crate::error::{HidError, HidResult};

const STRING_BUF_CHARS: usize = 256;

/// One open HID interface session.
pub struct WinHidTransport {
    handle: HANDLE,
    /// Event signalled by overlapped completions; reused across calls
    /// because only one operation per direction is in flight at a time.
    event: HANDLE,
    input_report_len: usize,
    output_report_len: usize,
}

// The raw handles are owned exclusively by this struct.
unsafe impl Send for WinHidTransport {}

impl WinHidTransport {
    /// Open a HID device-interface path read/write with overlapped I/O.
    pub fn open(path: &str) -> HidResult<Self> {
        let wide = to_wide(path);
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                std::ptr::null(),
                OPEN_EXISTING,
                FILE_FLAG_OVERLAPPED,
                std::ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(HidError::from_open_failure(path, io::Error::last_os_error()));
        }

        let event =
            unsafe { CreateEventW(std::ptr::null(), 0, 0, std::ptr::null()) };
        if event.is_null() {
            let err = io::Error::last_os_error();
            unsafe { CloseHandle(handle) };
            return Err(err.into());
        }

        let (input_report_len, output_report_len) = report_lengths(handle);
        Ok(Self {
            handle,
            event,
            input_report_len,
            output_report_len,
        })
    }

    /// Start an overlapped read into `scratch` and wait up to `timeout_ms`.
    fn read_overlapped(&mut self, scratch: &mut [u8], timeout_ms: i32) -> HidResult<usize> {
        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        overlapped.hEvent = self.event;
        let mut transferred: u32 = 0;

        let ok = unsafe {
            ReadFile(
                self.handle,
                scratch.as_mut_ptr(),
                scratch.len() as u32,
                &mut transferred,
                &mut overlapped,
            )
        };
        if ok != 0 {
            return Ok(transferred as usize);
        }
        if unsafe { GetLastError() } != ERROR_IO_PENDING {
            return Err(io::Error::last_os_error().into());
        }

        let wait_ms = if timeout_ms < 0 {
            INFINITE
        } else {
            timeout_ms as u32
        };
        match unsafe { WaitForSingleObject(self.event, wait_ms) } {
            WAIT_OBJECT_0 => {
                let ok = unsafe {
                    GetOverlappedResult(self.handle, &overlapped, &mut transferred, 0)
                };
                if ok == 0 {
                    return Err(io::Error::last_os_error().into());
                }
                Ok(transferred as usize)
            }
            WAIT_TIMEOUT => {
                // CancelIo only requests cancellation; the kernel still
                // completes the read asynchronously and writes into the
                // OVERLAPPED. Wait for that completion to drain before the
                // struct (and the scratch buffer) go out of scope. The
                // expected ERROR_OPERATION_ABORTED is not a failure here,
                // but a read that won the race against the cancel did
                // deliver a report and must not be dropped.
                let drained = unsafe {
                    CancelIo(self.handle);
                    GetOverlappedResult(self.handle, &overlapped, &mut transferred, 1)
                };
                if drained != 0 {
                    return Ok(transferred as usize);
                }
                Ok(0)
            }
            _ => Err(io::Error::last_os_error().into()),
        }
    }
}

impl Transport for WinHidTransport {
    fn write(&mut self, data: &[u8]) -> HidResult<usize> {
        // The HID class driver rejects writes shorter than the interface's
        // output report length; pad with zeros like the native library.
        let mut padded;
        let buf = if data.len() < self.output_report_len {
            padded = vec![0u8; self.output_report_len];
            padded[..data.len()].copy_from_slice(data);
            &padded[..]
        } else {
            data
        };

        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        overlapped.hEvent = self.event;
        let mut transferred: u32 = 0;

        let ok = unsafe {
            WriteFile(
                self.handle,
                buf.as_ptr(),
                buf.len() as u32,
                &mut transferred,
                &mut overlapped,
            )
        };
        if ok == 0 {
            if unsafe { GetLastError() } != ERROR_IO_PENDING {
                return Err(io::Error::last_os_error().into());
            }
            let ok = unsafe {
                GetOverlappedResult(self.handle, &overlapped, &mut transferred, 1)
            };
            if ok == 0 {
                return Err(io::Error::last_os_error().into());
            }
        }
        Ok((transferred as usize).min(data.len()))
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> HidResult<usize> {
        // Read into a scratch buffer of the full input report length; the
        // class driver fails transfers into anything shorter.
        let mut scratch = vec![0u8; self.input_report_len.max(buf.len())];
        let n = self.read_overlapped(&mut scratch, timeout_ms)?;
        let n = n.min(buf.len());
        buf[..n].copy_from_slice(&scratch[..n]);
        Ok(n)
    }

    fn send_feature_report(&mut self, data: &[u8]) -> HidResult<usize> {
        let ok = unsafe {
            HidD_SetFeature(
                self.handle,
                data.as_ptr() as *const c_void,
                data.len() as u32,
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(data.len())
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> HidResult<usize> {
        let ok = unsafe {
            HidD_GetFeature(
                self.handle,
                buf.as_mut_ptr() as *mut c_void,
                buf.len() as u32,
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error().into());
        }
        // HidD_GetFeature reports no transfer length; the filled buffer is
        // the best answer available.
        Ok(buf.len())
    }

    fn read_string(&mut self, query: StringQuery) -> HidResult<String> {
        let mut wide = [0u16; STRING_BUF_CHARS];
        let byte_len = (wide.len() * 2) as u32;
        let buf_ptr = wide.as_mut_ptr() as *mut c_void;

        let ok = unsafe {
            match query {
                StringQuery::Manufacturer => {
                    HidD_GetManufacturerString(self.handle, buf_ptr, byte_len)
                }
                StringQuery::Product => HidD_GetProductString(self.handle, buf_ptr, byte_len),
                StringQuery::SerialNumber => {
                    HidD_GetSerialNumberString(self.handle, buf_ptr, byte_len)
                }
                StringQuery::Indexed(index) => {
                    HidD_GetIndexedString(self.handle, index as u32, buf_ptr, byte_len)
                }
            }
        };
        if ok == 0 {
            return Err(HidError::Unsupported);
        }
        from_wide(&wide).ok_or(HidError::Unsupported)
    }
}

impl Drop for WinHidTransport {
    fn drop(&mut self) {
        unsafe {
            CancelIo(self.handle);
            CloseHandle(self.event);
            CloseHandle(self.handle);
        }
    }
}

/// Input/output report byte lengths from the interface's preparsed data,
/// with conservative fallbacks when the query fails.
fn report_lengths(handle: HANDLE) -> (usize, usize) {
    let mut preparsed: PHIDP_PREPARSED_DATA = unsafe { std::mem::zeroed() };
    if unsafe { HidD_GetPreparsedData(handle, &mut preparsed) } == 0 {
        return (64, 0);
    }

    let mut caps: HIDP_CAPS = unsafe { std::mem::zeroed() };
    let status = unsafe { HidP_GetCaps(preparsed, &mut caps) };
    unsafe { HidD_FreePreparsedData(preparsed) };

    if status != HIDP_STATUS_SUCCESS {
        return (64, 0);
    }
    (
        caps.InputReportByteLength as usize,
        caps.OutputReportByteLength as usize,
    )
}
