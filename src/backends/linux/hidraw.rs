//! Raw hidraw device I/O.
//!
//! [`HidrawTransport`] owns one open `/dev/hidrawN` file descriptor. The fd
//! is opened non-blocking once; blocking and timed reads are built on top
//! with `poll(2)`, so the blocking mode of the public handle never touches
//! fd flags. Feature reports go through the `HIDIOCSFEATURE` /
//! `HIDIOCGFEATURE` ioctls. Descriptor strings come from sysfs, since the
//! hidraw interface itself has no string query.
//!
//! The fd is released when the transport drops.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;

use crate::backends::linux::discovery;
use crate::backends::{StringQuery, Transport};
use crate::error::{HidError, HidResult};

// hidraw ioctl numbers (linux/hidraw.h): type 'H', feature get/set are
// read-write ioctls whose size field carries the buffer length.
const HIDRAW_IOCTL_TYPE: u8 = b'H';
const HIDIOC_NR_SET_FEATURE: u8 = 0x06;
const HIDIOC_NR_GET_FEATURE: u8 = 0x07;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_READ_WRITE: u32 = 3;

const fn ioctl_code(direction: u32, kind: u8, nr: u8, size: usize) -> libc::c_ulong {
    ((direction << IOC_DIRSHIFT)
        | ((kind as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | ((size as u32) << IOC_SIZESHIFT)) as libc::c_ulong
}

fn hidiocsfeature(len: usize) -> libc::c_ulong {
    ioctl_code(IOC_READ_WRITE, HIDRAW_IOCTL_TYPE, HIDIOC_NR_SET_FEATURE, len)
}

fn hidiocgfeature(len: usize) -> libc::c_ulong {
    ioctl_code(IOC_READ_WRITE, HIDRAW_IOCTL_TYPE, HIDIOC_NR_GET_FEATURE, len)
}

/// One open hidraw session.
pub struct HidrawTransport {
    file: File,
    /// `/sys/class/hidraw/<node>/device`, resolved at open for string
    /// queries; `None` when the path was not a `/dev/hidrawN` node.
    sysfs_device: Option<PathBuf>,
}

impl HidrawTransport {
    /// Open a hidraw node (e.g. `/dev/hidraw3`) read/write, non-blocking.
    pub fn open(path: &str) -> HidResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(path)
            .map_err(|e| HidError::from_open_failure(path, e))?;

        Ok(Self {
            file,
            sysfs_device: discovery::sysfs_device_dir(path),
        })
    }

    fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Wait until the fd is readable, up to `timeout_ms` (-1 = forever).
    ///
    /// `Ok(false)` means the timeout expired with no data.
    fn wait_readable(&self, timeout_ms: i32) -> HidResult<bool> {
        poll_readable(self.fd(), timeout_ms)
    }
}

/// `poll(2)` a single fd for readability, retrying when a signal interrupts
/// the wait.
///
/// `Ok(false)` means the timeout expired with no data.
fn poll_readable(fd: RawFd, timeout_ms: i32) -> HidResult<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    loop {
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err.into());
        }
        if ret == 0 {
            return Ok(false);
        }
        // POLLERR/POLLHUP without POLLIN means the device went away.
        if pfd.revents & libc::POLLIN == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "hidraw device disconnected",
            )
            .into());
        }
        return Ok(true);
    }
}

impl Transport for HidrawTransport {
    fn write(&mut self, data: &[u8]) -> HidResult<usize> {
        let rc = unsafe {
            libc::write(
                self.fd(),
                data.as_ptr() as *const libc::c_void,
                data.len(),
            )
        };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(rc as usize)
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> HidResult<usize> {
        if timeout_ms != 0 && !self.wait_readable(timeout_ms)? {
            return Ok(0);
        }

        let rc = unsafe {
            libc::read(
                self.fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            // Non-blocking fd with nothing queued: no data, not a failure.
            if err.kind() == std::io::ErrorKind::WouldBlock {
                return Ok(0);
            }
            return Err(err.into());
        }
        Ok(rc as usize)
    }

    fn send_feature_report(&mut self, data: &[u8]) -> HidResult<usize> {
        let rc = unsafe {
            libc::ioctl(
                self.fd(),
                hidiocsfeature(data.len()),
                data.as_ptr(),
            )
        };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(rc as usize)
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> HidResult<usize> {
        let rc = unsafe {
            libc::ioctl(
                self.fd(),
                hidiocgfeature(buf.len()),
                buf.as_mut_ptr(),
            )
        };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(rc as usize)
    }

    fn read_string(&mut self, query: StringQuery) -> HidResult<String> {
        let device_dir = self.sysfs_device.as_ref().ok_or(HidError::Unsupported)?;
        discovery::read_device_string(device_dir, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference values computed from the linux/hidraw.h _IOWR macros for a
    // 64-byte buffer.
    #[test]
    fn feature_ioctl_codes_match_kernel_headers() {
        assert_eq!(hidiocsfeature(64), 0xC040_4806);
        assert_eq!(hidiocgfeature(64), 0xC040_4807);
    }

    #[test]
    fn poll_reports_pending_data_and_timeouts() {
        use std::io::Write;
        use std::os::unix::net::UnixStream;

        let (mut tx, rx) = UnixStream::pair().unwrap();

        // Nothing queued: the timeout expires.
        assert!(!poll_readable(rx.as_raw_fd(), 10).unwrap());

        tx.write_all(&[0x01]).unwrap();
        assert!(poll_readable(rx.as_raw_fd(), 10).unwrap());
        // Zero timeout polls once without waiting.
        assert!(poll_readable(rx.as_raw_fd(), 0).unwrap());
    }
}
