//! In-memory transport for tests and hardware-free consumers.
//!
//! [`MockTransport`] implements [`Transport`] over shared in-memory state:
//! scripted input reports, a write history, canned feature-report replies,
//! and configurable descriptor strings. Hand the transport itself to
//! [`HidDevice::from_transport`](crate::HidDevice::from_transport) and keep
//! the [`MockHandle`] on the test side to script and observe traffic.
//!
//! Two behaviors worth knowing:
//! - **Echo mode** ([`MockTransport::echo`]) loops every written report
//!   back into the read queue, which is how the write-then-read loopback
//!   properties are tested.
//! - The mock never suspends the caller: a read with nothing queued
//!   returns an empty read immediately, whatever the timeout asked for.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::backends::{StringQuery, Transport};
use crate::error::{HidError, HidResult};

#[derive(Default)]
struct MockState {
    reads: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    features_sent: Vec<Vec<u8>>,
    feature_replies: HashMap<u8, Vec<u8>>,
    manufacturer: Option<String>,
    product: Option<String>,
    serial: Option<String>,
    indexed: HashMap<i32, String>,
    echo: bool,
    fail_io: bool,
    dropped: bool,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(shared: &Shared) -> std::sync::MutexGuard<'_, MockState> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// Scriptable [`Transport`] backed by in-memory queues.
pub struct MockTransport {
    shared: Shared,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// A transport that loops written reports back into the read queue.
    pub fn echo() -> Self {
        let transport = Self::new();
        lock(&transport.shared).echo = true;
        transport
    }

    /// Observer/scripting handle sharing this transport's state.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        lock(&self.shared).dropped = true;
    }
}

/// Test-side view of a [`MockTransport`]'s state.
///
/// Stays valid after the transport has been boxed away into a device
/// handle — and after it has been dropped, which is how session release is
/// asserted.
#[derive(Clone)]
pub struct MockHandle {
    shared: Shared,
}

impl MockHandle {
    /// Script the next input report.
    pub fn queue_read(&self, report: impl Into<Vec<u8>>) {
        lock(&self.shared).reads.push_back(report.into());
    }

    /// Every output report written so far, oldest first.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        lock(&self.shared).writes.clone()
    }

    /// Every feature report sent so far, framing byte included.
    pub fn features_sent(&self) -> Vec<Vec<u8>> {
        lock(&self.shared).features_sent.clone()
    }

    /// Script the reply to `get_feature_report` for `report_id`.
    pub fn set_feature_reply(&self, report_id: u8, reply: impl Into<Vec<u8>>) {
        lock(&self.shared)
            .feature_replies
            .insert(report_id, reply.into());
    }

    /// Configure the descriptor strings the transport reports.
    pub fn set_strings(
        &self,
        manufacturer: Option<&str>,
        product: Option<&str>,
        serial: Option<&str>,
    ) {
        let mut state = lock(&self.shared);
        state.manufacturer = manufacturer.map(Into::into);
        state.product = product.map(Into::into);
        state.serial = serial.map(Into::into);
    }

    /// Configure an indexed string descriptor.
    pub fn set_indexed_string(&self, index: i32, value: &str) {
        lock(&self.shared).indexed.insert(index, value.into());
    }

    /// Make every subsequent transfer fail with an I/O error.
    pub fn set_fail_io(&self, fail: bool) {
        lock(&self.shared).fail_io = fail;
    }

    /// Whether the transport (and with it the session) has been released.
    pub fn is_dropped(&self) -> bool {
        lock(&self.shared).dropped
    }

    /// Number of scripted reports still pending.
    pub fn pending_reads(&self) -> usize {
        lock(&self.shared).reads.len()
    }
}

fn transfer_failed() -> HidError {
    HidError::Io {
        source: std::io::Error::new(std::io::ErrorKind::Other, "mock transfer failure"),
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> HidResult<usize> {
        let mut state = lock(&self.shared);
        if state.fail_io {
            return Err(transfer_failed());
        }
        state.writes.push(data.to_vec());
        if state.echo {
            let echoed = data.to_vec();
            state.reads.push_back(echoed);
        }
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8], _timeout_ms: i32) -> HidResult<usize> {
        let mut state = lock(&self.shared);
        if state.fail_io {
            return Err(transfer_failed());
        }
        match state.reads.pop_front() {
            Some(report) => {
                let n = report.len().min(buf.len());
                buf[..n].copy_from_slice(&report[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn send_feature_report(&mut self, data: &[u8]) -> HidResult<usize> {
        let mut state = lock(&self.shared);
        if state.fail_io {
            return Err(transfer_failed());
        }
        state.features_sent.push(data.to_vec());
        Ok(data.len())
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> HidResult<usize> {
        let state = lock(&self.shared);
        if state.fail_io {
            return Err(transfer_failed());
        }
        let report_id = buf.first().copied().unwrap_or(0);
        match state.feature_replies.get(&report_id) {
            Some(reply) => {
                let n = reply.len().min(buf.len());
                buf[..n].copy_from_slice(&reply[..n]);
                Ok(n)
            }
            None => Err(transfer_failed()),
        }
    }

    fn read_string(&mut self, query: StringQuery) -> HidResult<String> {
        let state = lock(&self.shared);
        let value = match query {
            StringQuery::Manufacturer => state.manufacturer.clone(),
            StringQuery::Product => state.product.clone(),
            StringQuery::SerialNumber => state.serial.clone(),
            StringQuery::Indexed(index) => state.indexed.get(&index).cloned(),
        };
        value.ok_or(HidError::Unsupported)
    }
}
