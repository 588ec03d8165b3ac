//! Process-wide library context.
//!
//! [`HidContext`] models the init/exit pair the underlying platform
//! subsystem wants around device access. It is an explicit value passed to
//! enumeration and open calls rather than ambient global state, but the
//! state it guards *is* process-wide: a mutex-protected
//! `{initialized, generation}` pair.
//!
//! # Semantics
//! - [`HidContext::init`] is idempotent; a second call while initialized
//!   succeeds without side effects and hands back a context for the same
//!   underlying state.
//! - [`HidContext::exit`] is a no-op success when nothing is initialized.
//! - After `exit`, every surviving [`HidDevice`](crate::HidDevice) fails
//!   with [`HidError::NotInitialized`] — enforced, not left as caller UB.
//!   Handles capture the *generation* current at open time, so they stay
//!   dead even if the context is re-initialized later.
//!
//! Concurrent `init`/`exit` calls are serialized by the internal mutex.

use std::sync::Mutex;

use tracing::debug;

use crate::backends;
use crate::error::{HidError, HidResult};
use crate::info::DeviceInfo;

struct ContextState {
    initialized: bool,
    /// Bumped on every successful (re-)initialization.
    generation: u64,
}

static STATE: Mutex<ContextState> = Mutex::new(ContextState {
    initialized: false,
    generation: 0,
});

/// Handle to the process-wide HID subsystem state.
///
/// Cheap to copy; all copies refer to the same underlying state. Obtain one
/// via [`HidContext::init`], then use it to enumerate and open devices:
///
/// ```no_run
/// use rawhid::HidContext;
///
/// let ctx = HidContext::init().expect("init HID subsystem");
/// for info in ctx.enumerate(None, None).expect("enumerate") {
///     println!("{:04x}:{:04x} {}", info.vendor_id, info.product_id, info.path);
/// }
/// ctx.exit().expect("exit");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct HidContext {
    generation: u64,
}

impl HidContext {
    /// Initialize the HID subsystem (idempotent).
    ///
    /// Calling while already initialized succeeds and returns a context for
    /// the existing state.
    pub fn init() -> HidResult<Self> {
        let mut state = STATE.lock().unwrap_or_else(|e| e.into_inner());
        if !state.initialized {
            state.initialized = true;
            state.generation += 1;
            debug!(generation = state.generation, "HID context initialized");
        }
        Ok(Self {
            generation: state.generation,
        })
    }

    /// Tear down the HID subsystem.
    ///
    /// A no-op success when not initialized, or when this context value is
    /// stale (its state was already torn down and a newer one initialized).
    /// On success all outstanding device handles become invalid for further
    /// I/O; they report [`HidError::NotInitialized`] from then on.
    pub fn exit(&self) -> HidResult<()> {
        let mut state = STATE.lock().unwrap_or_else(|e| e.into_inner());
        if state.initialized && state.generation == self.generation {
            state.initialized = false;
            debug!(generation = self.generation, "HID context torn down");
        }
        Ok(())
    }

    /// Enumerate HID interfaces currently visible to the operating system.
    ///
    /// `vendor` / `product` restrict the result to matching ids; `None` and
    /// `Some(0)` both mean "match any". Returns an empty vector — not an
    /// error — when nothing matches. Ordering is OS-defined and not stable
    /// across calls.
    pub fn enumerate(
        &self,
        vendor: Option<u16>,
        product: Option<u16>,
    ) -> HidResult<Vec<DeviceInfo>> {
        self.ensure_active()?;

        let mut devices = backends::enumerate()?;
        devices.retain(|d| {
            matches_filter(d.vendor_id, vendor) && matches_filter(d.product_id, product)
        });
        Ok(devices)
    }

    /// Error with [`HidError::NotInitialized`] unless this context's state
    /// is still the live, initialized one.
    pub(crate) fn ensure_active(&self) -> HidResult<()> {
        let state = STATE.lock().unwrap_or_else(|e| e.into_inner());
        if state.initialized && state.generation == self.generation {
            Ok(())
        } else {
            Err(HidError::NotInitialized)
        }
    }

    /// Generation token captured by device handles at open time.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Rebuild a context from a captured generation token.
    pub(crate) fn from_generation(generation: u64) -> Self {
        Self { generation }
    }
}

/// `None` and `Some(0)` both mean "any" (matching the native enumeration
/// convention where a zero id is the wildcard).
fn matches_filter(id: u16, filter: Option<u16>) -> bool {
    match filter {
        None | Some(0) => true,
        Some(wanted) => id == wanted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_absent_filters_are_equivalent() {
        assert!(matches_filter(0x054C, None));
        assert!(matches_filter(0x054C, Some(0)));
        assert!(matches_filter(0x054C, Some(0x054C)));
        assert!(!matches_filter(0x054C, Some(0x1234)));
    }

    // The whole lifecycle lives in one test: the state under test is
    // process-wide and the test harness runs tests concurrently.
    #[test]
    fn init_exit_lifecycle() {
        let ctx = HidContext::init().unwrap();
        // Second init while initialized succeeds and refers to the same state.
        let again = HidContext::init().unwrap();
        assert_eq!(ctx.generation(), again.generation());
        assert!(ctx.ensure_active().is_ok());

        ctx.exit().unwrap();
        assert!(matches!(
            ctx.ensure_active(),
            Err(HidError::NotInitialized)
        ));
        // Exit when not initialized is a no-op success.
        ctx.exit().unwrap();

        // Re-init bumps the generation; the old context stays dead.
        let fresh = HidContext::init().unwrap();
        assert_ne!(ctx.generation(), fresh.generation());
        assert!(matches!(
            ctx.ensure_active(),
            Err(HidError::NotInitialized)
        ));
        assert!(fresh.ensure_active().is_ok());
    }
}
