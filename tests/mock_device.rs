//! Full device API exercised over the in-memory mock transport.
//!
//! The context these handles capture is process-wide state; every test
//! grabs the same mutex so init/exit in one test cannot invalidate the
//! handles of another running in parallel.

use std::sync::{Mutex, MutexGuard};

use rawhid::backends::mock::MockTransport;
use rawhid::{HidContext, HidDevice, HidError};

static CONTEXT_LOCK: Mutex<()> = Mutex::new(());

fn serialize() -> MutexGuard<'static, ()> {
    CONTEXT_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn open_mock(ctx: &HidContext) -> (HidDevice, rawhid::backends::mock::MockHandle) {
    let transport = MockTransport::new();
    let handle = transport.handle();
    let device = HidDevice::from_transport(ctx, Box::new(transport)).unwrap();
    (device, handle)
}

#[test]
fn echo_loopback_preserves_exact_report_bytes() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();

    let transport = MockTransport::echo();
    let mut device = HidDevice::from_transport(&ctx, Box::new(transport)).unwrap();

    // Embedded and trailing zeros must survive the round trip untruncated.
    let report = [0x00, 0x12, 0x00, 0x00, 0x34, 0x00];
    assert_eq!(device.write(&report).unwrap(), report.len());

    let echoed = device.read_timeout(64, 100).unwrap();
    assert_eq!(echoed, report);
}

#[test]
fn nonblocking_read_with_nothing_pending_is_empty() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, _handle) = open_mock(&ctx);

    device.set_nonblocking(true).unwrap();
    assert_eq!(device.read(64).unwrap(), Vec::<u8>::new());

    // Zero-timeout polling reports the same empty result.
    assert_eq!(device.read_timeout(64, 0).unwrap(), Vec::<u8>::new());
}

#[test]
fn scripted_reads_come_back_in_order() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, handle) = open_mock(&ctx);

    handle.queue_read(vec![0x01, 0xAA]);
    handle.queue_read(vec![0x02, 0xBB, 0xCC]);

    assert_eq!(device.read_timeout(64, 10).unwrap(), vec![0x01, 0xAA]);
    assert_eq!(device.read_timeout(64, 10).unwrap(), vec![0x02, 0xBB, 0xCC]);
    assert_eq!(handle.pending_reads(), 0);
}

#[test]
fn read_truncates_to_requested_buffer_size() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, handle) = open_mock(&ctx);

    handle.queue_read(vec![0x01, 0x02, 0x03, 0x04]);
    assert_eq!(device.read_timeout(2, 10).unwrap(), vec![0x01, 0x02]);
}

#[test]
fn empty_write_is_rejected_before_the_transport() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, handle) = open_mock(&ctx);

    assert!(matches!(
        device.write(&[]),
        Err(HidError::InvalidArgument { .. })
    ));
    assert!(handle.writes().is_empty());
    assert!(device.last_error().is_some());
}

#[test]
fn feature_report_send_frames_the_report_id() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, handle) = open_mock(&ctx);

    assert_eq!(device.send_feature_report(0x05, &[0x01, 0x02]).unwrap(), 3);
    assert_eq!(handle.features_sent(), vec![vec![0x05, 0x01, 0x02]]);
}

#[test]
fn feature_report_get_honors_max_length() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, handle) = open_mock(&ctx);

    handle.set_feature_reply(0x05, vec![0x05, 0x11, 0x22, 0x33]);

    let full = device.get_feature_report(0x05, 64).unwrap();
    assert_eq!(full, vec![0x05, 0x11, 0x22, 0x33]);

    let clipped = device.get_feature_report(0x05, 2).unwrap();
    assert_eq!(clipped, vec![0x05, 0x11]);

    assert!(matches!(
        device.get_feature_report(0x05, 0),
        Err(HidError::InvalidArgument { .. })
    ));
}

#[test]
fn descriptor_strings_come_from_the_transport() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, handle) = open_mock(&ctx);

    handle.set_strings(Some("Sony"), Some("Wireless Controller"), Some("a1b2c3"));
    handle.set_indexed_string(4, "extra descriptor");

    assert_eq!(device.get_manufacturer_string().unwrap(), "Sony");
    assert_eq!(device.get_product_string().unwrap(), "Wireless Controller");
    assert_eq!(device.get_serial_number_string().unwrap(), "a1b2c3");
    assert_eq!(device.get_indexed_string(4).unwrap(), "extra descriptor");
    assert!(matches!(
        device.get_indexed_string(9),
        Err(HidError::Unsupported)
    ));
}

#[test]
fn closed_handle_rejects_every_operation() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, handle) = open_mock(&ctx);

    handle.queue_read(vec![0x01]);
    device.close();
    assert!(!device.is_open());

    assert!(matches!(device.write(&[0x00, 0x01]), Err(HidError::InvalidState)));
    // Handle state outranks argument validation: even inputs that would be
    // rejected as InvalidArgument on an open handle fail InvalidState here.
    assert!(matches!(device.write(&[]), Err(HidError::InvalidState)));
    assert!(matches!(
        device.get_feature_report(0x05, 0),
        Err(HidError::InvalidState)
    ));
    assert!(matches!(device.read(64), Err(HidError::InvalidState)));
    assert!(matches!(
        device.send_feature_report(0x01, &[]),
        Err(HidError::InvalidState)
    ));
    assert!(matches!(
        device.get_manufacturer_string(),
        Err(HidError::InvalidState)
    ));
    assert!(matches!(
        device.set_nonblocking(true),
        Err(HidError::InvalidState)
    ));

    // The transport never saw the post-close traffic.
    assert!(handle.writes().is_empty());
    assert_eq!(handle.pending_reads(), 1);

    // Second close is a no-op.
    device.close();
    assert!(!device.is_open());
}

#[test]
fn close_and_drop_both_release_the_session() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();

    let (mut device, handle) = open_mock(&ctx);
    assert!(!handle.is_dropped());
    device.close();
    assert!(handle.is_dropped());

    let (device, handle) = open_mock(&ctx);
    drop(device);
    assert!(handle.is_dropped());
}

#[test]
fn io_failures_surface_and_are_remembered() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, handle) = open_mock(&ctx);

    handle.set_fail_io(true);
    assert!(matches!(device.write(&[0x00, 0x01]), Err(HidError::Io { .. })));
    let message = device.last_error().unwrap();
    assert!(message.contains("mock transfer failure"), "{message}");

    // The handle stays usable once the fault clears.
    handle.set_fail_io(false);
    assert_eq!(device.write(&[0x00, 0x01]).unwrap(), 2);
}

#[test]
fn exit_invalidates_surviving_handles_even_across_reinit() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    let (mut device, _handle) = open_mock(&ctx);

    ctx.exit().unwrap();
    assert!(matches!(
        device.write(&[0x00, 0x01]),
        Err(HidError::NotInitialized)
    ));

    // Re-initializing starts a new generation; the old handle stays dead.
    let fresh = HidContext::init().unwrap();
    assert!(matches!(device.read(64), Err(HidError::NotInitialized)));

    // New handles against the fresh context work.
    let (mut device, _handle) = open_mock(&fresh);
    assert_eq!(device.write(&[0x00, 0x01]).unwrap(), 2);
    fresh.exit().unwrap();
}

#[test]
fn wildcard_and_absent_enumeration_filters_agree() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();

    let by_none = ctx.enumerate(None, None).unwrap();
    let by_zero = ctx.enumerate(Some(0), Some(0)).unwrap();
    assert_eq!(by_none, by_zero);
}

#[test]
fn enumeration_requires_a_live_context() {
    let _guard = serialize();
    let ctx = HidContext::init().unwrap();
    ctx.exit().unwrap();

    assert!(matches!(
        ctx.enumerate(None, None),
        Err(HidError::NotInitialized)
    ));
    assert!(matches!(
        HidDevice::open_by_path(&ctx, "/dev/hidraw0"),
        Err(HidError::NotInitialized)
    ));
}
