use rawhid::HidContext;

fn main() {
    tracing_subscriber::fmt::init();

    let ctx = HidContext::init().expect("init HID subsystem");
    let devices = ctx.enumerate(None, None).expect("enumerate HID devices");

    println!("Found {} HID interface(s)", devices.len());
    for info in &devices {
        println!(
            "VID:PID={:04x}:{:04x} rel={:04x} up=0x{:02x} u=0x{:02x} iface={} bus={:?} mfr={:?} prod={:?} ser={:?} path={}",
            info.vendor_id,
            info.product_id,
            info.release_number,
            info.usage_page,
            info.usage,
            info.interface_number,
            info.bus_type,
            info.manufacturer_string,
            info.product_string,
            info.serial_number,
            info.path
        );
    }

    ctx.exit().expect("exit");
}
