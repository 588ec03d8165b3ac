use rawhid::HidContext;

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let vid = parse_hex(args.next()).expect("usage: read_input <vid> <pid>");
    let pid = parse_hex(args.next()).expect("usage: read_input <vid> <pid>");

    let ctx = HidContext::init().expect("init HID subsystem");
    let mut device =
        rawhid::HidDevice::open_by_ids(&ctx, vid, pid, None).expect("open device by ids");

    if let Ok(product) = device.get_product_string() {
        println!("Reading from {product} ({vid:04x}:{pid:04x})");
    }

    loop {
        let report = device
            .read_timeout(64, 1000)
            .expect("read input report");
        if report.is_empty() {
            println!("(no report within 1s)");
            continue;
        }
        let hex: Vec<String> = report.iter().map(|b| format!("{b:02x}")).collect();
        println!("[{} bytes] {}", report.len(), hex.join(" "));
    }
}

fn parse_hex(arg: Option<String>) -> Option<u16> {
    let arg = arg?;
    let trimmed = arg.trim_start_matches("0x");
    u16::from_str_radix(trimmed, 16).ok()
}
