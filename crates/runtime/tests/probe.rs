use std::process::Command;

// The cpu backend is always compiled in, so the probe must come up with at
// least one device and exit cleanly.
#[test]
fn device_probe_executes_successfully() {
    let output = Command::new(env!("CARGO_BIN_EXE_device_probe"))
        .output()
        .expect("failed to launch device_probe");
    assert!(
        output.status.success(),
        "device_probe failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
}
