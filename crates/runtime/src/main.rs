#![deny(clippy::all, clippy::pedantic)]

use anyhow::Result;
use hal::{DriverOptions, DriverRegistry};

fn register_backends(registry: &DriverRegistry) -> Result<()> {
    hal::register_cpu_driver(registry)?;

    #[cfg(feature = "cuda")]
    hal::register_cuda_driver(registry)?;

    #[cfg(feature = "gpu")]
    hal::register_wgpu_driver(registry)?;

    Ok(())
}

/// Creates a driver, enumerates its devices, and opens the default device.
/// Returns whether a device came up.
fn probe_driver(registry: &DriverRegistry, name: &str, options: &DriverOptions) -> bool {
    let driver = match registry.create(name, options) {
        Ok(driver) => driver,
        Err(e) => {
            tracing::error!(driver = name, "failed to create driver: {e}");
            return false;
        }
    };

    match driver.enumerate_devices() {
        Ok(devices) => {
            tracing::info!(driver = name, count = devices.len(), "enumerated devices");
            for info in devices.iter() {
                tracing::info!(driver = name, id = %info.device_id, name = info.name, "device");
            }
        }
        Err(e) => tracing::error!(driver = name, "device enumeration failed: {e}"),
    }

    match driver.create_device(None) {
        Ok(device) => {
            tracing::info!(
                driver = name,
                id = %device.device_id(),
                label = device.label(),
                "created default device"
            );
            true
        }
        Err(e) => {
            tracing::error!(driver = name, "failed to create default device: {e}");
            false
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let registry = hal::registry();
    register_backends(registry)?;
    tracing::info!(drivers = ?registry.names(), "registered backends");

    let options = DriverOptions::default();
    let mut devices_created = 0_usize;
    for name in registry.names() {
        if probe_driver(registry, &name, &options) {
            devices_created += 1;
        }
    }

    if devices_created == 0 {
        anyhow::bail!("no backend produced a device");
    }
    tracing::info!(devices_created, "probe complete");
    Ok(())
}
