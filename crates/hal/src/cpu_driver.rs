//! Host-CPU driver.
//!
//! Always available: no native library to load, exactly one device. Useful
//! as a fallback execution target and as a deterministic exercise of the
//! registry and device lifecycle paths.

use std::sync::Arc;

use crate::device::{Device, DeviceId, DeviceList};
use crate::driver::{default_device_not_found, Driver, DriverOptions};
use crate::error::HalError;
use crate::registry::DriverRegistry;

/// Canonical registry identifier for the host-CPU backend.
pub const CPU_DRIVER_ID: &str = "cpu";

struct Shared {
    identifier: String,
    default_device_index: usize,
}

/// Driver exposing the host CPU as a single device.
pub struct CpuDriver {
    shared: Arc<Shared>,
}

impl CpuDriver {
    pub fn create(identifier: &str, options: &DriverOptions) -> Result<Self, HalError> {
        if identifier.is_empty() {
            return Err(HalError::InvalidArgument(
                "driver identifier must not be empty",
            ));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                identifier: identifier.to_owned(),
                default_device_index: options.default_device_index,
            }),
        })
    }

    fn device_name() -> String {
        let threads = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        format!("host cpu ({threads} threads)")
    }
}

impl Driver for CpuDriver {
    fn identifier(&self) -> &str {
        &self.shared.identifier
    }

    fn enumerate_devices(&self) -> Result<DeviceList, HalError> {
        let mut builder = DeviceList::builder(1)?;
        builder.push(DeviceId(0), &Self::device_name());
        Ok(builder.finish())
    }

    fn create_device(&self, device_id: Option<DeviceId>) -> Result<Box<dyn Device>, HalError> {
        let device_id = match device_id {
            Some(id) => id,
            None => {
                // One device; any other default index is out of range.
                if self.shared.default_device_index >= 1 {
                    return Err(default_device_not_found(self.shared.default_device_index, 1));
                }
                DeviceId(0)
            }
        };
        tracing::debug!(id = %device_id, "created cpu device");
        Ok(Box::new(CpuDevice {
            device_id,
            _driver: Arc::clone(&self.shared),
        }))
    }
}

/// The host CPU as an execution context.
pub struct CpuDevice {
    device_id: DeviceId,
    // Keeps the creating driver alive for as long as the device exists.
    _driver: Arc<Shared>,
}

impl Device for CpuDevice {
    fn device_id(&self) -> DeviceId {
        self.device_id
    }

    fn label(&self) -> &str {
        "cpu"
    }
}

/// Installs the CPU factory in `registry` under [`CPU_DRIVER_ID`].
pub fn register_cpu_driver(registry: &DriverRegistry) -> Result<(), HalError> {
    registry.register(
        CPU_DRIVER_ID,
        Arc::new(|id, options| {
            let driver: Arc<dyn Driver> = Arc::new(CpuDriver::create(id, options)?);
            Ok(driver)
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_one_device() {
        let driver = CpuDriver::create("cpu", &DriverOptions::default()).unwrap();
        let devices = driver.enumerate_devices().unwrap();
        assert_eq!(devices.len(), 1);
        let info = devices.get(0).unwrap();
        assert_eq!(info.device_id, DeviceId(0));
        assert!(info.name.contains("cpu"), "got name {:?}", info.name);
    }

    #[test]
    fn default_device_is_index_zero() {
        let driver = CpuDriver::create("cpu", &DriverOptions::default()).unwrap();
        let device = driver.create_device(None).unwrap();
        assert_eq!(device.device_id(), DeviceId(0));
        assert_eq!(device.label(), "cpu");
    }

    #[test]
    fn out_of_range_default_index_is_not_found() {
        let options = DriverOptions {
            default_device_index: 5,
        };
        let driver = CpuDriver::create("cpu", &options).unwrap();
        let err = driver.create_device(None).map(|_| ()).unwrap_err();
        assert!(matches!(err, HalError::NotFound(_)), "got {err:?}");
        assert!(err.to_string().contains("device 5"), "got {err}");
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let result = CpuDriver::create("", &DriverOptions::default());
        assert!(matches!(result, Err(HalError::InvalidArgument(_))));
    }
}
