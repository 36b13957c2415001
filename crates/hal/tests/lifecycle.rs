//! Ownership-graph lifetime checks: devices keep their driver (and its
//! symbol-table stand-in) alive, and teardown happens exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hal::{
    Device, DeviceId, DeviceList, Driver, DriverOptions, DriverRegistry, HalError,
    MAX_DEVICE_NAME_LENGTH,
};

/// Stand-in for a dynamically loaded symbol table; counts unloads.
struct FakeSymbols {
    unloads: Arc<AtomicUsize>,
}

impl Drop for FakeSymbols {
    fn drop(&mut self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
    }
}

struct Shared {
    identifier: String,
    device_names: Vec<String>,
    _syms: FakeSymbols,
}

struct FakeDriver {
    shared: Arc<Shared>,
}

impl FakeDriver {
    fn create(device_names: &[&str], unloads: &Arc<AtomicUsize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                identifier: "fake".to_owned(),
                device_names: device_names.iter().map(|&n| n.to_owned()).collect(),
                _syms: FakeSymbols {
                    unloads: Arc::clone(unloads),
                },
            }),
        }
    }
}

impl Driver for FakeDriver {
    fn identifier(&self) -> &str {
        &self.shared.identifier
    }

    fn enumerate_devices(&self) -> Result<DeviceList, HalError> {
        let names = &self.shared.device_names;
        DeviceList::collect(names.len(), |index| {
            Ok((DeviceId(index as u64), names[index].clone()))
        })
    }

    fn create_device(&self, device_id: Option<DeviceId>) -> Result<Box<dyn Device>, HalError> {
        Ok(Box::new(FakeDevice {
            device_id: device_id.unwrap_or(DeviceId(0)),
            _driver: Arc::clone(&self.shared),
        }))
    }
}

struct FakeDevice {
    device_id: DeviceId,
    _driver: Arc<Shared>,
}

impl Device for FakeDevice {
    fn device_id(&self) -> DeviceId {
        self.device_id
    }

    fn label(&self) -> &str {
        "fake"
    }
}

#[test]
fn symbols_unload_once_after_devices_then_driver() {
    let unloads = Arc::new(AtomicUsize::new(0));
    let driver = FakeDriver::create(&["a", "b"], &unloads);

    let first = driver.create_device(Some(DeviceId(0))).unwrap();
    let second = driver.create_device(Some(DeviceId(1))).unwrap();

    drop(first);
    drop(second);
    assert_eq!(unloads.load(Ordering::SeqCst), 0, "driver still alive");

    drop(driver);
    assert_eq!(unloads.load(Ordering::SeqCst), 1);
}

#[test]
fn devices_keep_symbols_alive_past_driver_drop() {
    let unloads = Arc::new(AtomicUsize::new(0));
    let driver = FakeDriver::create(&["a", "b"], &unloads);

    let first = driver.create_device(Some(DeviceId(0))).unwrap();
    let second = driver.create_device(Some(DeviceId(1))).unwrap();

    drop(driver);
    assert_eq!(
        unloads.load(Ordering::SeqCst),
        0,
        "two devices still reference the driver state"
    );

    drop(first);
    assert_eq!(unloads.load(Ordering::SeqCst), 0, "one device left");

    drop(second);
    assert_eq!(unloads.load(Ordering::SeqCst), 1, "teardown happens exactly once");
}

#[test]
fn create_then_drop_releases_everything() {
    let unloads = Arc::new(AtomicUsize::new(0));
    let driver = FakeDriver::create(&["a"], &unloads);
    drop(driver);
    assert_eq!(unloads.load(Ordering::SeqCst), 1);
}

#[test]
fn enumeration_preserves_native_order() {
    let unloads = Arc::new(AtomicUsize::new(0));
    let driver = FakeDriver::create(&["zero", "one", "two"], &unloads);
    let devices = driver.enumerate_devices().unwrap();
    let listed: Vec<(u64, String)> = devices
        .iter()
        .map(|info| (info.device_id.0, info.name.to_owned()))
        .collect();
    assert_eq!(
        listed,
        [
            (0, "zero".to_owned()),
            (1, "one".to_owned()),
            (2, "two".to_owned())
        ]
    );
}

#[test]
fn zero_devices_enumerate_as_empty_success() {
    let unloads = Arc::new(AtomicUsize::new(0));
    let driver = FakeDriver::create(&[], &unloads);
    let devices = driver.enumerate_devices().unwrap();
    assert!(devices.is_empty());
}

#[test]
fn oversized_names_truncate_within_bound() {
    let unloads = Arc::new(AtomicUsize::new(0));
    let long_name = "n".repeat(MAX_DEVICE_NAME_LENGTH * 2);
    let driver = FakeDriver::create(&[long_name.as_str()], &unloads);
    let devices = driver.enumerate_devices().unwrap();
    let info = devices.get(0).unwrap();
    assert_eq!(info.name.len(), MAX_DEVICE_NAME_LENGTH);
    assert!(long_name.starts_with(info.name));
}

#[cfg(feature = "cpu")]
mod cpu_end_to_end {
    use super::*;
    use hal::register_cpu_driver;

    #[test]
    fn registry_to_device_round_trip() {
        let registry = DriverRegistry::new();
        register_cpu_driver(&registry).unwrap();

        let driver = registry.create("cpu", &DriverOptions::default()).unwrap();
        let devices = driver.enumerate_devices().unwrap();
        assert_eq!(devices.len(), 1);

        let device = driver.create_device(None).unwrap();
        assert_eq!(device.device_id(), DeviceId(0));
        assert_eq!(device.label(), "cpu");
    }

    #[test]
    fn default_index_out_of_range_cites_index_and_count() {
        let registry = DriverRegistry::new();
        register_cpu_driver(&registry).unwrap();

        let options = DriverOptions {
            default_device_index: 5,
        };
        let driver = registry.create("cpu", &options).unwrap();
        let err = driver.create_device(None).map(|_| ()).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, HalError::NotFound(_)), "got {message}");
        assert!(
            message.contains("device 5") && message.contains("of 1"),
            "got {message}"
        );
    }
}
