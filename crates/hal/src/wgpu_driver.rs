//! wgpu backend: adapters exposed as HAL devices.
//!
//! Unlike the CUDA backend there is no dynamic loading here; wgpu links its
//! platform APIs itself. Device ids are adapter indices in instance
//! enumeration order, and creating a device acquires a `wgpu::Device` and
//! queue from the selected adapter.

use std::sync::Arc;

use crate::device::{Device, DeviceId, DeviceList};
use crate::driver::{default_device_not_found, Driver, DriverOptions};
use crate::error::HalError;
use crate::registry::DriverRegistry;

/// Canonical registry identifier for the wgpu backend.
pub const WGPU_DRIVER_ID: &str = "wgpu";

struct Shared {
    identifier: String,
    default_device_index: usize,
    instance: wgpu::Instance,
}

/// Driver enumerating wgpu adapters.
pub struct WgpuDriver {
    shared: Arc<Shared>,
}

impl WgpuDriver {
    pub fn create(identifier: &str, options: &DriverOptions) -> Result<Self, HalError> {
        if identifier.is_empty() {
            return Err(HalError::InvalidArgument(
                "driver identifier must not be empty",
            ));
        }
        let instance = wgpu::Instance::default();
        Ok(Self {
            shared: Arc::new(Shared {
                identifier: identifier.to_owned(),
                default_device_index: options.default_device_index,
                instance,
            }),
        })
    }

    fn adapters(&self) -> Vec<wgpu::Adapter> {
        self.shared.instance.enumerate_adapters(wgpu::Backends::all())
    }
}

impl Driver for WgpuDriver {
    fn identifier(&self) -> &str {
        &self.shared.identifier
    }

    fn enumerate_devices(&self) -> Result<DeviceList, HalError> {
        let adapters = self.adapters();
        DeviceList::collect(adapters.len(), |index| {
            let info = adapters[index].get_info();
            Ok((DeviceId(index as u64), info.name))
        })
    }

    fn create_device(&self, device_id: Option<DeviceId>) -> Result<Box<dyn Device>, HalError> {
        let span = tracing::debug_span!("wgpu_create_device");
        let _entered = span.enter();

        let mut adapters = self.adapters();
        let index = match device_id {
            Some(id) => usize::try_from(id.0)
                .map_err(|_| HalError::InvalidArgument("device id out of range"))?,
            None => {
                if adapters.is_empty() || self.shared.default_device_index >= adapters.len() {
                    return Err(default_device_not_found(
                        self.shared.default_device_index,
                        adapters.len(),
                    ));
                }
                self.shared.default_device_index
            }
        };
        if index >= adapters.len() {
            return Err(HalError::NotFound(format!(
                "adapter {index} not found (of {} enumerated)",
                adapters.len()
            )));
        }
        let adapter = adapters.swap_remove(index);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("hal-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|err| HalError::BackendUnavailable(err.to_string()))?;

        tracing::info!(index, "created wgpu device");
        Ok(Box::new(WgpuDevice {
            device_id: DeviceId(index as u64),
            device,
            queue,
            _driver: Arc::clone(&self.shared),
        }))
    }
}

/// One wgpu adapter opened as a device. The `wgpu::Device`/`Queue` pair is
/// the native handle for everything downstream of this subsystem.
pub struct WgpuDevice {
    device_id: DeviceId,
    #[allow(dead_code)] // held for the out-of-scope execution layers
    device: wgpu::Device,
    #[allow(dead_code)]
    queue: wgpu::Queue,
    _driver: Arc<Shared>,
}

impl Device for WgpuDevice {
    fn device_id(&self) -> DeviceId {
        self.device_id
    }

    fn label(&self) -> &str {
        "wgpu"
    }
}

/// Installs the wgpu factory in `registry` under [`WGPU_DRIVER_ID`].
pub fn register_wgpu_driver(registry: &DriverRegistry) -> Result<(), HalError> {
    registry.register(
        WGPU_DRIVER_ID,
        Arc::new(|id, options| {
            let driver: Arc<dyn Driver> = Arc::new(WgpuDriver::create(id, options)?);
            Ok(driver)
        }),
    )
}
