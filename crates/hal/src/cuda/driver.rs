use std::sync::Arc;

use crate::cuda::symbols::{CUdevice, CudaSymbols};
use crate::device::{Device, DeviceId, DeviceList};
use crate::driver::{default_device_not_found, Driver, DriverOptions};
use crate::error::HalError;
use crate::registry::DriverRegistry;

/// Canonical registry identifier for the CUDA backend.
pub const CUDA_DRIVER_ID: &str = "cuda";

struct Shared {
    identifier: String,
    default_device_index: usize,
    syms: CudaSymbols,
}

/// Driver over the dynamically loaded CUDA driver library.
///
/// Creating the driver loads the library and resolves the symbol table; if
/// that fails nothing is handed back and whatever was constructed is torn
/// down. Devices created here keep the driver state (and with it the symbol
/// table) alive until the last of them is gone.
pub struct CudaDriver {
    shared: Arc<Shared>,
}

impl CudaDriver {
    pub fn create(identifier: &str, options: &DriverOptions) -> Result<Self, HalError> {
        if identifier.is_empty() {
            return Err(HalError::InvalidArgument(
                "driver identifier must not be empty",
            ));
        }
        let syms = CudaSymbols::load()?;
        if let Ok(version) = syms.driver_version() {
            tracing::debug!(version, "cuda driver library reports version");
        }
        Ok(Self {
            shared: Arc::new(Shared {
                identifier: identifier.to_owned(),
                default_device_index: options.default_device_index,
                syms,
            }),
        })
    }

    fn select_default_device(&self) -> Result<CUdevice, HalError> {
        let syms = &self.shared.syms;
        let count = syms
            .device_count()
            .map_err(|err| HalError::DeviceCountQuery(err.to_string()))?;
        if count == 0 || self.shared.default_device_index >= count {
            return Err(default_device_not_found(
                self.shared.default_device_index,
                count,
            ));
        }
        syms.device_get(self.shared.default_device_index)
    }
}

impl Driver for CudaDriver {
    fn identifier(&self) -> &str {
        &self.shared.identifier
    }

    fn enumerate_devices(&self) -> Result<DeviceList, HalError> {
        let syms = &self.shared.syms;
        let count = syms
            .device_count()
            .map_err(|err| HalError::DeviceCountQuery(err.to_string()))?;
        DeviceList::collect(count, |index| {
            let device = syms.device_get(index)?;
            let name = syms.device_name(device)?;
            Ok((DeviceId(device as u64), name))
        })
    }

    fn create_device(&self, device_id: Option<DeviceId>) -> Result<Box<dyn Device>, HalError> {
        let span = tracing::debug_span!("cuda_create_device");
        let _entered = span.enter();

        let syms = &self.shared.syms;
        syms.init()
            .map_err(|err| HalError::BackendInit(err.to_string()))?;

        // Either the caller-supplied handle from a prior enumeration, or the
        // default configured when the driver was created.
        let device: CUdevice = match device_id {
            Some(id) => id.0 as CUdevice,
            None => self.select_default_device()?,
        };

        tracing::info!(device, "created cuda device");
        Ok(Box::new(CudaDevice {
            device_id: DeviceId(device as u64),
            _driver: Arc::clone(&self.shared),
        }))
    }
}

/// One CUDA device. Holds the native handle (via its id) and a reference to
/// the driver so the symbol table outlives the device.
pub struct CudaDevice {
    device_id: DeviceId,
    _driver: Arc<Shared>,
}

impl Device for CudaDevice {
    fn device_id(&self) -> DeviceId {
        self.device_id
    }

    fn label(&self) -> &str {
        "cuda"
    }
}

/// Installs the CUDA factory in `registry` under [`CUDA_DRIVER_ID`].
pub fn register_cuda_driver(registry: &DriverRegistry) -> Result<(), HalError> {
    registry.register(
        CUDA_DRIVER_ID,
        Arc::new(|id, options| {
            let driver: Arc<dyn Driver> = Arc::new(CudaDriver::create(id, options)?);
            Ok(driver)
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // Works with or without a CUDA installation: either the driver comes up
    // with its symbol table fully resolved, or creation fails cleanly with a
    // load-stage error and nothing is left behind.
    #[test]
    fn create_is_all_or_nothing() {
        match CudaDriver::create("cuda", &DriverOptions::default()) {
            Ok(driver) => assert_eq!(driver.identifier(), "cuda"),
            Err(err) => assert!(
                matches!(
                    err,
                    HalError::BackendUnavailable(_) | HalError::SymbolResolution { .. }
                ),
                "got {err:?}"
            ),
        }
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let result = CudaDriver::create("", &DriverOptions::default());
        assert!(matches!(result, Err(HalError::InvalidArgument(_))));
    }
}
