use crate::device::{Device, DeviceId, DeviceList};
use crate::error::HalError;

/// Configuration recognized by every driver factory.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Which enumerated device `create_device(None)` resolves to.
    pub default_device_index: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            default_device_index: 0,
        }
    }
}

/// One backend implementation instance.
///
/// A driver owns whatever it needs to talk to its native backend (for
/// dynamically loaded backends, the resolved symbol table) and hands out
/// devices that keep that state alive for as long as they exist. Drivers are
/// safe to share across threads; nothing mutates after construction.
pub trait Driver: Send + Sync {
    /// Identifier this driver was created under in the registry.
    fn identifier(&self) -> &str;

    /// Enumerates the devices currently visible to the backend, in native
    /// enumeration order. A backend reporting zero devices yields an empty
    /// list, not an error. The result is a point-in-time snapshot.
    fn enumerate_devices(&self) -> Result<DeviceList, HalError>;

    /// Creates a device from an enumerated identifier, or from the
    /// configured default device when `device_id` is `None`.
    fn create_device(&self, device_id: Option<DeviceId>) -> Result<Box<dyn Device>, HalError>;
}

/// Shared error shape for default-device selection across backends.
pub(crate) fn default_device_not_found(default_device_index: usize, count: usize) -> HalError {
    HalError::NotFound(format!(
        "default device {default_device_index} not found (of {count} enumerated)"
    ))
}
