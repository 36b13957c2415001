#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
//! Hardware abstraction layer: backend drivers and device lifecycle.
//!
//! One polymorphic interface over heterogeneous compute backends. A backend
//! ships a [`Driver`] implementation plus a factory registered under a name
//! in the [`DriverRegistry`]; callers create drivers by name, enumerate the
//! devices a driver controls, and create [`Device`] handles from the
//! enumeration results.
//!
//! Backends are feature-gated modules:
//!
//! -   `cpu` (default): the host CPU as a single always-available device.
//! -   `cuda`: the CUDA driver library, loaded dynamically at driver
//!     creation so the process carries no link-time dependency on it.
//! -   `gpu`: wgpu adapters exposed as devices.
//!
//! Lifetimes follow the ownership graph rather than caller discipline: a
//! device holds a reference to the driver that created it, so driver state
//! (including any dynamically loaded symbol table) outlives every device,
//! and native libraries unload only after the last handle drops.

pub mod device;
pub mod driver;
pub mod error;
pub mod registry;

#[cfg(feature = "cpu")]
pub mod cpu_driver;
#[cfg(feature = "cuda")]
pub mod cuda;
#[cfg(feature = "gpu")]
pub mod wgpu_driver;

pub use device::{Device, DeviceId, DeviceInfo, DeviceList, DeviceListBuilder, MAX_DEVICE_NAME_LENGTH};
pub use driver::{Driver, DriverOptions};
pub use error::HalError;
pub use registry::{registry, DriverFactory, DriverRegistry};

#[cfg(feature = "cpu")]
pub use cpu_driver::{register_cpu_driver, CpuDriver, CPU_DRIVER_ID};
#[cfg(feature = "cuda")]
pub use cuda::{register_cuda_driver, CudaDriver, CUDA_DRIVER_ID};
#[cfg(feature = "gpu")]
pub use wgpu_driver::{register_wgpu_driver, WgpuDriver, WGPU_DRIVER_ID};
