//! CUDA backend: a driver over `libcuda` loaded at runtime.
//!
//! The host process carries no link-time dependency on CUDA; the library is
//! opened and its entry points resolved when the driver is created, and
//! closed again when the last device and driver handle are gone.

mod driver;
mod symbols;

pub use driver::{register_cuda_driver, CudaDevice, CudaDriver, CUDA_DRIVER_ID};
