//! Dynamically resolved CUDA driver entry points.
//!
//! The table is all-or-nothing: either every required symbol resolves and a
//! usable [`CudaSymbols`] is returned, or loading fails and nothing escapes.
//! The library handle is held for the lifetime of the table and closed when
//! it drops, after every function pointer is unreachable.

use std::ffi::{c_char, c_int, c_uint};

use libloading::Library;

use crate::device::MAX_DEVICE_NAME_LENGTH;
use crate::error::HalError;

pub(crate) type CUdevice = c_int;
pub(crate) type CUresult = c_int;

pub(crate) const CUDA_SUCCESS: CUresult = 0;

/// Environment variable overriding the library search; checked before the
/// platform's well-known names.
const LIBRARY_PATH_OVERRIDE: &str = "CUDA_LIBRARY_PATH";

type FnCuInit = unsafe extern "C" fn(flags: c_uint) -> CUresult;
type FnCuDriverGetVersion = unsafe extern "C" fn(version: *mut c_int) -> CUresult;
type FnCuDeviceGetCount = unsafe extern "C" fn(count: *mut c_int) -> CUresult;
type FnCuDeviceGet = unsafe extern "C" fn(device: *mut CUdevice, ordinal: c_int) -> CUresult;
type FnCuDeviceGetName =
    unsafe extern "C" fn(name: *mut c_char, len: c_int, dev: CUdevice) -> CUresult;

/// Resolved function pointers plus the library that backs them.
///
/// Field order matters for drop: the pointers are plain `Copy` values, so
/// only `_lib` has a destructor and the library stays open until the whole
/// table goes away.
pub(crate) struct CudaSymbols {
    cu_init: FnCuInit,
    cu_driver_get_version: FnCuDriverGetVersion,
    cu_device_get_count: FnCuDeviceGetCount,
    cu_device_get: FnCuDeviceGet,
    cu_device_get_name: FnCuDeviceGetName,
    _lib: Library,
}

impl CudaSymbols {
    /// Opens the CUDA driver library and resolves every required entry
    /// point. Opening the library may run backend-global initialization
    /// code; that side effect is irreversible for the process.
    pub fn load() -> Result<Self, HalError> {
        let lib = open_library()?;
        unsafe {
            Ok(Self {
                cu_init: resolve(&lib, "cuInit")?,
                cu_driver_get_version: resolve(&lib, "cuDriverGetVersion")?,
                cu_device_get_count: resolve(&lib, "cuDeviceGetCount")?,
                cu_device_get: resolve(&lib, "cuDeviceGet")?,
                cu_device_get_name: resolve(&lib, "cuDeviceGetName")?,
                _lib: lib,
            })
        }
    }

    /// Idempotent runtime initialization; must precede device creation.
    pub fn init(&self) -> Result<(), HalError> {
        check("cuInit", unsafe { (self.cu_init)(0) })
    }

    pub fn driver_version(&self) -> Result<i32, HalError> {
        let mut version: c_int = 0;
        check("cuDriverGetVersion", unsafe {
            (self.cu_driver_get_version)(&mut version)
        })?;
        Ok(version)
    }

    pub fn device_count(&self) -> Result<usize, HalError> {
        let mut count: c_int = 0;
        check("cuDeviceGetCount", unsafe {
            (self.cu_device_get_count)(&mut count)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn device_get(&self, ordinal: usize) -> Result<CUdevice, HalError> {
        let ordinal = c_int::try_from(ordinal)
            .map_err(|_| HalError::InvalidArgument("device ordinal out of range"))?;
        let mut device: CUdevice = 0;
        check("cuDeviceGet", unsafe {
            (self.cu_device_get)(&mut device, ordinal)
        })?;
        Ok(device)
    }

    /// Queries the human-readable device name, bounded to
    /// [`MAX_DEVICE_NAME_LENGTH`] bytes by the call contract.
    pub fn device_name(&self, device: CUdevice) -> Result<String, HalError> {
        let mut buf = [0u8; MAX_DEVICE_NAME_LENGTH];
        check("cuDeviceGetName", unsafe {
            (self.cu_device_get_name)(
                buf.as_mut_ptr().cast::<c_char>(),
                c_int::try_from(buf.len()).unwrap_or(c_int::MAX),
                device,
            )
        })?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }
}

fn check(call: &'static str, code: CUresult) -> Result<(), HalError> {
    if code == CUDA_SUCCESS {
        Ok(())
    } else {
        Err(HalError::Native { call, code })
    }
}

fn candidate_names() -> &'static [&'static str] {
    #[cfg(target_os = "linux")]
    {
        &["libcuda.so.1", "libcuda.so"]
    }
    #[cfg(target_os = "windows")]
    {
        &["nvcuda.dll"]
    }
    #[cfg(target_os = "macos")]
    {
        &["libcuda.dylib"]
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        &[]
    }
}

fn open_library() -> Result<Library, HalError> {
    let mut last_error = String::from("no candidate library names for this platform");

    if let Ok(path) = std::env::var(LIBRARY_PATH_OVERRIDE) {
        match unsafe { Library::new(&path) } {
            Ok(lib) => {
                tracing::info!(path, "loaded cuda driver library from override");
                return Ok(lib);
            }
            Err(err) => last_error = format!("{path}: {err}"),
        }
    }

    for &name in candidate_names() {
        match unsafe { Library::new(name) } {
            Ok(lib) => {
                tracing::info!(name, "loaded cuda driver library");
                return Ok(lib);
            }
            Err(err) => {
                tracing::debug!(name, error = %err, "cuda driver candidate failed to open");
                last_error = format!("{name}: {err}");
            }
        }
    }

    Err(HalError::BackendUnavailable(last_error))
}

/// Resolves one required symbol, surfacing its name on failure.
unsafe fn resolve<F: Copy>(lib: &Library, name: &str) -> Result<F, HalError> {
    let symbol: libloading::Symbol<'_, F> =
        lib.get(name.as_bytes())
            .map_err(|_| HalError::SymbolResolution {
                symbol: name.to_owned(),
            })?;
    Ok(*symbol)
}
