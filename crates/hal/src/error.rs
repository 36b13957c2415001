use thiserror::Error;

/// Errors produced by the driver and device lifecycle layer.
///
/// Native failure codes are preserved together with the name of the failing
/// entry point so callers can report diagnostics without re-querying the
/// backend.
#[derive(Error, Debug)]
pub enum HalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("driver '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend library unavailable: {0}")]
    BackendUnavailable(String),
    #[error("failed to resolve required symbol '{symbol}'")]
    SymbolResolution { symbol: String },
    #[error("device count query failed: {0}")]
    DeviceCountQuery(String),
    #[error("backend initialization failed: {0}")]
    BackendInit(String),
    #[error("host allocation failed")]
    AllocationFailed,
    #[error("native call {call} failed with code {code}")]
    Native { call: &'static str, code: i32 },
}
