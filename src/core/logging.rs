//! Logger bootstrap for binary surfaces.
//!
//! Library code only uses the `log` facade; the binary decides whether and
//! where records go. Initialization is idempotent; the handle is parked in
//! a process-wide static so the logger outlives the caller.

use flexi_logger::{FileSpec, Logger, LoggerHandle};
use std::path::Path;
use std::sync::OnceLock;

use crate::core::error::CapworksError;

static LOGGER_HANDLE: OnceLock<LoggerHandle> = OnceLock::new();

fn park(handle: LoggerHandle) {
    let _ = LOGGER_HANDLE.set(handle);
}

/// Initializes stderr logging at the given spec (e.g. `"info"`, `"debug"`).
pub fn init_stderr(spec: &str) -> Result<(), CapworksError> {
    if LOGGER_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = Logger::try_with_str(spec)
        .map_err(|e| CapworksError::ConfigError(e.to_string()))?
        .start()
        .map_err(|e| CapworksError::ConfigError(e.to_string()))?;
    park(handle);
    Ok(())
}

/// Initializes file logging under `dir` instead of stderr.
pub fn init_file(spec: &str, dir: &Path) -> Result<(), CapworksError> {
    if LOGGER_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = Logger::try_with_str(spec)
        .map_err(|e| CapworksError::ConfigError(e.to_string()))?
        .log_to_file(FileSpec::default().directory(dir).basename("capworks"))
        .start()
        .map_err(|e| CapworksError::ConfigError(e.to_string()))?;
    park(handle);
    Ok(())
}
