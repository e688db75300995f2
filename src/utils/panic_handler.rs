//! Panic Handling and Recovery
//!
//! wgpu reports validation failures through its default uncaptured-error
//! handler, which panics. Setup and frame execution run inside these
//! wrappers so a bad shader turns into a diagnostic instead of a crash.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::utils::errors::{panic_to_string, ShaderError};

/// Result type for operations that might panic
pub type PanicResult<T> = Result<T, String>;

/// Catch panics from a mutable closure
///
/// Uses `AssertUnwindSafe`: callers drop whatever state the closure was
/// building when it panics, so nothing half-initialised is observed.
pub fn catch_panic_mut<F, T>(f: F) -> PanicResult<T>
where
    F: FnOnce() -> T,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Ok(result),
        Err(panic_info) => {
            let message = panic_to_string(panic_info);
            log::error!("[Panic] Caught panic: {}", message);
            Err(message)
        }
    }
}

/// Run a fallible GPU operation, folding a caught panic into `ShaderError::Gpu`.
pub fn guard_gpu<F, T>(f: F) -> Result<T, ShaderError>
where
    F: FnOnce() -> Result<T, ShaderError>,
{
    match catch_panic_mut(f) {
        Ok(result) => result,
        Err(panic_msg) => Err(ShaderError::Gpu(format_panic_message(&panic_msg))),
    }
}

/// Format a panic message for user display
pub fn format_panic_message(panic_msg: &str) -> String {
    // WGPU errors often have "wgpu error:" prefix
    if let Some(start) = panic_msg.find("wgpu error:") {
        return format!("GPU Error\n\n{}", &panic_msg[start..]);
    }

    if panic_msg.contains("Validation Error") {
        return format!("Shader Validation Error\n\n{}", panic_msg);
    }

    format!("Internal Error\n\n{}", panic_msg)
}
