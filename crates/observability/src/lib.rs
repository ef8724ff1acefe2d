//! Tracing/logging setup shared by binaries.

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging in the given format.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
