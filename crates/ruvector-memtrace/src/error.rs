//! Error types for memory tracing
//!
//! Missing memory backends are not errors: they downgrade the session to
//! zero-valued readings. The variants here cover the cases a caller can act on.

use thiserror::Error;

/// Result type alias for memtrace operations
pub type Result<T> = std::result::Result<T, MemtraceError>;

/// Main error type for memtrace
#[derive(Error, Debug)]
pub enum MemtraceError {
    /// A tracing session is already installed in this process
    #[error("a memory tracing session is already active in this process")]
    SessionActive,

    /// The accelerator library could not be loaded or initialized
    #[error("Accelerator backend unavailable: {0}")]
    AcceleratorUnavailable(String),

    /// A per-device accelerator query failed
    #[error("Accelerator query failed on device {device}: return code {code}")]
    AcceleratorQuery {
        /// Device index that was queried
        device: u32,
        /// Raw return code from the driver library
        code: i32,
    },

    /// Unknown trace event name
    #[error("Invalid trace event: {0}")]
    InvalidEvent(String),
}
