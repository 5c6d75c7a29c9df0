//! Error types for the benchmark runner

use ruvector_memtrace::MemtraceError;
use thiserror::Error;

/// Result type alias for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Main error type for the benchmark runner
#[derive(Error, Debug)]
pub enum BenchError {
    /// CSV export without any configured model
    #[error("At least 1 model should be defined, but got 0")]
    NoModels,

    /// Explicit configs do not line up with the model list
    #[error("Got {configs} configs for {models} models")]
    ConfigCountMismatch {
        /// Number of configured model names
        models: usize,
        /// Number of configs supplied
        configs: usize,
    },

    /// No config could be resolved for a model name
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// CSV writer errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Memory tracing errors
    #[error("Trace error: {0}")]
    Trace(#[from] MemtraceError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
