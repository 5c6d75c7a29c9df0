//! Line-level memory tracing for model benchmarks.
//!
//! Instrumented code calls [`checkpoint!`] or [`trace_scope!`]; while a
//! session started by [`start_memory_tracing`] is active, every point that
//! passes the module and event filters samples host resident memory and
//! accelerator used memory. [`summarize`] turns the finished trace into
//! per-step deltas, per-location totals and an overall increase.
//!
//! ```rust,ignore
//! use ruvector_memtrace::{checkpoint, start_memory_tracing, TraceConfig};
//!
//! let handle = start_memory_tracing(TraceConfig::new().with_modules(["my_model"]))?;
//! checkpoint!();
//! let weights = vec![0f32; 1 << 20];
//! checkpoint!();
//! let summary = handle.stop_and_summarize(true);
//! ```
//!
//! Both memory backends are optional. Without them the tracer still records
//! frames, and every reading is zero.

pub mod accelerator;
pub mod config;
pub mod error;
pub mod frame;
pub mod latency;
pub mod memory;
pub mod report;
pub mod sampler;
pub mod summary;
pub mod tracer;
pub mod units;

pub use accelerator::{
    AcceleratorBackend, CacheFlushFn, FrameworkHook, MockAccelerator, NvmlBackend,
};
pub use config::{AcceleratorScope, TraceConfig};
pub use error::{MemtraceError, Result};
pub use frame::{Frame, Site, TraceEvent};
pub use latency::{compute_latency_stats, time_runs, LatencyRecord, LatencyStats};
pub use memory::{FixedHost, HostMemorySource, MemorySample};
pub use report::{format_memory_trace_statistics, format_state};
pub use sampler::MemorySampler;
pub use summary::{stop_memory_tracing, summarize, MemoryState, TraceSummary};
pub use tracer::{
    is_memory_tracing_enabled, start_memory_tracing, start_memory_tracing_with, trace_call,
    MemoryTrace, ScopeGuard, TraceHandle, TraceRecord,
};
pub use units::{bytes_to_human_readable, bytes_to_mega_bytes, Memory};
