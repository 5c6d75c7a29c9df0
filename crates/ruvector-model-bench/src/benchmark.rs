//! The `Benchmark` trait implemented once per model backend, and the
//! measurement helpers implementations build their passes from.

use crate::args::BenchmarkArguments;
use crate::error::BenchError;
use crate::printer::Printer;
use crate::results::Measurement;
use ruvector_memtrace::{
    compute_latency_stats, format_memory_trace_statistics, summarize, time_runs, trace_call, Memory,
    MemorySampler, TraceConfig,
};
use tracing::debug;

/// One train or inference invocation.
pub struct BenchRequest<'a, C> {
    pub model_name: &'a str,
    pub config: &'a C,
    pub batch_size: usize,
    pub sequence_length: usize,
    /// `true` for a memory pass, `false` for a speed pass
    pub trace_memory: bool,
    pub args: &'a BenchmarkArguments,
    pub printer: &'a Printer,
}

/// A model backend the runner can drive.
pub trait Benchmark {
    /// Per-model configuration, resolved once before the grid runs.
    type Config;

    /// Short backend name for logs.
    fn framework(&self) -> &str;

    fn load_config(&self, model_name: &str) -> anyhow::Result<Self::Config>;

    fn inference(
        &mut self,
        request: &BenchRequest<'_, Self::Config>,
    ) -> anyhow::Result<Measurement>;

    fn train(&mut self, request: &BenchRequest<'_, Self::Config>) -> anyhow::Result<Measurement>;
}

/// Run `f` inside a tracing session and report its total memory increase.
///
/// Released memory is ignored in the total. When `line_by_line` is set the
/// full trace statistics are printed. A trace too short to summarize counts
/// as zero. Fails with [`BenchError::Trace`] when another session is active.
pub fn measure_memory<R>(
    trace_config: TraceConfig,
    sampler: Option<MemorySampler>,
    line_by_line: bool,
    printer: &Printer,
    f: impl FnOnce() -> R,
) -> anyhow::Result<(R, Measurement)> {
    let (out, trace) = trace_call(trace_config, sampler, f).map_err(BenchError::from)?;
    let total = match summarize(&trace, true) {
        Some(summary) => {
            if line_by_line {
                printer.print(&format_memory_trace_statistics(&summary));
            }
            summary.total
        }
        None => Memory::default(),
    };
    debug!(records = trace.len(), total = %total.human(), "memory pass finished");
    Ok((out, Measurement::Memory(total)))
}

/// Time `f` and report the fastest per-call time in seconds.
pub fn measure_speed(repeat: usize, number: usize, f: impl FnMut()) -> Measurement {
    let records = time_runs(repeat, number, f);
    let stats = compute_latency_stats(&records);
    debug!(
        runs = stats.n,
        min_us = stats.min_us,
        p50_us = stats.p50_us,
        std_us = stats.std_us,
        "speed pass finished"
    );
    Measurement::Seconds(stats.best_seconds())
}
