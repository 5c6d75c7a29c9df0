//! Reduction of a finished trace into sequential, cumulative and current views.

use crate::frame::Frame;
use crate::tracer::{disable_tracing, MemoryTrace, TraceRecord};
use crate::units::Memory;
use std::collections::HashMap;

/// Memory attributed to one frame: host, accelerator and their sum.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryState {
    pub frame: Frame,
    pub cpu: Memory,
    pub gpu: Memory,
    pub cpu_gpu: Memory,
}

impl MemoryState {
    fn new(frame: Frame, cpu: i64, gpu: i64) -> Self {
        Self {
            frame,
            cpu: Memory::new(cpu),
            gpu: Memory::new(gpu),
            cpu_gpu: Memory::new(cpu + gpu),
        }
    }
}

/// Reduced views of a memory trace.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TraceSummary {
    /// Delta between each record and the next, tagged with the first one's frame.
    pub sequential: Vec<MemoryState>,
    /// Per-frame sum of `sequential`, largest combined increase first.
    pub cumulative: Vec<MemoryState>,
    /// Absolute memory after each step, highest combined value first.
    pub current: Vec<MemoryState>,
    /// Sum of combined deltas.
    pub total: Memory,
}

/// Reduce `trace` into a [`TraceSummary`].
///
/// Returns `None` for fewer than two records. With `ignore_released_memory`,
/// negative steps count as zero toward `total`. Always clears the global
/// tracing flag.
pub fn summarize(trace: &[TraceRecord], ignore_released_memory: bool) -> Option<TraceSummary> {
    disable_tracing();

    if trace.len() < 2 {
        return None;
    }

    let mut sequential = Vec::with_capacity(trace.len() - 1);
    let mut current = Vec::with_capacity(trace.len() - 1);
    // frame -> slot in `totals`, which keeps first-appearance order
    let mut index: HashMap<&Frame, usize> = HashMap::new();
    let mut totals: Vec<(&Frame, i64, i64)> = Vec::new();

    for pair in trace.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let cpu = delta(prev.sample.host_bytes, next.sample.host_bytes);
        let gpu = delta(prev.sample.accelerator_bytes, next.sample.accelerator_bytes);

        sequential.push(MemoryState::new(prev.frame.clone(), cpu, gpu));
        current.push(MemoryState::new(
            prev.frame.clone(),
            clamp_i64(next.sample.host_bytes),
            clamp_i64(next.sample.accelerator_bytes),
        ));

        let slot = *index.entry(&prev.frame).or_insert_with(|| {
            totals.push((&prev.frame, 0, 0));
            totals.len() - 1
        });
        let entry = &mut totals[slot];
        entry.1 += cpu;
        entry.2 += gpu;
    }

    let mut cumulative: Vec<MemoryState> = totals
        .into_iter()
        .map(|(frame, cpu, gpu)| MemoryState::new(frame.clone(), cpu, gpu))
        .collect();
    cumulative.sort_by(|a, b| b.cpu_gpu.cmp(&a.cpu_gpu));
    current.sort_by(|a, b| b.cpu_gpu.cmp(&a.cpu_gpu));

    let total = sequential
        .iter()
        .map(|s| {
            if ignore_released_memory {
                s.cpu_gpu.bytes.max(0)
            } else {
                s.cpu_gpu.bytes
            }
        })
        .sum();

    Some(TraceSummary {
        sequential,
        cumulative,
        current,
        total: Memory::new(total),
    })
}

/// Stop-style entry point: clears the tracing flag and summarizes `trace` if given.
pub fn stop_memory_tracing(
    trace: Option<MemoryTrace>,
    ignore_released_memory: bool,
) -> Option<TraceSummary> {
    disable_tracing();
    trace.and_then(|t| summarize(&t, ignore_released_memory))
}

fn delta(before: u64, after: u64) -> i64 {
    clamp_i64(after) - clamp_i64(before)
}

fn clamp_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
