//! End-to-end tracing sessions over instrumented code.
//!
//! The `toy_model` module stands in for model code under measurement: it
//! carries checkpoints the way a real forward pass would, and the tests
//! drive full start → run → stop → summarize → report cycles against it.

use ruvector_memtrace::{
    checkpoint, format_memory_trace_statistics, is_memory_tracing_enabled, start_memory_tracing,
    start_memory_tracing_with, stop_memory_tracing, summarize, FixedHost, MemorySampler,
    MemtraceError, TraceConfig, TraceEvent,
};
use serial_test::serial;

mod toy_model {
    pub mod layers {
        use ruvector_memtrace::checkpoint;

        pub fn forward(width: usize) -> f32 {
            checkpoint!();
            let hidden = vec![1.0f32; width];
            checkpoint!();
            let out: f32 = hidden.iter().sum();
            checkpoint!();
            out
        }
    }

    pub mod internal {
        use ruvector_memtrace::checkpoint;

        pub fn bookkeeping() {
            checkpoint!();
        }
    }

    pub fn step(width: usize) -> f32 {
        let _scope = ruvector_memtrace::trace_scope!();
        internal::bookkeeping();
        layers::forward(width)
    }
}

fn scripted(values: Vec<u64>) -> MemorySampler {
    MemorySampler::new(&TraceConfig::default(), Some(Box::new(FixedHost::sequence(values))), None)
}

#[test]
#[serial]
fn filtered_session_records_only_allowed_modules() {
    let cfg = TraceConfig::new()
        .with_modules(["toy_model"])
        .without_modules(["toy_model::internal"]);
    let handle = start_memory_tracing_with(cfg, MemorySampler::disabled()).unwrap();
    toy_model::step(16);
    let trace = handle.stop();

    assert_eq!(trace.len(), 3);
    assert!(trace.iter().all(|r| r.frame.module.ends_with("toy_model::layers")));
    assert!(trace.iter().all(|r| r.frame.event == TraceEvent::Line));
}

#[test]
#[serial]
fn all_events_include_scope_boundaries() {
    let cfg = TraceConfig::new().all_events().with_modules(["toy_model"]);
    let handle = start_memory_tracing_with(cfg, MemorySampler::disabled()).unwrap();
    toy_model::step(4);
    let events: Vec<TraceEvent> = handle.stop().iter().map(|r| r.frame.event).collect();
    assert_eq!(events.first(), Some(&TraceEvent::Call));
    assert_eq!(events.last(), Some(&TraceEvent::Return));
    assert_eq!(events.len(), 6);
}

#[test]
#[serial]
fn scripted_memory_produces_expected_summary() {
    let cfg = TraceConfig::new().with_modules(["toy_model::layers"]);
    let handle = start_memory_tracing_with(cfg, scripted(vec![1000, 1500, 1200])).unwrap();
    toy_model::step(8);
    let summary = handle.stop_and_summarize(true).unwrap();

    let deltas: Vec<i64> = summary.sequential.iter().map(|s| s.cpu_gpu.bytes).collect();
    assert_eq!(deltas, vec![500, -300]);
    assert_eq!(summary.total.bytes, 500);
    assert_eq!(summary.cumulative[0].cpu_gpu.bytes, 500);
}

#[test]
#[serial]
fn repeated_steps_accumulate_per_line() {
    let cfg = TraceConfig::new().with_modules(["toy_model::layers"]);
    // three checkpoints per step, host grows by 100 at the allocation line
    let values = vec![0, 100, 100, 100, 200, 200];
    let handle = start_memory_tracing_with(cfg, scripted(values)).unwrap();
    toy_model::step(8);
    toy_model::step(8);
    let summary = handle.stop_and_summarize(false).unwrap();

    assert_eq!(summary.sequential.len(), 5);
    let top = &summary.cumulative[0];
    assert_eq!(top.cpu_gpu.bytes, 200);
    assert_eq!(summary.total.bytes, 200);
}

#[test]
#[serial]
fn report_lines_reference_source() {
    let cfg = TraceConfig::new()
        .with_modules(["toy_model::layers"])
        .with_source_root(env!("CARGO_MANIFEST_DIR"));
    let handle = start_memory_tracing_with(cfg, scripted(vec![0, 4096, 4096])).unwrap();
    toy_model::step(8);
    let summary = handle.stop_and_summarize(true).unwrap();
    let report = format_memory_trace_statistics(&summary);

    assert!(report.contains("tracing_session.rs:"));
    assert!(report.contains("mem 4.000KB:"));
    assert!(report.contains("checkpoint!();"));
    // under a megabyte
    assert!(report.ends_with("Total memory increase: 0"));
}

#[test]
#[serial]
fn detected_backends_never_fail() {
    let handle = start_memory_tracing(TraceConfig::new().with_modules(["toy_model"])).unwrap();
    toy_model::step(1 << 16);
    let trace = handle.stop();
    assert_eq!(trace.len(), 4);
    let summary = summarize(&trace, true).unwrap();
    assert!(summary.total.bytes >= 0);
}

#[test]
#[serial]
fn one_session_per_process() {
    let handle =
        start_memory_tracing_with(TraceConfig::default(), MemorySampler::disabled()).unwrap();
    let err = start_memory_tracing(TraceConfig::default()).err().unwrap();
    assert!(matches!(err, MemtraceError::SessionActive));
    handle.stop();
}

#[test]
#[serial]
fn stop_entry_point_clears_flag() {
    let handle =
        start_memory_tracing_with(TraceConfig::default(), MemorySampler::disabled()).unwrap();
    assert!(is_memory_tracing_enabled());
    checkpoint!();
    // summarizing disables recording even while the handle is alive
    assert!(stop_memory_tracing(None, true).is_none());
    assert!(!is_memory_tracing_enabled());
    checkpoint!();
    assert_eq!(handle.stop().len(), 1);
}
