//! Criterion benchmarks for trace reduction and checkpoint overhead.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ruvector_memtrace::{
    checkpoint, start_memory_tracing_with, summarize, Frame, MemorySample, MemorySampler,
    TraceConfig, TraceEvent, TraceRecord,
};

/// A trace cycling over `distinct` frames with a sawtooth host profile.
fn make_trace(len: usize, distinct: u32) -> Vec<TraceRecord> {
    (0..len)
        .map(|i| TraceRecord {
            frame: Frame {
                filename: "src/model/attention.rs".to_string(),
                module: "model::attention".to_string(),
                line_number: (i as u32) % distinct + 1,
                event: TraceEvent::Line,
                line_text: "let scores = q.matmul(&k.t());".to_string(),
            },
            sample: MemorySample {
                host_bytes: ((i % 97) as u64) << 16,
                accelerator_bytes: ((i % 13) as u64) << 20,
            },
        })
        .collect()
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");
    for &len in &[1_000usize, 10_000, 100_000] {
        let trace = make_trace(len, 64);
        group.bench_with_input(BenchmarkId::from_parameter(len), &trace, |b, trace| {
            b.iter(|| summarize(black_box(trace), true))
        });
    }
    group.finish();
}

fn bench_checkpoint(c: &mut Criterion) {
    c.bench_function("checkpoint_disabled", |b| b.iter(|| checkpoint!()));

    let handle = start_memory_tracing_with(
        TraceConfig::new().with_modules(["summarize_bench"]),
        MemorySampler::disabled(),
    )
    .expect("no other session in the bench process");
    c.bench_function("checkpoint_recording", |b| b.iter(|| checkpoint!()));
    black_box(handle.stop().len());
}

criterion_group!(benches, bench_summarize, bench_checkpoint);
criterion_main!(benches);
