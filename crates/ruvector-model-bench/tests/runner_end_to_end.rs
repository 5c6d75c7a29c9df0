//! Full runs of the synthetic backend through the runner.

use ruvector_memtrace::is_memory_tracing_enabled;
use ruvector_model_bench::{
    BenchmarkArguments, BenchmarkRunner, Measurement, Printer, SyntheticBenchmark,
};
use serial_test::serial;
use std::path::Path;

fn small_grid(dir: &Path) -> BenchmarkArguments {
    let mut args = BenchmarkArguments::new(["synthetic-tiny"]);
    args.batch_sizes = vec![1, 2];
    args.sequence_lengths = vec![8, 16];
    args.repeat = 2;
    args.number = 2;
    args.training = true;
    args.save_to_csv = true;
    args.csv_time_filename_inference = dir.join("inference_time.csv");
    args.csv_memory_filename_inference = dir.join("inference_memory.csv");
    args.csv_time_filename_train = dir.join("train_time.csv");
    args.csv_memory_filename_train = dir.join("train_memory.csv");
    args
}

#[test]
#[serial]
fn full_grid_writes_every_table() {
    let dir = tempfile::tempdir().unwrap();
    let printer = Printer::capture();
    let args = small_grid(dir.path());
    let mut runner =
        BenchmarkRunner::new(SyntheticBenchmark::default(), args, printer.clone()).unwrap();
    let results = runner.run().unwrap();
    assert!(!is_memory_tracing_enabled());

    for table in [
        &results.inference_time,
        &results.inference_memory,
        &results.train_time,
        &results.train_memory,
    ] {
        for bs in [1, 2] {
            for ss in [8, 16] {
                assert!(table.get("synthetic-tiny", bs, ss).is_some(), "missing {bs}/{ss}");
            }
        }
    }
    assert!(matches!(
        results.train_time.get("synthetic-tiny", 2, 16),
        Some(Measurement::Seconds(_))
    ));
    assert!(matches!(
        results.inference_memory.get("synthetic-tiny", 1, 8),
        Some(Measurement::Memory(_))
    ));

    for file in [
        "inference_time.csv",
        "inference_memory.csv",
        "train_time.csv",
        "train_memory.csv",
    ] {
        let content = std::fs::read_to_string(dir.path().join(file)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5, "{file}");
        assert_eq!(lines[0], "model,batch_size,sequence_length,result");
        assert!(lines[1].starts_with("synthetic-tiny,1,8,"));
        assert!(lines[4].starts_with("synthetic-tiny,2,16,"));
    }

    let out = printer.captured();
    assert_eq!(out[0], "1 / 1");
    let banners: Vec<&String> = out.iter().filter(|l| l.ends_with("- RESULT =======")).collect();
    assert_eq!(
        banners,
        vec![
            "======= INFERENCE - SPEED - RESULT =======",
            "======= INFERENCE - MEMORY - RESULT =======",
            "======= TRAIN - SPEED - RESULT =======",
            "======= TRAIN - MEMORY - RESULT =======",
        ]
    );
}

#[test]
#[serial]
fn skipped_passes_leave_tables_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut args = small_grid(dir.path());
    args.training = false;
    args.no_speed = true;
    args.save_to_csv = false;
    let mut runner =
        BenchmarkRunner::new(SyntheticBenchmark::default(), args, Printer::capture()).unwrap();
    let results = runner.run().unwrap();

    assert!(results.inference_time.is_empty());
    assert!(results.train_time.is_empty());
    assert!(results.train_memory.is_empty());
    assert!(!results.inference_memory.is_empty());
    assert!(!dir.path().join("inference_memory.csv").exists());
}

#[test]
fn unknown_model_fails_before_running() {
    let args = BenchmarkArguments::new(["bert-base-uncased"]);
    let err = BenchmarkRunner::new(SyntheticBenchmark::default(), args, Printer::capture())
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("Unknown model: bert-base-uncased"));
}
