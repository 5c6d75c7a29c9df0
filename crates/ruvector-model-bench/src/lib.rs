//! Memory and speed benchmarks for model checkpoints.
//!
//! A [`BenchmarkRunner`] walks every configured model over a grid of batch
//! sizes and sequence lengths, calling a [`Benchmark`] backend once per
//! enabled pass. Memory passes run under a `ruvector-memtrace` session;
//! speed passes keep the fastest per-call time of repeated runs. Result
//! tables are printed and optionally written to CSV.
//!
//! ```rust,ignore
//! use ruvector_model_bench::{BenchmarkArguments, BenchmarkRunner, Printer, SyntheticBenchmark};
//!
//! let args = BenchmarkArguments::new(["synthetic-small"]);
//! let mut runner = BenchmarkRunner::new(SyntheticBenchmark::default(), args, Printer::Stdout)?;
//! let results = runner.run()?;
//! ```

pub mod args;
pub mod benchmark;
pub mod csv_emitter;
pub mod error;
pub mod printer;
pub mod report;
pub mod results;
pub mod runner;
pub mod synthetic;

pub use args::BenchmarkArguments;
pub use benchmark::{measure_memory, measure_speed, BenchRequest, Benchmark};
pub use csv_emitter::write_results_csv;
pub use error::{BenchError, Result};
pub use printer::Printer;
pub use report::{banner, format_results};
pub use results::{BenchmarkResults, Measurement, ModelResults, ResultTable};
pub use runner::BenchmarkRunner;
pub use synthetic::{SyntheticBenchmark, SyntheticConfig};
