//! Model memory benchmark
//!
//! Runs the synthetic model backend over a grid of batch sizes and sequence
//! lengths and reports inference/training speed and memory.
//!
//! ```text
//! model-memory-bench --models synthetic-small synthetic-base \
//!     --batch-sizes 1 8 --sequence-lengths 32 128 --training --save-to-csv
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use ruvector_model_bench::{BenchmarkArguments, BenchmarkRunner, Printer, SyntheticBenchmark};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "model-memory-bench")]
#[command(about = "Benchmark inference and training speed and memory of model checkpoints")]
struct Cli {
    #[command(flatten)]
    args: BenchmarkArguments,

    /// Directory holding `<model>.json` configs; presets are used otherwise
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

fn init_logging(log_print: bool, log_filename: &Path) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let file_layer = if log_print {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_filename)
            .with_context(|| format!("Failed to open log file {}", log_filename.display()))?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::INFO),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.args.log_print, &cli.args.log_filename)?;

    let printer = Printer::from_log_flag(cli.args.log_print);
    let benchmark = SyntheticBenchmark::new(cli.config_dir);
    let mut runner = BenchmarkRunner::new(benchmark, cli.args, printer)?;
    runner.run().context("Benchmark run failed")?;

    Ok(())
}
