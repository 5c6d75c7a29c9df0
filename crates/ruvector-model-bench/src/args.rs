//! Benchmark arguments
//!
//! Parsed from the command line by the binary, or built in code with
//! [`BenchmarkArguments::new`].

use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to run and where to put the results
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct BenchmarkArguments {
    /// Model checkpoints to benchmark
    #[arg(long = "models", num_args = 1.., required = true)]
    pub model_names: Vec<String>,

    /// Batch sizes to run for every model
    #[arg(long, num_args = 1.., default_values_t = [8])]
    pub batch_sizes: Vec<usize>,

    /// Sequence lengths to run for every batch size
    #[arg(long, num_args = 1.., default_values_t = [8, 32, 128, 512])]
    pub sequence_lengths: Vec<usize>,

    /// Skip inference passes
    #[arg(long)]
    pub no_inference: bool,

    /// Skip speed passes
    #[arg(long)]
    pub no_speed: bool,

    /// Skip memory passes
    #[arg(long)]
    pub no_memory: bool,

    /// Also benchmark training
    #[arg(long)]
    pub training: bool,

    /// Write every result table to CSV
    #[arg(long)]
    pub save_to_csv: bool,

    #[arg(long, default_value = "inference_time.csv")]
    pub csv_time_filename_inference: PathBuf,

    #[arg(long, default_value = "inference_memory.csv")]
    pub csv_memory_filename_inference: PathBuf,

    #[arg(long, default_value = "train_time.csv")]
    pub csv_time_filename_train: PathBuf,

    #[arg(long, default_value = "train_memory.csv")]
    pub csv_memory_filename_train: PathBuf,

    /// Mirror printed output into the log file
    #[arg(long)]
    pub log_print: bool,

    #[arg(long, default_value = "log.csv")]
    pub log_filename: PathBuf,

    /// Print the line-by-line trace of every memory pass
    #[arg(long)]
    pub trace_memory_line_by_line: bool,

    /// Timing runs per speed pass
    #[arg(long, default_value_t = 3)]
    pub repeat: usize,

    /// Calls per timing run
    #[arg(long, default_value_t = 10)]
    pub number: usize,
}

impl BenchmarkArguments {
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model_names: models.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl Default for BenchmarkArguments {
    fn default() -> Self {
        Self {
            model_names: Vec::new(),
            batch_sizes: vec![8],
            sequence_lengths: vec![8, 32, 128, 512],
            no_inference: false,
            no_speed: false,
            no_memory: false,
            training: false,
            save_to_csv: false,
            csv_time_filename_inference: PathBuf::from("inference_time.csv"),
            csv_memory_filename_inference: PathBuf::from("inference_memory.csv"),
            csv_time_filename_train: PathBuf::from("train_time.csv"),
            csv_memory_filename_train: PathBuf::from("train_memory.csv"),
            log_print: false,
            log_filename: PathBuf::from("log.csv"),
            trace_memory_line_by_line: false,
            repeat: 3,
            number: 10,
        }
    }
}
