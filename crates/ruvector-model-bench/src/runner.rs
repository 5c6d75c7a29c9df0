use crate::args::BenchmarkArguments;
use crate::benchmark::{BenchRequest, Benchmark};
use crate::csv_emitter::write_results_csv;
use crate::error::BenchError;
use crate::printer::Printer;
use crate::report::{banner, format_results};
use crate::results::{BenchmarkResults, ResultTable};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Drives a [`Benchmark`] over every model × batch size × sequence length.
pub struct BenchmarkRunner<B: Benchmark> {
    benchmark: B,
    args: BenchmarkArguments,
    configs: HashMap<String, B::Config>,
    printer: Printer,
}

impl<B: Benchmark> BenchmarkRunner<B> {
    /// Resolve every model's config through [`Benchmark::load_config`].
    pub fn new(benchmark: B, args: BenchmarkArguments, printer: Printer) -> Result<Self> {
        let mut configs = HashMap::new();
        for name in &args.model_names {
            let config = benchmark
                .load_config(name)
                .with_context(|| format!("Failed to load config for {name}"))?;
            configs.insert(name.clone(), config);
        }
        Ok(Self {
            benchmark,
            args,
            configs,
            printer,
        })
    }

    /// Use explicit configs, paired with the model names in order.
    pub fn with_configs(
        benchmark: B,
        args: BenchmarkArguments,
        printer: Printer,
        configs: Vec<B::Config>,
    ) -> std::result::Result<Self, BenchError> {
        if configs.len() != args.model_names.len() {
            return Err(BenchError::ConfigCountMismatch {
                models: args.model_names.len(),
                configs: configs.len(),
            });
        }
        let configs = args.model_names.iter().cloned().zip(configs).collect();
        Ok(Self {
            benchmark,
            args,
            configs,
            printer,
        })
    }

    pub fn args(&self) -> &BenchmarkArguments {
        &self.args
    }

    pub fn benchmark(&self) -> &B {
        &self.benchmark
    }

    pub fn run(&mut self) -> Result<BenchmarkResults> {
        let args = &self.args;
        let printer = &self.printer;
        let empty =
            || ResultTable::new(&args.model_names, &args.batch_sizes, &args.sequence_lengths);
        let mut results = BenchmarkResults {
            inference_time: empty(),
            inference_memory: empty(),
            train_time: empty(),
            train_memory: empty(),
        };

        info!(
            framework = self.benchmark.framework(),
            models = args.model_names.len(),
            "starting benchmark"
        );

        let n = args.model_names.len();
        for (c, model_name) in args.model_names.iter().enumerate() {
            printer.print(&format!("{} / {}", c + 1, n));
            let config = self
                .configs
                .get(model_name)
                .ok_or_else(|| BenchError::UnknownModel(model_name.clone()))?;
            let model_name = model_name.as_str();

            for &batch_size in &args.batch_sizes {
                for &sequence_length in &args.sequence_lengths {
                    let request = move |trace_memory: bool| BenchRequest {
                        model_name,
                        config,
                        batch_size,
                        sequence_length,
                        trace_memory,
                        args,
                        printer,
                    };
                    let cell = || format!("{model_name}/{batch_size}/{sequence_length}");

                    if !args.no_inference {
                        if !args.no_memory {
                            let m = self
                                .benchmark
                                .inference(&request(true))
                                .with_context(|| format!("inference memory pass {}", cell()))?;
                            results
                                .inference_memory
                                .insert(model_name, batch_size, sequence_length, m);
                        }
                        if !args.no_speed {
                            let t = self
                                .benchmark
                                .inference(&request(false))
                                .with_context(|| format!("inference speed pass {}", cell()))?;
                            results
                                .inference_time
                                .insert(model_name, batch_size, sequence_length, t);
                        }
                    }

                    if args.training {
                        if !args.no_memory {
                            let m = self
                                .benchmark
                                .train(&request(true))
                                .with_context(|| format!("train memory pass {}", cell()))?;
                            results
                                .train_memory
                                .insert(model_name, batch_size, sequence_length, m);
                        }
                        if !args.no_speed {
                            let t = self
                                .benchmark
                                .train(&request(false))
                                .with_context(|| format!("train speed pass {}", cell()))?;
                            results
                                .train_time
                                .insert(model_name, batch_size, sequence_length, t);
                        }
                    }
                }
            }
        }

        if !args.no_inference {
            if !args.no_speed {
                self.report(
                    "INFERENCE",
                    "SPEED",
                    &results.inference_time,
                    &args.csv_time_filename_inference,
                )?;
            }
            if !args.no_memory {
                self.report(
                    "INFERENCE",
                    "MEMORY",
                    &results.inference_memory,
                    &args.csv_memory_filename_inference,
                )?;
            }
        }
        if args.training {
            if !args.no_speed {
                self.report(
                    "TRAIN",
                    "SPEED",
                    &results.train_time,
                    &args.csv_time_filename_train,
                )?;
            }
            if !args.no_memory {
                self.report(
                    "TRAIN",
                    "MEMORY",
                    &results.train_memory,
                    &args.csv_memory_filename_train,
                )?;
            }
        }

        Ok(results)
    }

    fn report(&self, phase: &str, kind: &str, table: &ResultTable, csv_path: &Path) -> Result<()> {
        self.printer.print(&banner(phase, kind));
        for line in format_results(table) {
            self.printer.print(&line);
        }
        if self.args.save_to_csv {
            self.printer.print("Saving results to csv.");
            write_results_csv(csv_path, table)
                .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        }
        Ok(())
    }
}
