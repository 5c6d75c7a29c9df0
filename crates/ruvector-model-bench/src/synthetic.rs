//! Synthetic transformer-shaped workload.
//!
//! Stands in for a real model backend: every layer allocates activation
//! buffers sized from the config and the request shape, so memory and speed
//! grow with batch size, sequence length and depth. Used by the binary and
//! by the end-to-end tests.

use crate::benchmark::{measure_memory, measure_speed, BenchRequest, Benchmark};
use crate::error::BenchError;
use crate::results::Measurement;
use anyhow::Context;
use ruvector_memtrace::{MemorySampler, TraceConfig};
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use std::path::PathBuf;
use tracing::debug;

/// Shape of a synthetic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub hidden_size: usize,
    pub num_layers: usize,
    pub intermediate_size: usize,
    pub vocab_size: usize,
}

impl SyntheticConfig {
    /// Built-in configs: `synthetic-tiny`, `synthetic-small` and `synthetic-base`.
    pub fn preset(name: &str) -> Option<Self> {
        let (hidden_size, num_layers, intermediate_size, vocab_size) = match name {
            "synthetic-tiny" => (32, 2, 64, 128),
            "synthetic-small" => (256, 4, 1024, 8192),
            "synthetic-base" => (768, 12, 3072, 30522),
            _ => return None,
        };
        Some(Self {
            hidden_size,
            num_layers,
            intermediate_size,
            vocab_size,
        })
    }
}

/// [`Benchmark`] over [`SyntheticConfig`] models.
pub struct SyntheticBenchmark {
    config_dir: Option<PathBuf>,
    sampler: fn(&TraceConfig) -> MemorySampler,
}

impl Default for SyntheticBenchmark {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SyntheticBenchmark {
    /// `config_dir`, when set, is searched for `<model>.json` before the presets.
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        Self {
            config_dir,
            sampler: MemorySampler::detect,
        }
    }

    /// Replace how memory passes build their sampler.
    pub fn with_sampler(mut self, sampler: fn(&TraceConfig) -> MemorySampler) -> Self {
        self.sampler = sampler;
        self
    }

    fn trace_config() -> TraceConfig {
        TraceConfig::new()
            .with_modules(["synthetic"])
            .with_source_root(env!("CARGO_MANIFEST_DIR"))
    }

    fn run_pass(
        &self,
        request: &BenchRequest<'_, SyntheticConfig>,
        train: bool,
    ) -> anyhow::Result<Measurement> {
        let cfg = *request.config;
        let (batch_size, sequence_length) = (request.batch_size, request.sequence_length);
        let step = move || {
            if train {
                model::train_step(&cfg, batch_size, sequence_length)
            } else {
                model::forward(&cfg, batch_size, sequence_length)
            }
        };

        if request.trace_memory {
            let trace_config = Self::trace_config();
            let sampler = (self.sampler)(&trace_config);
            let (out, measurement) = measure_memory(
                trace_config,
                Some(sampler),
                request.args.trace_memory_line_by_line,
                request.printer,
                step,
            )?;
            black_box(out);
            Ok(measurement)
        } else {
            Ok(measure_speed(request.args.repeat, request.args.number, || {
                black_box(step());
            }))
        }
    }
}

impl Benchmark for SyntheticBenchmark {
    type Config = SyntheticConfig;

    fn framework(&self) -> &str {
        "synthetic"
    }

    fn load_config(&self, model_name: &str) -> anyhow::Result<SyntheticConfig> {
        if let Some(dir) = &self.config_dir {
            let path = dir.join(format!("{model_name}.json"));
            if path.is_file() {
                debug!(path = %path.display(), "loading model config");
                let raw = std::fs::read_to_string(&path)
                    .map_err(BenchError::from)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let config = serde_json::from_str(&raw).map_err(BenchError::from)?;
                return Ok(config);
            }
        }
        SyntheticConfig::preset(model_name)
            .ok_or_else(|| BenchError::UnknownModel(model_name.to_string()).into())
    }

    fn inference(
        &mut self,
        request: &BenchRequest<'_, SyntheticConfig>,
    ) -> anyhow::Result<Measurement> {
        self.run_pass(request, false)
    }

    fn train(
        &mut self,
        request: &BenchRequest<'_, SyntheticConfig>,
    ) -> anyhow::Result<Measurement> {
        self.run_pass(request, true)
    }
}

mod model {
    use super::SyntheticConfig;
    use ruvector_memtrace::checkpoint;

    fn project(input: &[f32], output: &mut [f32], scale: f32) {
        if input.is_empty() {
            return;
        }
        for (i, o) in output.iter_mut().enumerate() {
            *o = input[i % input.len()] * scale + 0.01;
        }
    }

    fn embed(cfg: &SyntheticConfig, tokens: usize) -> Vec<f32> {
        (0..tokens * cfg.hidden_size)
            .map(|i| ((i % cfg.vocab_size.max(1)) as f32) / cfg.vocab_size.max(1) as f32)
            .collect()
    }

    pub(super) fn forward(cfg: &SyntheticConfig, batch_size: usize, sequence_length: usize) -> f32 {
        let tokens = batch_size * sequence_length;
        checkpoint!();
        let mut hidden = embed(cfg, tokens);
        for _ in 0..cfg.num_layers {
            checkpoint!();
            let mut intermediate = vec![0f32; tokens * cfg.intermediate_size];
            project(&hidden, &mut intermediate, 0.5);
            project(&intermediate, &mut hidden, 0.25);
        }
        checkpoint!();
        hidden.iter().sum()
    }

    /// Forward keeping every layer's activations, then a backward sweep
    /// allocating one gradient buffer per layer.
    pub(super) fn train_step(
        cfg: &SyntheticConfig,
        batch_size: usize,
        sequence_length: usize,
    ) -> f32 {
        let tokens = batch_size * sequence_length;
        checkpoint!();
        let mut activations = vec![embed(cfg, tokens)];
        for layer in 0..cfg.num_layers {
            checkpoint!();
            let mut intermediate = vec![0f32; tokens * cfg.intermediate_size];
            project(&activations[layer], &mut intermediate, 0.5);
            let mut out = vec![0f32; tokens * cfg.hidden_size];
            project(&intermediate, &mut out, 0.25);
            activations.push(out);
        }
        checkpoint!();
        let mut grad = vec![1f32; tokens * cfg.hidden_size];
        let mut grads = Vec::with_capacity(cfg.num_layers);
        for activation in activations.iter().rev().skip(1) {
            checkpoint!();
            let mut g = vec![0f32; activation.len()];
            project(&grad, &mut g, 0.9);
            grad = g.clone();
            grads.push(g);
        }
        checkpoint!();
        grads.iter().map(|g| g.first().copied().unwrap_or(0.0)).sum()
    }
}
