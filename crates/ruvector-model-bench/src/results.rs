use ruvector_memtrace::Memory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Outcome of one train or inference pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Measurement {
    /// Fastest per-call wall time
    Seconds(f64),
    /// Total memory increase
    Memory(Memory),
}

impl Measurement {
    /// Cell text in CSV exports: seconds with four decimals, memory as megabytes.
    pub fn csv_value(&self) -> String {
        match self {
            Measurement::Seconds(s) => format!("{s:.4}"),
            Measurement::Memory(m) => m.to_string(),
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Seconds(s) => write!(f, "{s}"),
            Measurement::Memory(m) => write!(f, "{m}"),
        }
    }
}

/// Results of one model, keyed by batch size then sequence length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelResults {
    pub batch_sizes: Vec<usize>,
    pub sequence_lengths: Vec<usize>,
    pub result: BTreeMap<usize, BTreeMap<usize, Measurement>>,
}

impl ModelResults {
    pub fn get(&self, batch_size: usize, sequence_length: usize) -> Option<&Measurement> {
        self.result.get(&batch_size)?.get(&sequence_length)
    }

    /// Filled cells in configured grid order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Measurement)> + '_ {
        self.batch_sizes.iter().flat_map(move |&bs| {
            self.sequence_lengths
                .iter()
                .filter_map(move |&ss| self.get(bs, ss).map(|m| (bs, ss, m)))
        })
    }
}

/// One result table (e.g. inference speed) across all models.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultTable {
    pub model_names: Vec<String>,
    pub models: HashMap<String, ModelResults>,
}

impl ResultTable {
    pub fn new(model_names: &[String], batch_sizes: &[usize], sequence_lengths: &[usize]) -> Self {
        let models = model_names
            .iter()
            .map(|name| {
                let results = ModelResults {
                    batch_sizes: batch_sizes.to_vec(),
                    sequence_lengths: sequence_lengths.to_vec(),
                    result: batch_sizes.iter().map(|&bs| (bs, BTreeMap::new())).collect(),
                };
                (name.clone(), results)
            })
            .collect();
        Self {
            model_names: model_names.to_vec(),
            models,
        }
    }

    pub fn insert(
        &mut self,
        model: &str,
        batch_size: usize,
        sequence_length: usize,
        value: Measurement,
    ) {
        self.models
            .entry(model.to_string())
            .or_default()
            .result
            .entry(batch_size)
            .or_default()
            .insert(sequence_length, value);
    }

    pub fn get(
        &self,
        model: &str,
        batch_size: usize,
        sequence_length: usize,
    ) -> Option<&Measurement> {
        self.models.get(model)?.get(batch_size, sequence_length)
    }

    pub fn model(&self, model: &str) -> Option<&ModelResults> {
        self.models.get(model)
    }

    pub fn is_empty(&self) -> bool {
        self.models.values().all(|m| m.result.values().all(BTreeMap::is_empty))
    }
}

/// The four tables produced by a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkResults {
    pub inference_time: ResultTable,
    pub inference_memory: ResultTable,
    pub train_time: ResultTable,
    pub train_memory: ResultTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn csv_value_formats() {
        assert_eq!(Measurement::Seconds(0.123456).csv_value(), "0.1235");
        assert_eq!(Measurement::Memory(Memory::new(3 << 20)).csv_value(), "3");
        assert_eq!(Measurement::Memory(Memory::new(3 << 20)).to_string(), "3");
    }

    #[test]
    fn table_insert_and_lookup() {
        let mut t = ResultTable::new(&names(&["bert"]), &[1, 8], &[16, 32]);
        assert!(t.is_empty());
        t.insert("bert", 8, 32, Measurement::Seconds(0.5));
        assert_eq!(t.get("bert", 8, 32), Some(&Measurement::Seconds(0.5)));
        assert_eq!(t.get("bert", 1, 32), None);
        assert_eq!(t.get("gpt2", 8, 32), None);
        assert!(!t.is_empty());
    }

    #[test]
    fn cells_follow_grid_order() {
        let mut t = ResultTable::new(&names(&["m"]), &[8, 1], &[64, 16]);
        for (bs, ss) in [(1, 16), (8, 16), (8, 64), (1, 64)] {
            t.insert("m", bs, ss, Measurement::Seconds((bs * ss) as f64));
        }
        let order: Vec<(usize, usize)> =
            t.model("m").unwrap().cells().map(|(b, s, _)| (b, s)).collect();
        assert_eq!(order, vec![(8, 64), (8, 16), (1, 64), (1, 16)]);
    }
}
