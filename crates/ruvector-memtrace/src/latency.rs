use std::time::Instant;

/// Wall time of one timing run of `calls` back-to-back invocations.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LatencyRecord {
    pub run_id: usize,
    pub wall_time_us: u64,
    pub calls: usize,
}

impl LatencyRecord {
    pub fn per_call_us(&self) -> f64 {
        self.wall_time_us as f64 / self.calls.max(1) as f64
    }
}

/// Descriptive statistics over per-call times.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LatencyStats {
    pub min_us: f64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub mean_us: f64,
    pub std_us: f64,
    pub n: usize,
}

impl LatencyStats {
    /// Fastest per-call time in seconds, the figure reported for a speed pass.
    pub fn best_seconds(&self) -> f64 {
        self.min_us / 1_000_000.0
    }
}

/// Run `f` `number` times per run for `repeat` runs and record each run.
pub fn time_runs(repeat: usize, number: usize, mut f: impl FnMut()) -> Vec<LatencyRecord> {
    let number = number.max(1);
    (0..repeat.max(1))
        .map(|run_id| {
            let start = Instant::now();
            for _ in 0..number {
                f();
            }
            LatencyRecord {
                run_id,
                wall_time_us: start.elapsed().as_micros() as u64,
                calls: number,
            }
        })
        .collect()
}

/// Compute percentile and summary statistics from [`LatencyRecord`]s.
///
/// Uses per-call time for all calculations. Returns zeroed stats when
/// the input slice is empty.
pub fn compute_latency_stats(records: &[LatencyRecord]) -> LatencyStats {
    let n = records.len();
    if n == 0 {
        return LatencyStats {
            min_us: 0.0,
            p50_us: 0.0,
            p95_us: 0.0,
            p99_us: 0.0,
            mean_us: 0.0,
            std_us: 0.0,
            n: 0,
        };
    }

    let mut times: Vec<f64> = records.iter().map(LatencyRecord::per_call_us).collect();
    times.sort_unstable_by(|a, b| a.total_cmp(b));

    let mean = times.iter().sum::<f64>() / n as f64;
    let variance = times.iter().map(|&t| (t - mean).powi(2)).sum::<f64>() / n as f64;

    LatencyStats {
        min_us: times[0],
        p50_us: percentile(&times, 50.0),
        p95_us: percentile(&times, 95.0),
        p99_us: percentile(&times, 99.0),
        mean_us: mean,
        std_us: variance.sqrt(),
        n,
    }
}

/// Nearest-rank percentile on a **sorted** slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (pct / 100.0 * sorted.len() as f64).ceil() as usize;
    let idx = rank.min(sorted.len()).saturating_sub(1);
    sorted[idx]
}
