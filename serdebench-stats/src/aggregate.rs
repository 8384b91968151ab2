//! Trial Aggregation
//!
//! `average = sum(trial values) / cycles`, where `cycles` is the requested
//! trial count. Totals are kept in integer nanoseconds and bytes so the
//! order in which trials are added never changes the result.

use serde::{Deserialize, Serialize};
use serdebench_ipc::TrialSample;
use std::time::Duration;

/// Per-trial averages over one `measure` call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Mean elapsed wall-clock time, seconds
    pub avg_seconds: f64,
    /// Mean resident-memory delta, bytes (may be negative)
    pub avg_rss_bytes: f64,
    /// Number of trials the averages cover
    pub cycles: usize,
}

impl AggregateResult {
    /// Mean elapsed time as a `Duration`
    pub fn avg_duration(&self) -> Duration {
        Duration::from_secs_f64(self.avg_seconds.max(0.0))
    }
}

/// Running sums of trial readings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialTotals {
    elapsed_nanos: u128,
    rss_delta_bytes: i128,
    trials: usize,
}

impl TrialTotals {
    /// Empty totals
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one trial
    pub fn add(&mut self, sample: &TrialSample) {
        self.add_raw(sample.elapsed_nanos, sample.rss_delta_bytes());
    }

    /// Fold in one trial given as raw readings
    pub fn add_raw(&mut self, elapsed_nanos: u64, rss_delta_bytes: i64) {
        self.elapsed_nanos += u128::from(elapsed_nanos);
        self.rss_delta_bytes += i128::from(rss_delta_bytes);
        self.trials += 1;
    }

    /// Number of trials folded in so far
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Divide the sums by `cycles`. `None` for zero cycles.
    pub fn finish(&self, cycles: usize) -> Option<AggregateResult> {
        if cycles == 0 {
            return None;
        }
        let n = cycles as f64;
        Some(AggregateResult {
            avg_seconds: self.elapsed_nanos as f64 / n / 1e9,
            avg_rss_bytes: self.rss_delta_bytes as f64 / n,
            cycles,
        })
    }
}

/// Fold a multiset of trials into averages over `cycles`
pub fn aggregate<'a>(
    samples: impl IntoIterator<Item = &'a TrialSample>,
    cycles: usize,
) -> Option<AggregateResult> {
    let mut totals = TrialTotals::new();
    for sample in samples {
        totals.add(sample);
    }
    totals.finish(cycles)
}
