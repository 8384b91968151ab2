//! Trial Scheduler
//!
//! Runs `cycles` trials of one unit, each in a fresh worker process, in
//! batches no larger than the pool size:
//!
//! ```text
//! remaining = cycles
//! while remaining > 0:
//!     batch = min(pool_size, remaining)
//!     run `batch` worker processes concurrently, wait for all
//!     remaining -= batch
//! average = totals / cycles
//! ```
//!
//! A failing trial fails the whole call; later batches are never started.

use crate::supervisor::{SchedulerError, WorkerHandle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serdebench_core::{WorkUnit, find_unit};
use serdebench_ipc::TrialSample;
use serdebench_stats::{AggregateResult, TrialTotals};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scheduler settings
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Pool size; defaults to the number of logical CPUs
    pub jobs: Option<usize>,
    /// Per-trial deadline; trials may run forever when `None`
    pub trial_timeout: Option<Duration>,
    /// Binary to launch as worker; defaults to the current executable
    pub worker_binary: Option<PathBuf>,
}

/// Fans trials of a unit out to worker processes
#[derive(Debug, Clone)]
pub struct TrialScheduler {
    pool_size: usize,
    trial_timeout: Option<Duration>,
    worker_binary: PathBuf,
    check_registry: bool,
}

impl TrialScheduler {
    /// Resolve the pool size and worker binary once
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let pool_size = match config.jobs {
            Some(jobs) => jobs,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .map_err(|e| {
                    SchedulerError::PoolExhausted(format!("cannot count logical CPUs: {}", e))
                })?,
        };
        if pool_size == 0 {
            return Err(SchedulerError::PoolExhausted(
                "pool size must be at least 1".to_string(),
            ));
        }

        // Units of a foreign binary cannot be looked up in this process
        let (worker_binary, check_registry) = match config.worker_binary {
            Some(binary) => (binary, false),
            None => (std::env::current_exe()?, true),
        };

        Ok(Self {
            pool_size,
            trial_timeout: config.trial_timeout,
            worker_binary,
            check_registry,
        })
    }

    /// Maximum number of concurrent worker processes
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Per-trial deadline
    pub fn trial_timeout(&self) -> Option<Duration> {
        self.trial_timeout
    }

    /// Binary launched for each trial
    pub fn worker_binary(&self) -> &Path {
        &self.worker_binary
    }

    /// Average wall time and RSS delta of `unit` over `cycles` isolated trials
    pub fn measure(&self, cycles: usize, unit: &WorkUnit) -> Result<AggregateResult, SchedulerError> {
        self.measure_with_progress(cycles, unit, |_| {})
    }

    /// Like [`measure`](Self::measure), calling `on_batch` with the size of
    /// each batch once all of its trials have succeeded
    pub fn measure_with_progress<F>(
        &self,
        cycles: usize,
        unit: &WorkUnit,
        on_batch: F,
    ) -> Result<AggregateResult, SchedulerError>
    where
        F: Fn(usize),
    {
        if cycles == 0 {
            return Err(SchedulerError::InvalidCycles);
        }
        if self.check_registry && find_unit(unit.id()).is_none() {
            return Err(SchedulerError::UnitNotFound(unit.id().to_string()));
        }

        let mut totals = TrialTotals::new();
        let mut remaining = cycles;
        let mut batch_index = 0usize;

        while remaining > 0 {
            let batch_size = self.pool_size.min(remaining);
            tracing::debug!(
                unit = unit.id(),
                batch = batch_index,
                batch_size,
                remaining,
                "starting batch"
            );

            for sample in self.run_batch(batch_size, unit)? {
                totals.add(&sample);
            }

            remaining -= batch_size;
            batch_index += 1;
            on_batch(batch_size);
        }

        debug_assert_eq!(totals.trials(), cycles);
        totals.finish(cycles).ok_or(SchedulerError::InvalidCycles)
    }

    /// Run `batch_size` trials concurrently on a pool that lives for this batch only
    fn run_batch(
        &self,
        batch_size: usize,
        unit: &WorkUnit,
    ) -> Result<Vec<TrialSample>, SchedulerError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(batch_size)
            .thread_name(|i| format!("serdebench-trial-{}", i))
            .build()
            .map_err(|e| {
                SchedulerError::PoolExhausted(format!("Failed to build worker pool: {}", e))
            })?;

        let outcomes: Vec<Result<TrialSample, SchedulerError>> = pool.install(|| {
            (0..batch_size)
                .into_par_iter()
                .map(|_| self.run_isolated(unit))
                .collect()
        });
        drop(pool);

        let mut samples = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            samples.push(outcome?);
        }
        Ok(samples)
    }

    /// Run one trial in a fresh worker process
    fn run_isolated(&self, unit: &WorkUnit) -> Result<TrialSample, SchedulerError> {
        let mut worker = WorkerHandle::spawn(&self.worker_binary, self.trial_timeout)?;
        let pid = worker.pid();
        let result = worker.run_trial(unit);
        match &result {
            Ok(sample) => tracing::trace!(
                unit = unit.id(),
                pid,
                elapsed_nanos = sample.elapsed_nanos,
                rss_delta = sample.rss_delta_bytes(),
                "trial finished"
            ),
            Err(e) => tracing::warn!(unit = unit.id(), pid, "trial failed: {}", e),
        }
        let _ = worker.shutdown();
        result
    }
}

/// Measure `unit` with the default scheduler (one process per logical CPU)
pub fn measure(cycles: usize, unit: &WorkUnit) -> Result<AggregateResult, SchedulerError> {
    TrialScheduler::new(SchedulerConfig::default())?.measure(cycles, unit)
}
