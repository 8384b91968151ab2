#![warn(missing_docs)]
//! # serdebench
//!
//! Measures the average wall-clock time and resident-memory delta of a unit
//! of work. Every trial runs in a fresh worker process, so one trial's heap
//! growth, caches and allocator state never leak into the next. Trials run in
//! batches of at most one process per logical CPU.
//!
//! ## Quick Start
//!
//! ```ignore
//! use serdebench::{Sampler, unit};
//!
//! #[unit(group = "json")]
//! fn load_json(s: &mut Sampler) -> anyhow::Result<()> {
//!     let path: std::path::PathBuf = s.args()?;   // untimed
//!     let text = s.measure(|| std::fs::read_to_string(&path))?;
//!     anyhow::ensure!(!text.is_empty());
//!     Ok(())
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     serdebench::run()
//! }
//! ```
//!
//! ## Library use
//!
//! ```ignore
//! let unit = serdebench::WorkUnit::new("load_json").with_args(&"flights.json")?;
//! let result = serdebench::measure(10, &unit)?;
//! println!("{:.3} s, {:.0} bytes", result.avg_seconds, result.avg_rss_bytes);
//! ```
//!
//! A program that measures from its own `main` must hand control to
//! [`run_worker`] when [`worker_requested`] is true, because the scheduler
//! re-executes the current binary for every trial.

// Re-export the worker runtime
pub use serdebench_core::{
    BoxError, SampleError, Sampler, UnitDef, UnitOutcome, WorkUnit, error_chain, find_unit,
    registered_units,
};

// Re-export macros
pub use serdebench_macros::unit;

// Re-export aggregation
pub use serdebench_stats::{AggregateResult, TrialTotals, aggregate};

// Re-export scheduling and the CLI runner
pub use serdebench_cli::{
    Cli, SchedulerConfig, SchedulerError, SerdebenchConfig, TrialScheduler, init_logging,
    measure, run, run_with_cli, run_worker, worker_requested,
};

/// Trial wire types
pub use serdebench_ipc::{FailureKind, TrialSample};

/// Report model and renderers
pub mod report {
    pub use serdebench_report::*;
}

/// Internal re-exports for macro use
#[doc(hidden)]
pub mod internal {
    pub use inventory;
}
