#![warn(missing_docs)]
//! serdebench Core - Worker Runtime
//!
//! This crate provides the execution environment for work units:
//! - `UnitDef` registry populated by `#[serdebench::unit]`
//! - `Sampler`, which brackets one unit invocation with RSS and monotonic
//!   clock readings
//! - `WorkerMain`, the one-trial worker process loop

mod measure;
mod sampler;
mod unit;
mod worker;

pub use measure::{RssMeter, Timer};
pub use sampler::{SampleError, Sampler};
pub use unit::{
    BoxError, REGISTRY_ANCHOR, UnitDef, UnitOutcome, WorkUnit, error_chain, find_unit,
    registered_units,
};
pub use worker::{WorkerMain, run_unit, worker_requested};
