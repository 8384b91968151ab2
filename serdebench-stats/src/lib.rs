#![warn(missing_docs)]
//! serdebench Aggregation
//!
//! Folds the trials of one `measure` call into per-trial averages. The fold
//! is commutative, so trials may arrive in any completion order.

mod aggregate;

pub use aggregate::{AggregateResult, TrialTotals, aggregate};
