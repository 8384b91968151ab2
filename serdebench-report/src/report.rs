//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serdebench_stats::AggregateResult;

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub results: Vec<UnitReport>,
    pub summary: ReportSummary,
}

impl Report {
    /// Assemble a report and derive its summary from the results
    pub fn new(meta: ReportMeta, results: Vec<UnitReport>, total_duration_ms: f64) -> Self {
        let passed = results
            .iter()
            .filter(|r| r.status == UnitStatus::Passed)
            .count();
        let summary = ReportSummary {
            total_units: results.len(),
            passed,
            failed: results.len() - passed,
            total_duration_ms,
        };
        Self {
            meta,
            results,
            summary,
        }
    }

    /// Whether any unit failed
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub system: SystemInfo,
    pub config: ReportConfig,
}

/// Scheduler configuration captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub cycles: usize,
    pub pool_size: usize,
    pub trial_timeout_ms: Option<u64>,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: u32,
    pub memory_gb: f64,
}

/// Result of measuring one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitReport {
    pub id: String,
    pub group: String,
    pub status: UnitStatus,
    pub metrics: Option<UnitMetrics>,
    pub failure: Option<FailureInfo>,
}

impl UnitReport {
    /// A unit whose trials all completed
    pub fn passed(id: &str, group: &str, result: &AggregateResult) -> Self {
        Self {
            id: id.to_string(),
            group: group.to_string(),
            status: UnitStatus::Passed,
            metrics: Some(UnitMetrics::from(result)),
            failure: None,
        }
    }

    /// A unit whose measurement aborted
    pub fn failed(id: &str, group: &str, kind: &str, message: String) -> Self {
        Self {
            id: id.to_string(),
            group: group.to_string(),
            status: UnitStatus::Failed,
            metrics: None,
            failure: Some(FailureInfo {
                kind: kind.to_string(),
                message,
            }),
        }
    }
}

/// Unit measurement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Passed,
    Failed,
}

/// Averages over all trials of a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitMetrics {
    pub cycles: usize,
    pub avg_seconds: f64,
    pub avg_rss_bytes: f64,
}

impl From<&AggregateResult> for UnitMetrics {
    fn from(result: &AggregateResult) -> Self {
        Self {
            cycles: result.cycles,
            avg_seconds: result.avg_seconds,
            avg_rss_bytes: result.avg_rss_bytes,
        }
    }
}

/// Failure information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: String,
    pub message: String,
}

/// Report summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_units: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_duration_ms: f64,
}
