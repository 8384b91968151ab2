#![warn(missing_docs)]
//! serdebench Report - Output Formats
//!
//! Generates:
//! - Human-readable lines (`<unit> <time> <rss>`)
//! - JSON (machine-readable, reloadable)
//! - CSV (spreadsheet-compatible)

mod csv;
mod human;
mod json;
mod report;

pub use csv::generate_csv_report;
pub use human::{format_human_output, format_rss, format_time};
pub use json::{generate_json_report, parse_json_report};
pub use report::{
    FailureInfo, Report, ReportConfig, ReportMeta, ReportSummary, SystemInfo, UnitMetrics,
    UnitReport, UnitStatus,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON with full schema
    Json,
    /// CSV for spreadsheets
    Csv,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Render a report in the requested format
pub fn render(report: &Report, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Csv => Ok(generate_csv_report(report)),
        OutputFormat::Human => Ok(format_human_output(report)),
    }
}
