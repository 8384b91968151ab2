//! Human-Readable Output
//!
//! One line per unit, the way the suite has always printed them:
//!
//! ```text
//! save_csv                                    0.412 s     18.004 MiB
//! ```

use crate::report::{Report, UnitStatus};

const BINARY_SUFFIXES: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// Format seconds with millisecond precision: `"1.234 s"`
pub fn format_time(seconds: f64) -> String {
    format!("{:.3} s", seconds)
}

/// Format a byte count with binary prefixes and three decimals.
///
/// Values below 1 KiB are printed as whole bytes (`"512 Bytes"`, `"1 Byte"`).
/// Negative values keep their sign.
pub fn format_rss(bytes: f64) -> String {
    let base = 1024.0_f64;
    let abs_bytes = bytes.abs();

    if abs_bytes == 1.0 {
        return format!("{} Byte", bytes.trunc() as i64);
    }
    if abs_bytes < base {
        return format!("{} Bytes", bytes.trunc() as i64);
    }

    let mut unit = base;
    for suffix in BINARY_SUFFIXES {
        unit *= base;
        if abs_bytes < unit {
            return format!("{:.3} {}", base * bytes / unit, suffix);
        }
    }
    format!("{:.3} {}", base * bytes / unit, BINARY_SUFFIXES[BINARY_SUFFIXES.len() - 1])
}

/// Format a report for terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str(&format!(
        "serdebench: {} cycles per unit, {} worker(s), {} ({} cores)\n",
        report.meta.config.cycles,
        report.meta.config.pool_size,
        report.meta.system.cpu,
        report.meta.system.cpu_cores
    ));
    output.push_str(&"=".repeat(72));
    output.push('\n');

    for result in &report.results {
        match (&result.status, &result.metrics, &result.failure) {
            (UnitStatus::Passed, Some(metrics), _) => {
                output.push_str(&format!(
                    "{:<44} {:>10} {:>16}\n",
                    result.id,
                    format_time(metrics.avg_seconds),
                    format_rss(metrics.avg_rss_bytes)
                ));
            }
            (_, _, Some(failure)) => {
                output.push_str(&format!(
                    "{:<44} FAILED ({}): {}\n",
                    result.id, failure.kind, failure.message
                ));
            }
            _ => {
                output.push_str(&format!("{:<44} FAILED\n", result.id));
            }
        }
    }

    output.push_str(&"=".repeat(72));
    output.push('\n');
    output.push_str(&format!(
        "{} units: {} passed, {} failed in {:.1} s\n",
        report.summary.total_units,
        report.summary.passed,
        report.summary.failed,
        report.summary.total_duration_ms / 1000.0
    ));

    output
}
