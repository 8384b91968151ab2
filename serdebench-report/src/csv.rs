//! CSV Output

use crate::report::{Report, UnitStatus};

const HEADER: &str = "id,group,status,cycles,avg_seconds,avg_rss_bytes,error";

/// Generate one CSV row per unit, with a header line.
pub fn generate_csv_report(report: &Report) -> String {
    let mut output = String::from(HEADER);
    output.push('\n');

    for result in &report.results {
        let status = match result.status {
            UnitStatus::Passed => "passed",
            UnitStatus::Failed => "failed",
        };
        let (cycles, seconds, rss) = match &result.metrics {
            Some(m) => (
                m.cycles.to_string(),
                format!("{:.9}", m.avg_seconds),
                format!("{:.1}", m.avg_rss_bytes),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        let error = result
            .failure
            .as_ref()
            .map(|f| format!("{}: {}", f.kind, f.message))
            .unwrap_or_default();

        let row = [
            escape(&result.id),
            escape(&result.group),
            status.to_string(),
            cycles,
            seconds,
            rss,
            escape(&error),
        ];
        output.push_str(&row.join(","));
        output.push('\n');
    }

    output
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
