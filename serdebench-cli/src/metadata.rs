//! System Metadata Collection
//!
//! CPU model, core count and total memory come from `sysinfo`, so they work
//! on every platform the worker's RSS meter works on.

use chrono::Utc;
use serdebench_report::{ReportConfig, ReportMeta, SystemInfo};
use sysinfo::System;

/// Build report metadata for a run with the given scheduler settings
pub fn build_report_meta(config: ReportConfig) -> ReportMeta {
    ReportMeta {
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        system: system_info(),
        config,
    }
}

fn system_info() -> SystemInfo {
    let mut sys = System::new();
    sys.refresh_cpu();
    sys.refresh_memory();

    let cpu = sys
        .cpus()
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu,
        cpu_cores: std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1),
        memory_gb: sys.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_carries_config() {
        let meta = build_report_meta(ReportConfig {
            cycles: 5,
            pool_size: 2,
            trial_timeout_ms: Some(1000),
        });
        assert_eq!(meta.config.cycles, 5);
        assert_eq!(meta.system.os, std::env::consts::OS);
        assert!(meta.system.cpu_cores >= 1);
        assert!(!meta.version.is_empty());
    }
}
