//! Integration tests for serdebench
//!
//! In-process checks of the public API. Tests that spawn worker processes
//! live in `isolation.rs`, whose binary can act as its own worker.

use serdebench::report::{OutputFormat, Report, ReportConfig, UnitReport, render};
use serdebench::{
    AggregateResult, Sampler, SchedulerConfig, SchedulerError, TrialSample, TrialScheduler,
    TrialTotals, WorkUnit, aggregate, find_unit, registered_units, unit,
};

#[unit(id = "integration_allocate", group = "integration")]
fn allocate(s: &mut Sampler) {
    let len: usize = s.args().unwrap_or(1024);
    let buffer = s.measure(|| vec![7u8; len]);
    assert_eq!(buffer.len(), len);
}

#[unit(group = "integration")]
fn integration_fails(s: &mut Sampler) -> Result<(), std::io::Error> {
    s.measure(|| ());
    Err(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        "row 3: bad date",
    ))
}

#[unit(group = "integration")]
fn integration_never_measures(_s: &mut Sampler) -> anyhow::Result<()> {
    Ok(())
}

fn run_in_process(id: &str, payload: Vec<u8>) -> Result<TrialSample, String> {
    let def = find_unit(id).ok_or("unit missing")?;
    let mut sampler = Sampler::new(payload).map_err(|e| e.to_string())?;
    (def.runner_fn)(&mut sampler).map_err(|e| serdebench::error_chain(e.as_ref()))?;
    sampler.finish().map_err(|e| e.to_string())
}

#[test]
fn test_macro_registers_units() {
    let def = find_unit("integration_allocate").unwrap();
    assert_eq!(def.name, "allocate");
    assert_eq!(def.group, "integration");

    // id defaults to the function name
    assert!(find_unit("integration_fails").is_some());

    let ids: Vec<_> = registered_units().iter().map(|u| u.id).collect();
    let allocate_pos = ids.iter().position(|id| *id == "integration_allocate");
    let fails_pos = ids.iter().position(|id| *id == "integration_fails");
    assert!(allocate_pos < fails_pos, "units keep source order: {:?}", ids);
}

#[test]
fn test_unit_runs_in_process_with_args() {
    let unit = WorkUnit::new("integration_allocate")
        .with_args(&(8 * 1024 * 1024usize))
        .unwrap();
    let sample = run_in_process(unit.id(), unit.payload().to_vec()).unwrap();
    assert!(sample.rss_start_bytes > 0);
    assert!(sample.rss_end_bytes > 0);
}

#[test]
fn test_unit_error_is_reported_verbatim() {
    let err = run_in_process("integration_fails", Vec::new()).unwrap_err();
    assert_eq!(err, "row 3: bad date");
}

#[test]
fn test_unit_must_measure() {
    let err = run_in_process("integration_never_measures", Vec::new()).unwrap_err();
    assert!(err.contains("without calling Sampler::measure"), "{}", err);
}

#[test]
fn test_aggregate_is_exact_for_fixed_trials() {
    let trials = [
        TrialSample::new(1_000_000_000, 1_000, 1_100),
        TrialSample::new(2_000_000_000, 1_000, 1_200),
        TrialSample::new(3_000_000_000, 1_000, 1_300),
    ];
    let result = aggregate(trials.iter(), 3).unwrap();
    assert_eq!(
        result,
        AggregateResult {
            avg_seconds: 2.0,
            avg_rss_bytes: 200.0,
            cycles: 3,
        }
    );

    let mut totals = TrialTotals::new();
    for trial in trials.iter().rev() {
        totals.add(trial);
    }
    assert_eq!(totals.finish(3), Some(result));
}

#[test]
fn test_scheduler_rejects_zero_cycles() {
    let scheduler = TrialScheduler::new(SchedulerConfig {
        jobs: Some(1),
        ..SchedulerConfig::default()
    })
    .unwrap();
    let result = scheduler.measure(0, &WorkUnit::new("integration_allocate"));
    assert!(matches!(result, Err(SchedulerError::InvalidCycles)));
}

#[test]
fn test_report_renders_every_format() {
    let result = AggregateResult {
        avg_seconds: 0.5,
        avg_rss_bytes: 1536.0,
        cycles: 4,
    };
    let meta = serdebench::report::ReportMeta {
        version: "test".to_string(),
        timestamp: chrono::Utc::now(),
        system: serdebench::report::SystemInfo {
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            cpu: "cpu".to_string(),
            cpu_cores: 4,
            memory_gb: 8.0,
        },
        config: ReportConfig {
            cycles: 4,
            pool_size: 4,
            trial_timeout_ms: None,
        },
    };
    let report = Report::new(
        meta,
        vec![UnitReport::passed("integration_allocate", "integration", &result)],
        10.0,
    );

    let human = render(&report, OutputFormat::Human).unwrap();
    assert!(human.contains("0.500 s"));
    assert!(human.contains("1.500 KiB"));

    let json: serde_json::Value =
        serde_json::from_str(&render(&report, OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json["results"][0]["metrics"]["avg_seconds"], 0.5);
    assert_eq!(json["summary"]["passed"], 1);

    let csv = render(&report, OutputFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 2);
}
