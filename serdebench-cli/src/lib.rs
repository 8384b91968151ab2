#![warn(missing_docs)]
//! serdebench CLI Library
//!
//! Scheduler, worker supervision and the command-line runner for suite
//! binaries. A suite registers its units with `#[serdebench::unit]` and
//! hands control to [`run`]:
//!
//! ```ignore
//! use serdebench::{Sampler, unit};
//!
//! #[unit(group = "alloc")]
//! fn allocate(s: &mut Sampler) {
//!     s.measure(|| vec![0u8; 1 << 20]);
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     serdebench::run()
//! }
//! ```
//!
//! The same binary is re-executed as the worker for every trial, so `run`
//! must be reached before the suite does anything it would not want repeated
//! once per trial (or the suite checks [`worker_requested`] itself).

mod config;
mod metadata;
mod planner;
mod scheduler;
mod supervisor;

pub use config::{CONFIG_FILE, OutputConfig, RunnerConfig, SerdebenchConfig};
pub use metadata::build_report_meta;
pub use planner::{ExecutionPlan, build_plan};
pub use scheduler::{SchedulerConfig, TrialScheduler, measure};
pub use serdebench_core::worker_requested;
pub use supervisor::{SchedulerError, WorkerHandle};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serdebench_core::{WorkUnit, WorkerMain, registered_units};
use serdebench_report::{OutputFormat, Report, ReportConfig, UnitReport, render};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// serdebench CLI arguments
#[derive(Parser, Debug, Default)]
#[command(name = "serdebench")]
#[command(
    author,
    version,
    about = "serdebench - process-isolated time and memory measurement"
)]
pub struct Cli {
    /// Optional subcommand; defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter units by regex over their ids
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Trials per unit (default: 10, or `runner.cycles` from serdebench.toml)
    #[arg(short, long)]
    pub cycles: Option<usize>,

    /// Run units of this group only
    #[arg(long)]
    pub group: Option<String>,

    /// Concurrent worker processes (default: logical CPUs)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Kill a trial after this many seconds (default: no deadline)
    #[arg(long, value_name = "SECS")]
    pub trial_timeout: Option<f64>,

    /// Output format: human, json, csv
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Dry run - list units without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: Run as worker process (used by the scheduler)
    #[arg(long = "serdebench-worker", hide = true)]
    pub serdebench_worker: bool,

    /// Internal: Absorb cargo bench's --bench flag
    #[arg(long, hide = true)]
    pub bench: bool,
}

impl Cli {
    /// Whether this invocation should only list units
    pub fn lists_only(&self) -> bool {
        self.dry_run || matches!(self.command, Some(Commands::List))
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all registered units
    List,
    /// Run units (default)
    Run,
}

/// Run the serdebench CLI. This is the main entry point for suite binaries.
pub fn run() -> anyhow::Result<()> {
    // Workers skip argument parsing entirely
    if worker_requested() {
        return run_worker();
    }
    run_with_cli(Cli::parse())
}

/// Run the serdebench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    if cli.serdebench_worker {
        return run_worker();
    }

    init_logging(cli.verbose);

    let config = match SerdebenchConfig::discover()? {
        Some((path, config)) => {
            tracing::debug!("using configuration from {}", path.display());
            config
        }
        None => SerdebenchConfig::default(),
    };

    if cli.lists_only() {
        return list_units(&cli);
    }
    run_units(&cli, &config)
}

/// Serve exactly one trial over IPC, then return
pub fn run_worker() -> anyhow::Result<()> {
    let mut worker = WorkerMain::new();
    worker
        .run()
        .map_err(|e| anyhow::anyhow!("Worker error: {}", e))
}

/// Install the stderr log subscriber (`RUST_LOG` wins when set).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "serdebench=debug"
    } else {
        "serdebench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn select_units(cli: &Cli) -> anyhow::Result<ExecutionPlan> {
    let filter = regex::Regex::new(&cli.filter)
        .with_context(|| format!("invalid unit filter {:?}", cli.filter))?;
    Ok(build_plan(
        registered_units(),
        Some(&filter),
        cli.group.as_deref(),
    ))
}

fn list_units(cli: &Cli) -> anyhow::Result<()> {
    let plan = select_units(cli)?;

    println!("serdebench plan:");
    for (group, units) in plan.groups() {
        println!("├── group: {}", group);
        for unit in units {
            println!("│   ├── {} ({}:{})", unit.id, unit.file, unit.line);
        }
    }
    println!("{} units found.", plan.units.len());

    Ok(())
}

/// Settings after layering serdebench.toml under the CLI flags
struct RunSettings {
    cycles: usize,
    scheduler: SchedulerConfig,
    format: OutputFormat,
    output: Option<PathBuf>,
}

fn resolve_settings(cli: &Cli, config: &SerdebenchConfig) -> anyhow::Result<RunSettings> {
    let cycles = cli.cycles.unwrap_or(config.runner.cycles);
    if cycles == 0 {
        return Err(SchedulerError::InvalidCycles.into());
    }

    let trial_timeout = match cli.trial_timeout {
        Some(secs) => Some(
            Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid --trial-timeout {}", secs))?,
        ),
        None => config
            .trial_timeout()
            .context("invalid runner.trial_timeout")?,
    };
    if trial_timeout == Some(Duration::ZERO) {
        anyhow::bail!("trial timeout must be greater than zero");
    }

    let format = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse::<OutputFormat>()
        .map_err(anyhow::Error::msg)?;

    Ok(RunSettings {
        cycles,
        scheduler: SchedulerConfig {
            jobs: cli.jobs.or(config.runner.jobs),
            trial_timeout,
            worker_binary: None,
        },
        format,
        output: cli.output.clone().or_else(|| config.output.path.clone()),
    })
}

fn run_units(cli: &Cli, config: &SerdebenchConfig) -> anyhow::Result<()> {
    let settings = resolve_settings(cli, config)?;
    let plan = select_units(cli)?;

    if plan.units.is_empty() {
        println!("No units found.");
        return Ok(());
    }

    let scheduler = TrialScheduler::new(settings.scheduler.clone())?;
    let cycles = settings.cycles;
    tracing::info!(
        units = plan.units.len(),
        cycles,
        pool_size = scheduler.pool_size(),
        "running units"
    );

    let start_time = Instant::now();
    let pb = ProgressBar::new((plan.units.len() * cycles) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut results = Vec::with_capacity(plan.units.len());
    for (index, unit) in plan.units.iter().enumerate() {
        pb.set_message(unit.id.to_string());
        pb.suspend(|| tracing::info!(unit = unit.id, group = unit.group, "unit started"));
        let work = WorkUnit::from(*unit);

        match scheduler.measure_with_progress(cycles, &work, |n| pb.inc(n as u64)) {
            Ok(result) => {
                pb.suspend(|| {
                    tracing::info!(
                        unit = unit.id,
                        avg_seconds = result.avg_seconds,
                        avg_rss_bytes = result.avg_rss_bytes,
                        "unit finished"
                    )
                });
                results.push(UnitReport::passed(unit.id, unit.group, &result));
            }
            Err(e) => {
                pb.suspend(|| tracing::warn!(unit = unit.id, "unit failed: {}", e));
                results.push(UnitReport::failed(
                    unit.id,
                    unit.group,
                    &e.kind(),
                    e.message(),
                ));
            }
        }
        pb.set_position(((index + 1) * cycles) as u64);
    }
    pb.finish_and_clear();

    let total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    let meta = build_report_meta(ReportConfig {
        cycles,
        pool_size: scheduler.pool_size(),
        trial_timeout_ms: scheduler.trial_timeout().map(|t| t.as_millis() as u64),
    });
    let report = Report::new(meta, results, total_duration_ms);

    let output = render(&report, settings.format)?;
    match &settings.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(path, output)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Report written to: {}", path.display());
        }
        None => print!("{}", output),
    }

    if report.has_failures() {
        anyhow::bail!(
            "{} of {} unit(s) failed",
            report.summary.failed,
            report.summary.total_units
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "suite",
            "^load_",
            "-c",
            "3",
            "--jobs",
            "2",
            "--trial-timeout",
            "1.5",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.filter, "^load_");
        assert_eq!(cli.cycles, Some(3));
        assert_eq!(cli.jobs, Some(2));
        assert_eq!(cli.trial_timeout, Some(1.5));
        assert!(!cli.lists_only());
    }

    #[test]
    fn test_cli_list_subcommand() {
        let cli = Cli::try_parse_from(["suite", "list"]).unwrap();
        assert!(cli.lists_only());
        let cli = Cli::try_parse_from(["suite", "--dry-run"]).unwrap();
        assert!(cli.lists_only());
    }

    #[test]
    fn test_cli_accepts_hidden_flags() {
        let cli = Cli::try_parse_from(["suite", "--serdebench-worker"]).unwrap();
        assert!(cli.serdebench_worker);
        let cli = Cli::try_parse_from(["suite", "--bench"]).unwrap();
        assert!(cli.bench);
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = SerdebenchConfig::default();
        config.runner.cycles = 7;
        config.runner.jobs = Some(4);
        config.runner.trial_timeout = Some("2s".to_string());
        config.output.format = "csv".to_string();

        let cli = Cli::try_parse_from(["suite", "--jobs", "1", "--format", "json"]).unwrap();
        let settings = resolve_settings(&cli, &config).unwrap();
        assert_eq!(settings.cycles, 7);
        assert_eq!(settings.scheduler.jobs, Some(1));
        assert_eq!(
            settings.scheduler.trial_timeout,
            Some(Duration::from_secs(2))
        );
        assert_eq!(settings.format, OutputFormat::Json);
    }

    #[test]
    fn test_zero_cycles_rejected() {
        let cli = Cli::try_parse_from(["suite", "-c", "0"]).unwrap();
        let err = resolve_settings(&cli, &SerdebenchConfig::default())
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<SchedulerError>(),
            Some(SchedulerError::InvalidCycles)
        ));
    }

    #[test]
    fn test_zero_trial_timeout_rejected() {
        let cli = Cli::try_parse_from(["suite", "--trial-timeout", "0"]).unwrap();
        let err = resolve_settings(&cli, &SerdebenchConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("greater than zero"), "{}", err);

        let config: SerdebenchConfig =
            toml::from_str("[runner]\ntrial_timeout = \"0s\"\n").unwrap();
        let cli = Cli::try_parse_from(["suite"]).unwrap();
        let err = resolve_settings(&cli, &config).err().unwrap();
        assert!(err.to_string().contains("greater than zero"), "{}", err);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let cli = Cli::try_parse_from(["suite", "--format", "html"]).unwrap();
        assert!(resolve_settings(&cli, &SerdebenchConfig::default()).is_err());
    }
}
