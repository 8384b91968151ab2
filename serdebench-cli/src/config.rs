//! Configuration loading from serdebench.toml
//!
//! The configuration file is discovered by walking up from the current
//! directory. Command-line flags override every value found here.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up by [`SerdebenchConfig::discover`]
pub const CONFIG_FILE: &str = "serdebench.toml";

/// serdebench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SerdebenchConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Trials per unit
    #[serde(default = "default_cycles")]
    pub cycles: usize,
    /// Number of concurrent worker processes (defaults to logical CPUs)
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Deadline for a single trial (e.g. "60s", "5m"); none by default
    #[serde(default)]
    pub trial_timeout: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cycles: default_cycles(),
            jobs: None,
            trial_timeout: None,
        }
    }
}

fn default_cycles() -> usize {
    10
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "json" or "csv"
    #[serde(default = "default_format")]
    pub format: String,
    /// Write the report to this file instead of stdout
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            path: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl SerdebenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Walk up from the current directory and load the first config file found
    pub fn discover() -> anyhow::Result<Option<(PathBuf, Self)>> {
        let dir = std::env::current_dir().context("reading current directory")?;
        Self::discover_from(&dir)
    }

    /// Walk up from `start` and load the first config file found
    pub fn discover_from(start: &Path) -> anyhow::Result<Option<(PathBuf, Self)>> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.is_file() {
                let config = Self::load(&config_path)?;
                return Ok(Some((config_path, config)));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Parsed `runner.trial_timeout`
    pub fn trial_timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.runner
            .trial_timeout
            .as_deref()
            .map(|s| Self::parse_duration(s).map(Duration::from_nanos))
            .transpose()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("Empty duration string");
        }

        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            anyhow::bail!("Duration must be a non-negative number: {}", s);
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => anyhow::bail!("Unknown duration unit: {}", unit_part),
        };

        Ok((value * multiplier as f64) as u64)
    }
}
