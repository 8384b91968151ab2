//! IPC Message Types
//!
//! All messages are serialized with rkyv and validated on receipt.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

/// The raw readings of one trial, taken inside the worker.
///
/// Both RSS readings travel so the scheduler can log baselines; the delta is
/// what gets aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct TrialSample {
    /// Monotonic time spent in the measured section
    pub elapsed_nanos: u64,
    /// Resident set size right before the measured section
    pub rss_start_bytes: u64,
    /// Resident set size right after the measured section
    pub rss_end_bytes: u64,
}

impl TrialSample {
    /// Create a sample from raw readings
    #[inline]
    pub fn new(elapsed_nanos: u64, rss_start_bytes: u64, rss_end_bytes: u64) -> Self {
        Self {
            elapsed_nanos,
            rss_start_bytes,
            rss_end_bytes,
        }
    }

    /// Signed RSS change; negative when the unit released memory.
    #[inline]
    pub fn rss_delta_bytes(&self) -> i64 {
        self.rss_end_bytes as i64 - self.rss_start_bytes as i64
    }
}

/// Worker capabilities advertised during handshake
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct WorkerCapabilities {
    /// Protocol version for compatibility
    pub protocol_version: u32,
    /// OS process id of the worker
    pub pid: u32,
    /// Number of logical CPUs the worker sees
    pub cpu_count: u32,
}

impl Default for WorkerCapabilities {
    fn default() -> Self {
        Self {
            protocol_version: crate::PROTOCOL_VERSION,
            pid: std::process::id(),
            cpu_count: num_cpus(),
        }
    }
}

/// Messages sent from Worker to Scheduler
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum WorkerMessage {
    /// Initial handshake with worker capabilities
    Hello(WorkerCapabilities),

    /// The single trial this worker ran
    Trial(TrialSample),

    /// The unit failed; no trial was recorded
    Failure {
        /// Error category
        kind: FailureKind,
        /// Human-readable error message, verbatim from the unit
        message: String,
        /// Optional backtrace (panics only)
        backtrace: Option<String>,
    },
}

/// Categories of unit failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum FailureKind {
    /// Rust panic (caught)
    Panic,
    /// The unit returned an error
    Error,
    /// The measurement bracket was misused or RSS could not be read
    Measurement,
    /// No unit with the requested id is registered in the worker binary
    UnknownUnit,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Panic => "panic",
            FailureKind::Error => "error",
            FailureKind::Measurement => "measurement",
            FailureKind::UnknownUnit => "unknown unit",
        };
        f.write_str(name)
    }
}

/// Commands sent from Scheduler to Worker
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum SupervisorCommand {
    /// Run one trial of a unit, then exit
    Run {
        /// Registered unit identifier
        unit_id: String,
        /// Serialized arguments; every worker gets its own copy
        payload: Vec<u8>,
    },

    /// Exit without running anything
    Shutdown,
}

fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|p| p.get() as u32)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rss_delta_is_signed() {
        let grew = TrialSample::new(10, 4096, 8192);
        assert_eq!(grew.rss_delta_bytes(), 4096);

        let shrank = TrialSample::new(10, 8192, 4096);
        assert_eq!(shrank.rss_delta_bytes(), -4096);
    }

    #[test]
    fn test_worker_capabilities_default() {
        let caps = WorkerCapabilities::default();
        assert_eq!(caps.protocol_version, crate::PROTOCOL_VERSION);
        assert_eq!(caps.pid, std::process::id());
        assert!(caps.cpu_count >= 1);
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Panic.to_string(), "panic");
        assert_eq!(FailureKind::UnknownUnit.to_string(), "unknown unit");
    }
}
