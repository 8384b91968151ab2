//! Time and Memory Readings
//!
//! `Timer` wraps `std::time::Instant`, which is monotonic and never goes
//! backward under wall-clock adjustments. `RssMeter` reads this process's
//! resident set size through `sysinfo`.

use crate::sampler::SampleError;
use sysinfo::{Pid, System};

// ─── Timer ───────────────────────────────────────────────────────────────────

/// Monotonic timer for one measured section
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Stop the timer and return elapsed nanoseconds
    #[inline(always)]
    pub fn stop(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
}

// ─── RssMeter ────────────────────────────────────────────────────────────────

/// Reads the resident set size of the current process.
///
/// The process table is primed on construction so that the readings taken
/// around a measured section do not include the meter's own first-use
/// allocations.
pub struct RssMeter {
    system: System,
    pid: Pid,
}

impl RssMeter {
    /// Create a meter for the current process
    pub fn new() -> Result<Self, SampleError> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| SampleError::MemoryUnavailable(e.to_string()))?;
        let mut meter = Self {
            system: System::new(),
            pid,
        };
        meter.rss_bytes()?;
        Ok(meter)
    }

    /// Current resident set size in bytes
    pub fn rss_bytes(&mut self) -> Result<u64, SampleError> {
        if !self.system.refresh_process(self.pid) {
            return Err(SampleError::MemoryUnavailable(format!(
                "process {} not visible",
                self.pid
            )));
        }
        self.system
            .process(self.pid)
            .map(|process| process.memory())
            .ok_or_else(|| SampleError::MemoryUnavailable(format!("no entry for {}", self.pid)))
    }
}
