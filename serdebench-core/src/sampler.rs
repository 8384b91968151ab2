//! Sampler - The Trial Measurement API
//!
//! A unit receives a `Sampler`, does its untimed preparation, and wraps the
//! work it wants measured in exactly one [`Sampler::measure`] call:
//!
//! ```ignore
//! #[serdebench::unit(group = "json")]
//! fn load_json(s: &mut Sampler) -> anyhow::Result<()> {
//!     let path: PathBuf = s.args()?;           // not measured
//!     let flights = s.measure(|| json::load(&path))?;
//!     anyhow::ensure!(!flights.is_empty());    // not measured
//!     Ok(())
//! }
//! ```

use crate::measure::{RssMeter, Timer};
use serde::de::DeserializeOwned;
use serdebench_ipc::TrialSample;
use thiserror::Error;

/// Errors raised while taking a trial
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("resident memory unavailable: {0}")]
    MemoryUnavailable(String),

    #[error("invalid unit arguments: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("unit returned without calling Sampler::measure")]
    NotMeasured,

    #[error("unit called Sampler::measure {0} times; exactly one call is allowed")]
    MeasuredRepeatedly(u32),
}

/// Takes the single trial of one worker process
pub struct Sampler {
    payload: Vec<u8>,
    memory: RssMeter,
    sample: Option<TrialSample>,
    calls: u32,
    rss_error: Option<SampleError>,
}

impl Sampler {
    /// Create a sampler holding this worker's copy of the unit arguments
    pub fn new(payload: Vec<u8>) -> Result<Self, SampleError> {
        Ok(Self {
            payload,
            memory: RssMeter::new()?,
            sample: None,
            calls: 0,
            rss_error: None,
        })
    }

    /// Decode the unit arguments. An empty payload decodes as JSON `null`,
    /// so `()` and `Option<T>` work for units called without arguments.
    pub fn args<T: DeserializeOwned>(&self) -> Result<T, SampleError> {
        if self.payload.is_empty() {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Raw argument bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Run `f` once between two RSS readings and two monotonic clock readings.
    ///
    /// The value returned by `f` is still alive at the second RSS reading, so
    /// a loader's result counts towards its memory delta.
    pub fn measure<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.calls += 1;

        let rss_start = self.memory.rss_bytes();
        let timer = Timer::start();

        let output = std::hint::black_box(f());

        let elapsed_nanos = timer.stop();
        let rss_end = self.memory.rss_bytes();

        match (rss_start, rss_end) {
            (Ok(start), Ok(end)) => {
                self.sample = Some(TrialSample::new(elapsed_nanos, start, end));
            }
            (Err(e), _) | (_, Err(e)) => self.rss_error = Some(e),
        }

        output
    }

    /// Number of `measure` calls so far
    pub fn calls(&self) -> u32 {
        self.calls
    }

    /// Consume the sampler and return its trial
    pub fn finish(self) -> Result<TrialSample, SampleError> {
        if let Some(e) = self.rss_error {
            return Err(e);
        }
        match (self.calls, self.sample) {
            (1, Some(sample)) => Ok(sample),
            (0, _) => Err(SampleError::NotMeasured),
            (n, _) => Err(SampleError::MeasuredRepeatedly(n)),
        }
    }
}
