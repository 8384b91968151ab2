#![warn(missing_docs)]
//! serdebench IPC Protocol
//!
//! Framed rkyv messages exchanged between the trial scheduler and the
//! worker processes it spawns. One worker runs one trial:
//!
//! ```text
//! worker  ── Hello ──────────────▶ scheduler
//! worker  ◀─ Run { unit, args } ── scheduler
//! worker  ── Trial | Failure ────▶ scheduler
//! (worker exits)
//! ```

mod framing;
mod messages;

pub use framing::{FrameError, FrameReader, FrameWriter, MAX_FRAME_SIZE, read_frame, write_frame};
pub use messages::{
    FailureKind, SupervisorCommand, TrialSample, WorkerCapabilities, WorkerMessage,
};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Environment variable carrying the inherited `<read_fd>,<write_fd>` pair
pub const IPC_FD_ENV: &str = "SERDEBENCH_IPC_FD";

/// Hidden command-line flag that turns a binary into a worker
pub const WORKER_FLAG: &str = "--serdebench-worker";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_sample_layout() {
        // Three u64 readings, no padding
        assert_eq!(std::mem::size_of::<TrialSample>(), 24);
    }

    #[test]
    fn test_command_roundtrip_preserves_payload() {
        let command = SupervisorCommand::Run {
            unit_id: "save_csv".to_string(),
            payload: br#"{"rows":3}"#.to_vec(),
        };

        let mut buffer = Vec::new();
        FrameWriter::new(&mut buffer).write(&command).unwrap();
        let decoded: SupervisorCommand = FrameReader::new(buffer.as_slice()).read().unwrap();

        match decoded {
            SupervisorCommand::Run { unit_id, payload } => {
                assert_eq!(unit_id, "save_csv");
                assert_eq!(payload, br#"{"rows":3}"#);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
