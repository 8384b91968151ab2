//! Worker Process Entry Point
//!
//! Handles the worker side of the scheduler-worker architecture. A worker
//! lives for exactly one trial: handshake, one `Run`, one reply, exit.
//!
//! On Unix, uses fd 3/4 for IPC (set via `SERDEBENCH_IPC_FD`). Otherwise, or
//! when the variable is absent, falls back to stdin/stdout.

use crate::sampler::Sampler;
use crate::unit::{error_chain, find_unit};
use serdebench_ipc::{
    FailureKind, FrameError, FrameReader, FrameWriter, IPC_FD_ENV, SupervisorCommand, WORKER_FLAG,
    WorkerCapabilities, WorkerMessage,
};

#[cfg(unix)]
use std::os::unix::io::FromRawFd;

/// Whether this process was started by the scheduler as a worker
pub fn worker_requested() -> bool {
    has_worker_flag(std::env::args_os())
}

fn has_worker_flag<I: IntoIterator<Item = std::ffi::OsString>>(args: I) -> bool {
    args.into_iter().any(|arg| arg == WORKER_FLAG)
}

/// IPC transport: either inherited fd pair or stdin/stdout fallback.
enum IpcTransport {
    #[cfg(unix)]
    Fds { read_fd: i32, write_fd: i32 },
    Stdio,
}

fn detect_transport() -> IpcTransport {
    #[cfg(unix)]
    if let Ok(val) = std::env::var(IPC_FD_ENV) {
        if let Some((r, w)) = val.split_once(',') {
            if let (Ok(read_fd), Ok(write_fd)) = (r.parse::<i32>(), w.parse::<i32>()) {
                return IpcTransport::Fds { read_fd, write_fd };
            }
        }
        eprintln!(
            "serdebench: warning: invalid {IPC_FD_ENV}={val:?} (expected <read_fd>,<write_fd>), falling back to stdio"
        );
    }
    IpcTransport::Stdio
}

/// Worker main loop
pub struct WorkerMain {
    reader: FrameReader<Box<dyn std::io::Read>>,
    writer: FrameWriter<Box<dyn std::io::Write>>,
}

impl WorkerMain {
    /// Create a new worker, using fd 3/4 if the IPC variable is set, otherwise stdin/stdout.
    pub fn new() -> Self {
        match detect_transport() {
            #[cfg(unix)]
            IpcTransport::Fds { read_fd, write_fd } => {
                // SAFETY: the scheduler dup2'd both pipe ends onto these fds
                // before exec and nothing else in this process owns them.
                let read_file = unsafe { std::fs::File::from_raw_fd(read_fd) };
                let write_file = unsafe { std::fs::File::from_raw_fd(write_fd) };
                Self::with_streams(Box::new(read_file), Box::new(write_file))
            }
            IpcTransport::Stdio => {
                Self::with_streams(Box::new(std::io::stdin()), Box::new(std::io::stdout()))
            }
        }
    }

    /// Create a worker over arbitrary streams
    pub fn with_streams(reader: Box<dyn std::io::Read>, writer: Box<dyn std::io::Write>) -> Self {
        Self {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
        }
    }

    /// Handshake, serve one command, return.
    pub fn run(&mut self) -> Result<(), FrameError> {
        self.writer
            .write(&WorkerMessage::Hello(WorkerCapabilities::default()))?;

        match self.reader.read::<SupervisorCommand>() {
            Ok(SupervisorCommand::Run { unit_id, payload }) => {
                let reply = run_unit(&unit_id, payload);
                self.writer.write(&reply)
            }
            Ok(SupervisorCommand::Shutdown) | Err(FrameError::EndOfStream) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Default for WorkerMain {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one trial of a registered unit and build the reply message
pub fn run_unit(unit_id: &str, payload: Vec<u8>) -> WorkerMessage {
    let Some(unit) = find_unit(unit_id) else {
        return WorkerMessage::Failure {
            kind: FailureKind::UnknownUnit,
            message: format!("Unit not found: {}", unit_id),
            backtrace: None,
        };
    };

    let mut sampler = match Sampler::new(payload) {
        Ok(sampler) => sampler,
        Err(e) => {
            return WorkerMessage::Failure {
                kind: FailureKind::Measurement,
                message: e.to_string(),
                backtrace: None,
            };
        }
    };

    let outcome =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (unit.runner_fn)(&mut sampler)));

    match outcome {
        Ok(Ok(())) => match sampler.finish() {
            Ok(sample) => WorkerMessage::Trial(sample),
            Err(e) => WorkerMessage::Failure {
                kind: FailureKind::Measurement,
                message: e.to_string(),
                backtrace: None,
            },
        },
        Ok(Err(e)) => WorkerMessage::Failure {
            kind: FailureKind::Error,
            message: error_chain(e.as_ref()),
            backtrace: None,
        },
        Err(panic) => {
            let message = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };

            let backtrace = std::backtrace::Backtrace::capture();
            let backtrace = match backtrace.status() {
                std::backtrace::BacktraceStatus::Captured => Some(backtrace.to_string()),
                _ => None,
            };

            WorkerMessage::Failure {
                kind: FailureKind::Panic,
                message,
                backtrace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{BoxError, UnitDef};
    use std::io::Cursor;

    fn measured(s: &mut Sampler) -> Result<(), BoxError> {
        let bytes: usize = s.args()?;
        s.measure(|| vec![1u8; bytes]);
        Ok(())
    }

    fn failing(_s: &mut Sampler) -> Result<(), BoxError> {
        Err("codec exploded".into())
    }

    fn panicking(_s: &mut Sampler) -> Result<(), BoxError> {
        panic!("unit panicked");
    }

    inventory::submit! {
        UnitDef {
            id: "worker_test_measured", name: "measured", group: "worker",
            runner_fn: measured, file: file!(), line: line!(), module_path: module_path!(),
        }
    }
    inventory::submit! {
        UnitDef {
            id: "worker_test_failing", name: "failing", group: "worker",
            runner_fn: failing, file: file!(), line: line!(), module_path: module_path!(),
        }
    }
    inventory::submit! {
        UnitDef {
            id: "worker_test_panicking", name: "panicking", group: "worker",
            runner_fn: panicking, file: file!(), line: line!(), module_path: module_path!(),
        }
    }

    #[test]
    fn test_run_unit_reports_trial() {
        let payload = serde_json::to_vec(&4096usize).unwrap();
        match run_unit("worker_test_measured", payload) {
            WorkerMessage::Trial(sample) => assert!(sample.rss_start_bytes > 0),
            other => panic!("expected trial, got {:?}", other),
        }
    }

    #[test]
    fn test_run_unit_forwards_error_verbatim() {
        match run_unit("worker_test_failing", Vec::new()) {
            WorkerMessage::Failure { kind, message, .. } => {
                assert_eq!(kind, FailureKind::Error);
                assert_eq!(message, "codec exploded");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_run_unit_catches_panic() {
        match run_unit("worker_test_panicking", Vec::new()) {
            WorkerMessage::Failure { kind, message, .. } => {
                assert_eq!(kind, FailureKind::Panic);
                assert_eq!(message, "unit panicked");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_run_unit_unknown_id() {
        match run_unit("worker_test_missing", Vec::new()) {
            WorkerMessage::Failure { kind, .. } => assert_eq!(kind, FailureKind::UnknownUnit),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_worker_flag_found_among_non_utf8_args() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let args = vec![
            OsString::from("flights"),
            OsString::from_vec(vec![0x66, 0xff, 0x6f]),
            OsString::from(WORKER_FLAG),
        ];
        assert!(has_worker_flag(args));
        assert!(!has_worker_flag(vec![OsString::from_vec(vec![0xff])]));
        assert!(!worker_requested());
    }

    #[test]
    fn test_worker_serves_one_command_over_streams() {
        let mut commands = Vec::new();
        FrameWriter::new(&mut commands)
            .write(&SupervisorCommand::Run {
                unit_id: "worker_test_measured".to_string(),
                payload: b"1024".to_vec(),
            })
            .unwrap();

        let replies = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut worker = WorkerMain::with_streams(
            Box::new(Cursor::new(commands)),
            Box::new(SharedBuffer(replies.clone())),
        );
        worker.run().unwrap();

        let bytes = replies.borrow().clone();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read::<WorkerMessage>().unwrap(),
            WorkerMessage::Hello(_)
        ));
        assert!(matches!(
            reader.read::<WorkerMessage>().unwrap(),
            WorkerMessage::Trial(_)
        ));
    }

    struct SharedBuffer(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
