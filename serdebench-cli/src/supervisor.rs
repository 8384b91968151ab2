//! Worker Process Handle
//!
//! Spawns one worker process per trial and drives it over IPC.
//!
//! The worker is a re-execution of a serdebench binary with the hidden
//! worker flag. Commands travel on fd 3 and messages come back on fd 4.

use serdebench_core::WorkUnit;
use serdebench_ipc::{
    FailureKind, FrameError, FrameReader, FrameWriter, IPC_FD_ENV, PROTOCOL_VERSION,
    SupervisorCommand, TrialSample, WORKER_FLAG, WorkerMessage,
};
use std::os::unix::io::{FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Grace period between SIGTERM and SIGKILL for a timed-out worker
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Longest single poll; liveness is rechecked between polls
const POLL_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("cycles must be at least 1")]
    InvalidCycles,

    #[error("Worker pool unavailable: {0}")]
    PoolExhausted(String),

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Worker protocol error: expected {expected}, got {got}")]
    ProtocolError { expected: String, got: String },

    #[error("Worker crashed: {0}")]
    WorkerCrashed(String),

    #[error("Trial exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("Unit {unit} failed ({kind}): {message}")]
    UnitFailed {
        unit: String,
        kind: FailureKind,
        message: String,
    },
}

impl SchedulerError {
    /// Short label used in reports
    pub fn kind(&self) -> String {
        match self {
            SchedulerError::InvalidCycles => "invalid cycles".to_string(),
            SchedulerError::PoolExhausted(_) => "pool".to_string(),
            SchedulerError::UnitNotFound(_) => "unknown unit".to_string(),
            SchedulerError::SpawnFailed(_) => "spawn".to_string(),
            SchedulerError::Ipc(_) | SchedulerError::ProtocolError { .. } => "ipc".to_string(),
            SchedulerError::WorkerCrashed(_) => "crash".to_string(),
            SchedulerError::Timeout(_) => "timeout".to_string(),
            SchedulerError::UnitFailed { kind, .. } => kind.to_string(),
        }
    }

    /// Message without the kind prefix; a unit's own error text is kept verbatim
    pub fn message(&self) -> String {
        match self {
            SchedulerError::UnitFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<FrameError> for SchedulerError {
    fn from(e: FrameError) -> Self {
        SchedulerError::Ipc(e.to_string())
    }
}

#[derive(Debug)]
enum PollResult {
    DataAvailable,
    Timeout,
    PipeClosed,
    Error(std::io::Error),
}

/// Wait for data to be available on a file descriptor with timeout
fn wait_for_data(fd: RawFd, timeout: Duration) -> PollResult {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

    // SAFETY: `pollfd` is a valid, exclusively borrowed pollfd for one entry.
    let result = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };

    if result < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::Interrupted {
            PollResult::Timeout
        } else {
            PollResult::Error(err)
        }
    } else if result == 0 {
        PollResult::Timeout
    } else if pollfd.revents & libc::POLLIN != 0 {
        // A dead worker may still have left its reply in the pipe
        PollResult::DataAvailable
    } else if pollfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
        PollResult::PipeClosed
    } else {
        PollResult::Timeout
    }
}

/// Create a close-on-exec pipe pair, returning (read_fd, write_fd).
fn create_pipe() -> Result<(RawFd, RawFd), std::io::Error> {
    let mut fds = [0 as RawFd; 2];
    // Close-on-exec from creation; other batch threads fork concurrently
    // SAFETY: `fds` has room for the two descriptors pipe2() writes.
    let ret = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok((fds[0], fds[1]))
}

fn close_fd(fd: RawFd) {
    // SAFETY: callers only pass descriptors they own and never reuse them.
    unsafe {
        libc::close(fd);
    }
}

/// Place `fd` at `target` in a freshly forked child, inheritable across exec.
///
/// Only async-signal-safe calls; runs between fork and exec.
fn inherit_as(fd: RawFd, target: RawFd) {
    // SAFETY: called from pre_exec on descriptors the child inherited.
    unsafe {
        if fd != target {
            libc::dup2(fd, target);
            libc::close(fd);
        }
        let flags = libc::fcntl(target, libc::F_GETFD);
        libc::fcntl(target, libc::F_SETFD, flags & !libc::FD_CLOEXEC);
    }
}

fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    // SAFETY: kill() has no memory-safety preconditions.
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// One worker process, good for exactly one trial
pub struct WorkerHandle {
    child: Child,
    reader: FrameReader<std::fs::File>,
    writer: FrameWriter<std::fs::File>,
    timeout: Option<Duration>,
    msg_read_fd: RawFd,
}

impl WorkerHandle {
    /// Spawn `binary` in worker mode and wait for its handshake
    pub fn spawn(binary: &Path, timeout: Option<Duration>) -> Result<Self, SchedulerError> {
        // cmd pipe: scheduler writes, worker reads fd 3
        let (cmd_read, cmd_write) = create_pipe()?;
        // msg pipe: worker writes fd 4, scheduler reads
        let (msg_read, msg_write) = match create_pipe() {
            Ok(fds) => fds,
            Err(e) => {
                close_fd(cmd_read);
                close_fd(cmd_write);
                return Err(SchedulerError::SpawnFailed(e));
            }
        };

        let mut command = Command::new(binary);
        command
            .arg(WORKER_FLAG)
            .env(IPC_FD_ENV, "3,4")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        // SAFETY: the closure only calls async-signal-safe libc functions.
        unsafe {
            command.pre_exec(move || {
                libc::close(cmd_write);
                libc::close(msg_read);
                // Moving cmd_read onto fd 3 must not clobber msg_write
                let mut msg_src = msg_write;
                if msg_src == 3 {
                    msg_src = libc::fcntl(msg_write, libc::F_DUPFD_CLOEXEC, 5);
                    if msg_src < 0 {
                        return Err(std::io::Error::last_os_error());
                    }
                }
                inherit_as(cmd_read, 3);
                inherit_as(msg_src, 4);
                Ok(())
            });
        }

        let child = match command.spawn() {
            Ok(c) => c,
            Err(e) => {
                close_fd(cmd_read);
                close_fd(cmd_write);
                close_fd(msg_read);
                close_fd(msg_write);
                return Err(SchedulerError::SpawnFailed(e));
            }
        };

        close_fd(cmd_read);
        close_fd(msg_write);

        // SAFETY: both descriptors are the parent ends of pipes created above,
        // and ownership moves into the File wrappers.
        let writer_file = unsafe { std::fs::File::from_raw_fd(cmd_write) };
        let reader_file = unsafe { std::fs::File::from_raw_fd(msg_read) };

        let mut handle = Self {
            child,
            reader: FrameReader::new(reader_file),
            writer: FrameWriter::new(writer_file),
            timeout,
            msg_read_fd: msg_read,
        };

        handle.wait_for_hello()?;
        Ok(handle)
    }

    fn wait_for_hello(&mut self) -> Result<(), SchedulerError> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        match self.next_message(deadline)? {
            WorkerMessage::Hello(caps) => {
                if caps.protocol_version != PROTOCOL_VERSION {
                    return Err(SchedulerError::ProtocolError {
                        expected: format!("protocol version {}", PROTOCOL_VERSION),
                        got: format!("protocol version {}", caps.protocol_version),
                    });
                }
                tracing::trace!(
                    pid = caps.pid,
                    cpu_count = caps.cpu_count,
                    "worker ready"
                );
                Ok(())
            }
            other => Err(SchedulerError::ProtocolError {
                expected: "Hello".to_string(),
                got: format!("{:?}", other),
            }),
        }
    }

    /// Process id of the worker
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Run the single trial this worker will ever run
    pub fn run_trial(&mut self, unit: &WorkUnit) -> Result<TrialSample, SchedulerError> {
        self.writer.write(&SupervisorCommand::Run {
            unit_id: unit.id().to_string(),
            payload: unit.payload().to_vec(),
        })?;

        let deadline = self.timeout.map(|t| Instant::now() + t);
        match self.next_message(deadline)? {
            WorkerMessage::Trial(sample) => Ok(sample),
            WorkerMessage::Failure {
                kind: FailureKind::UnknownUnit,
                ..
            } => Err(SchedulerError::UnitNotFound(unit.id().to_string())),
            WorkerMessage::Failure {
                kind,
                message,
                backtrace,
            } => {
                if let Some(backtrace) = backtrace {
                    tracing::debug!(unit = unit.id(), "worker backtrace:\n{}", backtrace);
                }
                Err(SchedulerError::UnitFailed {
                    unit: unit.id().to_string(),
                    kind,
                    message,
                })
            }
            WorkerMessage::Hello(_) => Err(SchedulerError::ProtocolError {
                expected: "Trial/Failure".to_string(),
                got: "Hello".to_string(),
            }),
        }
    }

    /// Block until the next message, the deadline, or the worker's death
    fn next_message(&mut self, deadline: Option<Instant>) -> Result<WorkerMessage, SchedulerError> {
        loop {
            if self.reader.has_buffered_data() {
                break;
            }

            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(self.handle_timeout());
                    }
                    remaining.min(POLL_SLICE)
                }
                None => POLL_SLICE,
            };

            match wait_for_data(self.msg_read_fd, slice) {
                PollResult::DataAvailable => break,
                PollResult::Timeout => {
                    if !self.is_alive() {
                        // The exit may race with the final write; look once more
                        if let PollResult::DataAvailable =
                            wait_for_data(self.msg_read_fd, Duration::ZERO)
                        {
                            break;
                        }
                        return Err(SchedulerError::WorkerCrashed(self.exit_description()));
                    }
                }
                PollResult::PipeClosed => {
                    return Err(SchedulerError::WorkerCrashed(self.exit_description()));
                }
                PollResult::Error(e) => {
                    return Err(SchedulerError::WorkerCrashed(format!("Pipe error: {}", e)));
                }
            }
        }

        match self.reader.read::<WorkerMessage>() {
            Ok(msg) => Ok(msg),
            Err(FrameError::EndOfStream) => {
                Err(SchedulerError::WorkerCrashed(self.exit_description()))
            }
            Err(FrameError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(
                SchedulerError::WorkerCrashed(format!("{} mid-message", self.exit_description())),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// SIGTERM, wait out the grace period, then SIGKILL
    fn handle_timeout(&mut self) -> SchedulerError {
        tracing::warn!(pid = self.child.id(), "trial deadline exceeded, terminating worker");
        let _ = send_sigterm(self.child.id());

        let grace_deadline = Instant::now() + KILL_GRACE;
        while self.is_alive() && Instant::now() < grace_deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        if self.is_alive() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();

        SchedulerError::Timeout(self.timeout.unwrap_or_default())
    }

    fn exit_description(&mut self) -> String {
        match self.child.try_wait() {
            Ok(Some(status)) => format!("worker exited ({})", status),
            _ => "worker closed its message pipe".to_string(),
        }
    }

    /// Tell the worker to exit and reap it
    pub fn shutdown(mut self) -> Result<(), SchedulerError> {
        if self.is_alive() {
            // The worker exits on its own after a trial; a closed pipe is fine.
            let _ = self.writer.write(&SupervisorCommand::Shutdown);
        }
        self.child.wait()?;
        Ok(())
    }

    /// Check if worker process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.is_alive() {
            let _ = send_sigterm(self.child.id());
            std::thread::sleep(Duration::from_millis(50));
            if self.is_alive() {
                let _ = self.child.kill();
            }
        }
        let _ = self.child.wait();
    }
}
