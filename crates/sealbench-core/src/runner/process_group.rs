//! Unix process-group tasks.
//!
//! Each invocation leads its own process group, so a single `killpg` reaches
//! every descendant that did not deliberately leave the group. stdout and
//! stderr share one pipe, which keeps their lines in arrival order.

use async_trait::async_trait;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{CancellableTask, TaskLauncher, WaitOutcome};
use crate::error::RunnerError;

/// Default time between SIGTERM and SIGKILL.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(500);

/// Create a pipe with close-on-exec set on both ends.
fn create_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as RawFd; 2];
    // SAFETY: `fds` is a writable array of two descriptors, as pipe() requires.
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: pipe() succeeded, so both descriptors are open and owned by us.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    for fd in [&read, &write] {
        let raw = fd.as_raw_fd();
        // SAFETY: `raw` is an open descriptor owned by this function.
        let ret = unsafe {
            let flags = libc::fcntl(raw, libc::F_GETFD);
            libc::fcntl(raw, libc::F_SETFD, flags | libc::FD_CLOEXEC)
        };
        if ret == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok((read, write))
}

/// Send `signal` to every member of process group `pgid`.
///
/// A group that no longer exists is not an error. Neither is EPERM, which
/// some platforms return for a group of zombies.
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) -> io::Result<()> {
    // SAFETY: killpg takes plain integers and touches no memory of ours.
    let ret = unsafe { libc::killpg(pgid, signal) };
    if ret == -1 {
        let err = io::Error::last_os_error();
        return match err.raw_os_error() {
            Some(libc::ESRCH) | Some(libc::EPERM) => Ok(()),
            _ => Err(err),
        };
    }
    Ok(())
}

/// Launches each argument vector as the leader of a fresh process group.
#[derive(Debug, Clone)]
pub struct ProcessGroupLauncher {
    kill_grace: Duration,
}

impl ProcessGroupLauncher {
    pub fn new(kill_grace: Duration) -> Self {
        Self { kill_grace }
    }
}

impl Default for ProcessGroupLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_KILL_GRACE)
    }
}

impl TaskLauncher for ProcessGroupLauncher {
    type Task = ProcessGroupTask;

    fn start(&self, argv: &[String]) -> Result<ProcessGroupTask, RunnerError> {
        let (program, args) = argv.split_first().ok_or_else(|| RunnerError::Launch {
            program: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"),
        })?;
        let launch_err = |source: io::Error| RunnerError::Launch {
            program: program.clone(),
            source,
        };

        let (read_end, write_end) = create_pipe().map_err(launch_err)?;
        let stderr_end = write_end.try_clone().map_err(launch_err)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(write_end))
            .stderr(Stdio::from(stderr_end))
            .process_group(0)
            .kill_on_drop(true);

        let spawned = command.spawn();
        // The command still holds our copies of the write end; the reader
        // only sees EOF once they are closed.
        drop(command);
        let child = spawned.map_err(launch_err)?;

        let pgid = child
            .id()
            .ok_or_else(|| launch_err(io::Error::other("verifier exited before it was tracked")))?
            as libc::pid_t;
        debug!(program = %program, pgid = pgid, "Spawned verifier");

        let reader = tokio::task::spawn_blocking(move || {
            let mut pipe = File::from(read_end);
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).map(|_| buf)
        });

        Ok(ProcessGroupTask {
            child,
            pgid,
            reader: Some(reader),
            kill_grace: self.kill_grace,
            exited: false,
            finished: false,
        })
    }
}

/// A verifier process and its process group.
pub struct ProcessGroupTask {
    child: Child,
    pgid: libc::pid_t,
    reader: Option<JoinHandle<io::Result<Vec<u8>>>>,
    kill_grace: Duration,
    /// Leader has been reaped.
    exited: bool,
    /// Group swept and output collected; nothing left to clean up.
    finished: bool,
}

impl ProcessGroupTask {
    pub fn pgid(&self) -> u32 {
        self.pgid as u32
    }

    fn sweep(&self) {
        if let Err(e) = signal_group(self.pgid, libc::SIGKILL) {
            warn!(pgid = self.pgid, error = %e, "Failed to kill verifier process group");
        }
    }
}

#[async_trait]
impl CancellableTask for ProcessGroupTask {
    async fn wait(&mut self, deadline: Instant) -> Result<WaitOutcome, RunnerError> {
        let status = match tokio::time::timeout_at(deadline, self.child.wait()).await {
            Ok(status) => status.map_err(RunnerError::Wait)?,
            Err(_) => return Ok(WaitOutcome::TimedOut),
        };
        self.exited = true;

        // Stragglers left in the group would keep the pipe open.
        self.sweep();

        let bytes = match self.reader.take() {
            Some(reader) => match tokio::time::timeout_at(deadline, reader).await {
                Ok(joined) => joined
                    .map_err(|e| RunnerError::Wait(io::Error::other(e)))?
                    .map_err(RunnerError::Wait)?,
                Err(_) => return Ok(WaitOutcome::TimedOut),
            },
            None => Vec::new(),
        };
        self.finished = true;

        Ok(WaitOutcome::Completed {
            output: String::from_utf8_lossy(&bytes).into_owned(),
            exit_code: status.code(),
        })
    }

    async fn terminate_all(&mut self) -> Result<(), RunnerError> {
        if self.finished {
            return Ok(());
        }

        if !self.exited {
            signal_group(self.pgid, libc::SIGTERM).map_err(RunnerError::Wait)?;
            if let Ok(status) = tokio::time::timeout(self.kill_grace, self.child.wait()).await {
                status.map_err(RunnerError::Wait)?;
                self.exited = true;
            }
        }

        // Descendants may ignore SIGTERM or outlive the leader.
        signal_group(self.pgid, libc::SIGKILL).map_err(RunnerError::Wait)?;
        if !self.exited {
            self.child.wait().await.map_err(RunnerError::Wait)?;
            self.exited = true;
        }

        if let Some(reader) = self.reader.take() {
            // Output is discarded; just give the pipe a chance to close.
            let _ = tokio::time::timeout(self.kill_grace, reader).await;
        }
        self.finished = true;
        debug!(pgid = self.pgid, "Terminated verifier process group");
        Ok(())
    }
}

impl Drop for ProcessGroupTask {
    fn drop(&mut self) {
        if !self.finished {
            self.sweep();
        }
    }
}
