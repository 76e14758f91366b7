//! Bounded execution of verifier invocations.
//!
//! [`BoundedRunner`] owns the deadline logic; how a process tree is started
//! and torn down sits behind [`TaskLauncher`] and [`CancellableTask`], so the
//! signal mechanism can vary by platform while the contract stays the same:
//! once `terminate_all` returns, nothing the invocation spawned is still
//! running.

pub mod process_group;

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::RunnerError;

pub use process_group::{ProcessGroupLauncher, ProcessGroupTask};

/// What one invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInvocationResult {
    /// The verifier exited on its own. `output` is stdout and stderr
    /// interleaved in arrival order.
    Completed {
        output: String,
        exit_code: Option<i32>,
    },

    /// The deadline passed and the process group was terminated.
    TimedOut,
}

impl RawInvocationResult {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, RawInvocationResult::TimedOut)
    }
}

/// Result of waiting on a started task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed {
        output: String,
        exit_code: Option<i32>,
    },
    TimedOut,
}

/// A running invocation that can be awaited against a deadline and torn down
/// as a unit.
#[async_trait]
pub trait CancellableTask: Send {
    /// Wait until the task finishes or `deadline` passes. Does not kill
    /// anything on timeout.
    async fn wait(&mut self, deadline: Instant) -> Result<WaitOutcome, RunnerError>;

    /// Terminate the task and every descendant it spawned.
    async fn terminate_all(&mut self) -> Result<(), RunnerError>;
}

/// Starts cancellable tasks from an argument vector.
pub trait TaskLauncher: Send + Sync {
    type Task: CancellableTask;

    fn start(&self, argv: &[String]) -> Result<Self::Task, RunnerError>;
}

/// Runs one invocation at a time under a wall-clock limit.
#[derive(Debug, Clone)]
pub struct BoundedRunner<L> {
    launcher: L,
}

impl<L: TaskLauncher> BoundedRunner<L> {
    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run `argv` for at most `timeout`.
    pub async fn run(
        &self,
        argv: &[String],
        timeout: Duration,
    ) -> Result<RawInvocationResult, RunnerError> {
        let never = std::future::pending::<()>();
        tokio::pin!(never);
        self.run_interruptible(argv, timeout, never).await
    }

    /// Like [`run`](Self::run), but gives up as soon as `interrupt` resolves.
    /// The process group is terminated before `Interrupted` is returned.
    pub async fn run_interruptible<F>(
        &self,
        argv: &[String],
        timeout: Duration,
        interrupt: Pin<&mut F>,
    ) -> Result<RawInvocationResult, RunnerError>
    where
        F: Future<Output = ()> + ?Sized,
    {
        let deadline = Instant::now() + timeout;
        let mut task = self.launcher.start(argv)?;

        let waited = tokio::select! {
            biased;
            _ = interrupt => None,
            outcome = task.wait(deadline) => Some(outcome),
        };

        match waited {
            None => {
                task.terminate_all().await?;
                Err(RunnerError::Interrupted)
            }
            Some(Ok(WaitOutcome::Completed { output, exit_code })) => {
                Ok(RawInvocationResult::Completed { output, exit_code })
            }
            Some(Ok(WaitOutcome::TimedOut)) => {
                task.terminate_all().await?;
                Ok(RawInvocationResult::TimedOut)
            }
            Some(Err(e)) => {
                task.terminate_all().await?;
                Err(e)
            }
        }
    }
}
