//! Run driver: sections, tasks and invocations, strictly in order.

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::{ConfigError, Result, RunnerError};
use crate::gist;
use crate::obs::{self, TaskSpan};
use crate::registry::SchemeRegistry;
use crate::report::{InvocationOutcome, ReportLayout, SectionReport};
use crate::runner::{BoundedRunner, ProcessGroupLauncher, TaskLauncher};
use crate::task::{BenchmarkTask, TaskEnumerator, TaskState};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every section was reported.
    Completed { sections: usize, tasks: usize },

    /// An external interrupt stopped the run. The in-flight task was
    /// terminated and has no row.
    Interrupted,
}

/// Drives the benchmark plan against the verifier.
pub struct RunDriver<L = ProcessGroupLauncher> {
    config: HarnessConfig,
    registry: SchemeRegistry,
    runner: BoundedRunner<L>,
}

impl RunDriver<ProcessGroupLauncher> {
    pub fn new(config: HarnessConfig) -> std::result::Result<Self, ConfigError> {
        let launcher = ProcessGroupLauncher::new(config.kill_grace());
        Self::with_launcher(config, launcher)
    }
}

impl<L: TaskLauncher> RunDriver<L> {
    /// Validate the plan and freeze the scheme registry.
    pub fn with_launcher(
        config: HarnessConfig,
        launcher: L,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let registry = config.registry();
        Ok(Self {
            config,
            registry,
            runner: BoundedRunner::new(launcher),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every section, writing headers and rows to `out` as they are ready.
    ///
    /// Timeouts, launch failures and malformed gists are reported in their
    /// row; only configuration and write errors end the run early.
    pub async fn run<W, F>(&self, out: &mut W, interrupt: F) -> Result<RunOutcome>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        let enumerator = TaskEnumerator::new(
            &self.registry,
            &self.config.verifier,
            &self.config.examples_root,
        );

        let mut tasks_done = 0usize;
        for (index, section) in self.config.sections.iter().enumerate() {
            let scheme = self.registry.get(section.scheme)?;
            let tasks = enumerator.enumerate(index, section)?;
            obs::emit_section_started(index, section.scheme, tasks.len());

            let mut report = SectionReport::new(ReportLayout::new(
                scheme.display_name.as_str(),
                self.config.name_width,
                &section.columns,
            ));

            if index > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{}", report.layout().header())?;
            out.flush()?;

            for task in &tasks {
                let Some(outcomes) = self.run_task(task, interrupt.as_mut()).await else {
                    obs::emit_run_interrupted(index, tasks_done);
                    return Ok(RunOutcome::Interrupted);
                };

                let row = report.push(task.display_name(), &outcomes);
                writeln!(out, "{}", row.line())?;
                out.flush()?;
                tasks_done += 1;
            }
        }

        info!(
            sections = self.config.sections.len(),
            tasks = tasks_done,
            "Benchmark run complete"
        );
        Ok(RunOutcome::Completed {
            sections: self.config.sections.len(),
            tasks: tasks_done,
        })
    }

    /// Run every invocation of one task. `None` means the run was interrupted.
    async fn run_task<F>(
        &self,
        task: &BenchmarkTask,
        mut interrupt: Pin<&mut F>,
    ) -> Option<Vec<InvocationOutcome>>
    where
        F: Future<Output = ()> + ?Sized,
    {
        let _span = TaskSpan::enter(task.scheme, &task.program);
        let mut state = transition(TaskState::Pending, TaskState::Running);
        let mut result = TaskState::Completed;
        let mut outcomes = Vec::with_capacity(task.invocations.len());

        for (index, invocation) in task.invocations.iter().enumerate() {
            obs::emit_invocation_started(index, &invocation.argv);
            let started = Instant::now();

            let outcome = match self
                .runner
                .run_interruptible(&invocation.argv, self.config.timeout(), interrupt.as_mut())
                .await
            {
                Ok(raw) => {
                    let timed_out = raw.is_timed_out();
                    match gist::decode(&raw, &invocation.layout) {
                        Ok(record) if timed_out => {
                            obs::emit_invocation_timed_out(index, self.config.timeout_secs);
                            InvocationOutcome::TimedOut(record)
                        }
                        Ok(record) => InvocationOutcome::Completed(record),
                        Err(e) => {
                            obs::emit_invocation_failed(index, &e);
                            InvocationOutcome::ParseFailed(e)
                        }
                    }
                }
                Err(RunnerError::Interrupted) => return None,
                Err(e) => {
                    obs::emit_invocation_failed(index, &e);
                    InvocationOutcome::LaunchFailed(e.to_string())
                }
            };

            obs::emit_invocation_finished(
                index,
                started.elapsed().as_millis() as u64,
                outcome.state(),
            );
            result = result.worst(outcome.state());
            outcomes.push(outcome);
        }

        state = transition(state, result);
        state = transition(state, TaskState::Reported);
        obs::emit_task_reported(state);
        Some(outcomes)
    }
}

fn transition(from: TaskState, to: TaskState) -> TaskState {
    match from.advance(to) {
        Ok(next) => {
            debug!(from = ?from, to = ?next, "Task state");
            next
        }
        Err(e) => {
            warn!(error = %e, "Unexpected task transition");
            to
        }
    }
}
