//! Structured lifecycle events for benchmark runs.
//!
//! Every task runs inside a `sealbench.task` span, so invocation events carry
//! the scheme and program without repeating them. Events go to the tracing
//! subscriber (stderr); the table itself goes to stdout.

use tracing::{info, warn};

use crate::registry::SchemeId;
use crate::task::TaskState;

/// RAII guard that enters a task-scoped span for the duration of a task.
///
/// ```ignore
/// let _span = TaskSpan::enter(SchemeId::Hp, "TreiberStack");
/// // events emitted here carry scheme=hp program=TreiberStack
/// ```
pub struct TaskSpan {
    _span: tracing::span::EnteredSpan,
}

impl TaskSpan {
    pub fn enter(scheme: SchemeId, program: &str) -> Self {
        let span = tracing::info_span!("sealbench.task", scheme = %scheme, program = %program);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_section_started(index: usize, scheme: SchemeId, tasks: usize) {
    info!(event = "section.started", section = index, scheme = %scheme, tasks = tasks);
}

pub fn emit_invocation_started(index: usize, argv: &[String]) {
    info!(event = "invocation.started", invocation = index, argv = %argv.join(" "));
}

/// Emit event: invocation ended, with its wall-clock time and outcome.
pub fn emit_invocation_finished(index: usize, elapsed_ms: u64, state: TaskState) {
    info!(
        event = "invocation.finished",
        invocation = index,
        elapsed_ms = elapsed_ms,
        state = ?state,
    );
}

pub fn emit_invocation_timed_out(index: usize, limit_secs: u64) {
    warn!(event = "invocation.timed_out", invocation = index, limit_secs = limit_secs);
}

pub fn emit_invocation_failed(index: usize, error: &dyn std::fmt::Display) {
    warn!(event = "invocation.failed", invocation = index, error = %error);
}

pub fn emit_task_reported(state: TaskState) {
    info!(event = "task.reported", state = ?state);
}

pub fn emit_run_interrupted(sections_done: usize, tasks_done: usize) {
    warn!(
        event = "run.interrupted",
        sections_done = sections_done,
        tasks_done = tasks_done,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_span_create() {
        let _span = TaskSpan::enter(SchemeId::Ebr, "DGLM");
        emit_task_reported(TaskState::Reported);
    }
}
