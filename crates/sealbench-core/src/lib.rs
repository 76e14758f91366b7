//! sealbench - benchmark driver for the seal SMR verifier
//!
//! Runs every (scheme × program × mode) cell of a benchmark plan through the
//! external verifier and tabulates the results:
//! - Enumerates tasks and derives verifier command lines from the plan
//! - Runs each invocation in its own process group under a hard deadline
//! - Decodes the verifier's gist line into verdicts and timings
//! - Prints an aligned comparison table per SMR scheme

#[cfg(not(unix))]
compile_error!("sealbench needs Unix process groups to bound verifier runs");

pub mod config;
pub mod driver;
pub mod error;
pub mod gist;
pub mod obs;
pub mod registry;
pub mod report;
pub mod runner;
pub mod task;
pub mod telemetry;

// Re-export key types
pub use config::{ColumnSpec, HarnessConfig, InvocationSpec, SectionSpec};
pub use driver::{RunDriver, RunOutcome};
pub use error::{ConfigError, GistError, HarnessError, RunnerError};
pub use gist::{
    decode, decode_line, decode_output, timeout_sentinel, Category, GistLayout, GistRecord, Slot,
    SlotKind, Verdict,
};
pub use registry::{SchemeConfig, SchemeId, SchemeRegistry};
pub use report::{InvocationOutcome, ReportLayout, ReportRow, SectionReport};
pub use runner::{
    BoundedRunner, CancellableTask, ProcessGroupLauncher, ProcessGroupTask, RawInvocationResult,
    TaskLauncher, WaitOutcome,
};
pub use task::{BenchmarkTask, Invocation, TaskEnumerator, TaskState, VerificationMode};
pub use telemetry::init_tracing;
