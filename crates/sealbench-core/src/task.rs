//! Benchmark tasks and their verifier command lines.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::SectionSpec;
use crate::error::ConfigError;
use crate::gist::GistLayout;
use crate::registry::{SchemeConfig, SchemeId, SchemeRegistry};

/// Asks the verifier to finish with a gist line.
pub const GIST_FLAG: &str = "-g";

/// File extension of benchmark programs.
pub const PROGRAM_EXTENSION: &str = "cola";

/// Verification questions the verifier can be asked.
///
/// Declaration order is the canonical order of flags on the command line and
/// of slots in the gist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationMode {
    /// Synthesize type guarantees and check the program against them.
    SynthesizeTypes,

    /// Check against the scheme's hand-crafted guarantee file.
    CheckGivenTypes,

    CheckAnnotations,

    CheckLinearizability,
}

impl VerificationMode {
    pub fn flag(&self) -> &'static str {
        match self {
            VerificationMode::SynthesizeTypes => "-t",
            VerificationMode::CheckGivenTypes => "-c",
            VerificationMode::CheckAnnotations => "-a",
            VerificationMode::CheckLinearizability => "-l",
        }
    }

    pub fn checks_types(&self) -> bool {
        matches!(
            self,
            VerificationMode::SynthesizeTypes | VerificationMode::CheckGivenTypes
        )
    }
}

/// One verifier process to run for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub modes: Vec<VerificationMode>,
    pub argv: Vec<String>,
    pub layout: GistLayout,
}

/// One report row: a program under a scheme, verified by one or more invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkTask {
    pub section: usize,
    pub scheme: SchemeId,
    pub program: String,
    pub invocations: Vec<Invocation>,
}

impl BenchmarkTask {
    pub fn display_name(&self) -> &str {
        &self.program
    }
}

/// Derives tasks and argument vectors from the plan. Pure: never touches the
/// filesystem.
#[derive(Debug, Clone, Copy)]
pub struct TaskEnumerator<'a> {
    registry: &'a SchemeRegistry,
    verifier: &'a [String],
    examples_root: &'a Path,
}

impl<'a> TaskEnumerator<'a> {
    pub fn new(
        registry: &'a SchemeRegistry,
        verifier: &'a [String],
        examples_root: &'a Path,
    ) -> Self {
        Self {
            registry,
            verifier,
            examples_root,
        }
    }

    /// `<examples_root>/<program_folder>/<name>.cola`
    pub fn program_path(&self, scheme: &SchemeConfig, program: &str) -> PathBuf {
        self.examples_root
            .join(&scheme.program_folder)
            .join(format!("{program}.{PROGRAM_EXTENSION}"))
    }

    /// Command line for one invocation:
    /// `verifier -g <mode flags> <scheme flags> <program> <spec> [<guarantees>]`.
    pub fn argv(
        &self,
        scheme: SchemeId,
        program: &str,
        modes: &[VerificationMode],
    ) -> Result<Vec<String>, ConfigError> {
        if self.verifier.is_empty() {
            return Err(ConfigError::EmptyVerifierCommand);
        }
        let config = self.registry.get(scheme)?;
        let modes = canonical(modes);

        let mut argv: Vec<String> = self.verifier.to_vec();
        argv.push(GIST_FLAG.to_string());
        argv.extend(modes.iter().map(|m| m.flag().to_string()));
        argv.extend(config.extra_flags.iter().cloned());
        argv.push(path_arg(&self.program_path(config, program)));
        argv.push(path_arg(&self.examples_root.join(&config.spec_file)));

        if modes.contains(&VerificationMode::CheckGivenTypes) {
            let guarantees = config
                .guarantee_file
                .as_ref()
                .ok_or(ConfigError::MissingGuaranteeFile(scheme))?;
            argv.push(path_arg(&self.examples_root.join(guarantees)));
        }

        Ok(argv)
    }

    /// Tasks for one section, in declared program order.
    pub fn enumerate(
        &self,
        section_index: usize,
        section: &SectionSpec,
    ) -> Result<Vec<BenchmarkTask>, ConfigError> {
        section
            .programs
            .iter()
            .map(|program| {
                let invocations = section
                    .invocations
                    .iter()
                    .map(|spec| {
                        Ok(Invocation {
                            modes: canonical(&spec.modes),
                            argv: self.argv(section.scheme, program, &spec.modes)?,
                            layout: spec.layout(),
                        })
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()?;

                Ok(BenchmarkTask {
                    section: section_index,
                    scheme: section.scheme,
                    program: program.clone(),
                    invocations,
                })
            })
            .collect()
    }
}

fn canonical(modes: &[VerificationMode]) -> Vec<VerificationMode> {
    let mut modes = modes.to_vec();
    modes.sort();
    modes.dedup();
    modes
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Lifecycle of a task. Strictly forward, no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    TimedOut,
    LaunchFailed,
    ParseFailed,
    Reported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal task transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: TaskState,
    pub to: TaskState,
}

impl TaskState {
    pub fn is_terminal_outcome(&self) -> bool {
        matches!(
            self,
            TaskState::Completed
                | TaskState::TimedOut
                | TaskState::LaunchFailed
                | TaskState::ParseFailed
        )
    }

    pub fn can_advance_to(&self, next: TaskState) -> bool {
        match self {
            TaskState::Pending => next == TaskState::Running,
            TaskState::Running => next.is_terminal_outcome(),
            s if s.is_terminal_outcome() => next == TaskState::Reported,
            _ => false,
        }
    }

    pub fn advance(self, next: TaskState) -> Result<TaskState, IllegalTransition> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Combine outcomes of a task's invocations; the worse one wins.
    pub fn worst(self, other: TaskState) -> TaskState {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    fn severity(&self) -> u8 {
        match self {
            TaskState::LaunchFailed => 4,
            TaskState::ParseFailed => 3,
            TaskState::TimedOut => 2,
            TaskState::Completed => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InvocationSpec;

    fn verifier() -> Vec<String> {
        vec!["./seal".to_string()]
    }

    #[test]
    fn test_argv_synthesize() {
        let registry = SchemeRegistry::builtin();
        let verifier = verifier();
        let enumerator = TaskEnumerator::new(&registry, &verifier, Path::new("examples"));

        let argv = enumerator
            .argv(SchemeId::Hp, "TreiberStack", &[VerificationMode::SynthesizeTypes])
            .unwrap();
        assert_eq!(
            argv,
            vec![
                "./seal",
                "-g",
                "-t",
                "examples/HP/TreiberStack.cola",
                "examples/HP.smr"
            ]
        );
    }

    #[test]
    fn test_argv_given_types_appends_guarantees() {
        let registry = SchemeRegistry::builtin();
        let verifier = verifier();
        let enumerator = TaskEnumerator::new(&registry, &verifier, Path::new("examples"));

        let argv = enumerator
            .argv(
                SchemeId::Ebr,
                "DGLM",
                &[
                    VerificationMode::CheckLinearizability,
                    VerificationMode::CheckGivenTypes,
                    VerificationMode::CheckAnnotations,
                ],
            )
            .unwrap();
        assert_eq!(&argv[1..5], &["-g", "-c", "-a", "-l"]);
        assert_eq!(argv[5], "examples/EBR/DGLM.cola");
        assert_eq!(argv[6], "examples/EBR.smr");
        assert_eq!(argv[7], "examples/CustomTypes/EBR.txt");
    }

    #[test]
    fn test_argv_includes_scheme_flags_before_paths() {
        let mut hp = SchemeConfig::builtin(SchemeId::Hp);
        hp.extra_flags = vec!["--monolith".to_string()];
        let registry = SchemeRegistry::new([hp]);
        let verifier = vec!["nice".to_string(), "./seal".to_string()];
        let enumerator = TaskEnumerator::new(&registry, &verifier, Path::new("ex"));

        let argv = enumerator
            .argv(SchemeId::Hp, "OHearnSet", &[VerificationMode::CheckAnnotations])
            .unwrap();
        assert_eq!(
            argv,
            vec!["nice", "./seal", "-g", "-a", "--monolith", "ex/HP/OHearnSet.cola", "ex/HP.smr"]
        );
    }

    #[test]
    fn test_argv_missing_guarantee_file() {
        let mut ebr = SchemeConfig::builtin(SchemeId::Ebr);
        ebr.guarantee_file = None;
        let registry = SchemeRegistry::new([ebr]);
        let verifier = verifier();
        let enumerator = TaskEnumerator::new(&registry, &verifier, Path::new("examples"));

        let err = enumerator
            .argv(SchemeId::Ebr, "DGLM", &[VerificationMode::CheckGivenTypes])
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingGuaranteeFile(SchemeId::Ebr)));
    }

    #[test]
    fn test_argv_unregistered_scheme() {
        let registry = SchemeRegistry::new(Vec::<SchemeConfig>::new());
        let verifier = verifier();
        let enumerator = TaskEnumerator::new(&registry, &verifier, Path::new("examples"));

        let err = enumerator
            .argv(SchemeId::Hp, "DGLM", &[VerificationMode::SynthesizeTypes])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnregisteredScheme(SchemeId::Hp)));
    }

    #[test]
    fn test_enumerate_preserves_program_order() {
        let registry = SchemeRegistry::builtin();
        let verifier = verifier();
        let enumerator = TaskEnumerator::new(&registry, &verifier, Path::new("examples"));

        let section = SectionSpec {
            scheme: SchemeId::Hp,
            programs: vec!["C".to_string(), "A".to_string(), "B".to_string()],
            invocations: vec![
                InvocationSpec::new(vec![VerificationMode::SynthesizeTypes]),
                InvocationSpec::new(vec![VerificationMode::CheckLinearizability]),
            ],
            columns: Vec::new(),
        };

        let tasks = enumerator.enumerate(3, &section).unwrap();
        let names: Vec<&str> = tasks.iter().map(|t| t.display_name()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        assert!(tasks.iter().all(|t| t.section == 3 && t.invocations.len() == 2));
        assert_eq!(tasks[0].invocations[1].layout, GistLayout::verdicts(1));
    }

    #[test]
    fn test_task_state_forward_path() {
        let state = TaskState::Pending
            .advance(TaskState::Running)
            .and_then(|s| s.advance(TaskState::TimedOut))
            .and_then(|s| s.advance(TaskState::Reported))
            .unwrap();
        assert_eq!(state, TaskState::Reported);
    }

    #[test]
    fn test_task_state_rejects_backward_and_skips() {
        assert!(TaskState::Pending.advance(TaskState::Completed).is_err());
        assert!(TaskState::Completed.advance(TaskState::Running).is_err());
        assert!(TaskState::Reported.advance(TaskState::Pending).is_err());
        assert!(TaskState::Running.advance(TaskState::Reported).is_err());
    }

    #[test]
    fn test_task_state_worst() {
        assert_eq!(
            TaskState::Completed.worst(TaskState::TimedOut),
            TaskState::TimedOut
        );
        assert_eq!(
            TaskState::LaunchFailed.worst(TaskState::ParseFailed),
            TaskState::LaunchFailed
        );
    }
}
