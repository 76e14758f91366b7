//! Benchmark plan: verifier command, timeouts, schemes and report sections.
//!
//! The built-in plan reproduces the HP and EBR comparison tables. A TOML file
//! with the same shape can replace any part of it; omitted fields keep their
//! defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::gist::{GistLayout, SlotKind};
use crate::registry::{SchemeConfig, SchemeId, SchemeRegistry};
use crate::task::VerificationMode;

/// Programs shipped for every scheme.
pub const BENCHMARK_PROGRAMS: [&str; 8] = [
    "TreiberStack",
    "TreiberOptimizedStack",
    "MichaelScottQueue",
    "DGLM",
    "VechevDCasSet",
    "VechevCasSet",
    "OHearnSet",
    "MichaelSet",
];

/// Full harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Verifier command words; the first is the executable.
    pub verifier: Vec<String>,

    /// Root of the verifier's example tree.
    pub examples_root: PathBuf,

    /// Wall-clock limit per invocation, in seconds.
    pub timeout_secs: u64,

    /// Time a process group gets between SIGTERM and SIGKILL.
    pub kill_grace_ms: u64,

    /// Width of the program-name column.
    pub name_width: usize,

    pub schemes: Vec<SchemeConfig>,

    pub sections: Vec<SectionSpec>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            verifier: vec!["./seal".to_string()],
            examples_root: PathBuf::from("examples"),
            timeout_secs: 600,
            kill_grace_ms: 500,
            name_width: 32,
            schemes: SchemeId::ALL.into_iter().map(SchemeConfig::builtin).collect(),
            sections: vec![
                SectionSpec::types_comparison(SchemeId::Hp),
                SectionSpec::types_comparison(SchemeId::Ebr),
            ],
        }
    }
}

impl HarnessConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn registry(&self) -> SchemeRegistry {
        SchemeRegistry::new(self.schemes.iter().cloned())
    }

    /// Reject plans that cannot run before any process is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verifier.is_empty() || self.verifier[0].trim().is_empty() {
            return Err(ConfigError::EmptyVerifierCommand);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let registry = self.registry();
        for (index, section) in self.sections.iter().enumerate() {
            registry.get(section.scheme)?;
            section
                .check()
                .map_err(|reason| ConfigError::InvalidSection {
                    section: index,
                    scheme: section.scheme,
                    reason,
                })?;
        }
        Ok(())
    }
}

/// One report section: a scheme, its programs, what to run and what to show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionSpec {
    pub scheme: SchemeId,
    pub programs: Vec<String>,
    pub invocations: Vec<InvocationSpec>,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

impl SectionSpec {
    /// Synthesized vs. hand-crafted types, plus annotations and
    /// linearizability from the hand-crafted run.
    pub fn types_comparison(scheme: SchemeId) -> Self {
        Self {
            scheme,
            programs: BENCHMARK_PROGRAMS.iter().map(|p| p.to_string()).collect(),
            invocations: vec![
                InvocationSpec::new(vec![VerificationMode::SynthesizeTypes]),
                InvocationSpec::new(vec![
                    VerificationMode::CheckGivenTypes,
                    VerificationMode::CheckAnnotations,
                    VerificationMode::CheckLinearizability,
                ]),
            ],
            columns: vec![
                ColumnSpec::with_count("synthesized Types", 0, 1, 0),
                ColumnSpec::with_count("hand-crafted Types", 1, 1, 0),
                ColumnSpec::new("Annotations", 1, 2),
                ColumnSpec::new("Linearizability", 1, 3),
            ],
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.programs.is_empty() {
            return Err("no programs".to_string());
        }
        if self.invocations.is_empty() {
            return Err("no invocations".to_string());
        }
        for (i, inv) in self.invocations.iter().enumerate() {
            if inv.modes.is_empty() {
                return Err(format!("invocation {i} has no modes"));
            }
        }
        for column in &self.columns {
            let layout = self
                .invocations
                .get(column.invocation)
                .map(InvocationSpec::layout)
                .ok_or_else(|| {
                    format!(
                        "column {:?} refers to missing invocation {}",
                        column.header, column.invocation
                    )
                })?;
            if layout.get(column.slot) != Some(SlotKind::Verdict) {
                return Err(format!(
                    "column {:?}: slot {} is not a verdict",
                    column.header, column.slot
                ));
            }
            if let Some(count_slot) = column.count_slot {
                if layout.get(count_slot) != Some(SlotKind::Count) {
                    return Err(format!(
                        "column {:?}: slot {} is not a guarantee count",
                        column.header, count_slot
                    ));
                }
            }
        }
        Ok(())
    }
}

/// One verifier call per program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationSpec {
    pub modes: Vec<VerificationMode>,

    /// Explicit gist layout, for verifier builds that deviate from the
    /// layout implied by the modes.
    #[serde(default)]
    pub slots: Option<GistLayout>,
}

impl InvocationSpec {
    pub fn new(modes: Vec<VerificationMode>) -> Self {
        Self { modes, slots: None }
    }

    pub fn layout(&self) -> GistLayout {
        self.slots
            .clone()
            .unwrap_or_else(|| GistLayout::for_modes(&self.modes))
    }
}

/// A report column reading one verdict slot of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub header: String,
    pub invocation: usize,
    pub slot: usize,
    #[serde(default)]
    pub count_slot: Option<usize>,
}

impl ColumnSpec {
    pub fn new(header: impl Into<String>, invocation: usize, slot: usize) -> Self {
        Self {
            header: header.into(),
            invocation,
            slot,
            count_slot: None,
        }
    }

    pub fn with_count(
        header: impl Into<String>,
        invocation: usize,
        slot: usize,
        count_slot: usize,
    ) -> Self {
        Self {
            count_slot: Some(count_slot),
            ..Self::new(header, invocation, slot)
        }
    }
}
