//! SMR scheme registry.
//!
//! Maps each reclamation scheme to the artifacts the verifier needs. The
//! registry is built once from the plan and handed to the enumerator by
//! reference; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Known safe-memory-reclamation schemes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SchemeId {
    /// Hazard pointers
    Hp,

    /// Epoch-based reclamation
    Ebr,

    /// Hazard pointers checked against the single-automaton spec
    HpMonolith,
}

impl SchemeId {
    pub const ALL: [SchemeId; 3] = [SchemeId::Hp, SchemeId::Ebr, SchemeId::HpMonolith];

    /// Identifier as written in plan files.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeId::Hp => "hp",
            SchemeId::Ebr => "ebr",
            SchemeId::HpMonolith => "hp-monolith",
        }
    }
}

impl fmt::Display for SchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemeId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemeId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownScheme(s.to_string()))
    }
}

/// On-disk artifacts for one scheme. Paths are relative to the examples root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemeConfig {
    pub id: SchemeId,

    /// Name printed in section headers.
    pub display_name: String,

    /// Automaton describing the reclamation discipline.
    pub spec_file: PathBuf,

    /// Hand-written type guarantees, used when checking given types.
    #[serde(default)]
    pub guarantee_file: Option<PathBuf>,

    /// Folder holding the `.cola` benchmark programs.
    pub program_folder: PathBuf,

    /// Scheme-specific verifier flags.
    #[serde(default)]
    pub extra_flags: Vec<String>,
}

impl SchemeConfig {
    /// The artifacts shipped with the verifier's example tree.
    pub fn builtin(id: SchemeId) -> Self {
        match id {
            SchemeId::Hp => Self {
                id,
                display_name: "HP".to_string(),
                spec_file: PathBuf::from("HP.smr"),
                guarantee_file: Some(PathBuf::from("CustomTypes/HP.txt")),
                program_folder: PathBuf::from("HP"),
                extra_flags: Vec::new(),
            },
            SchemeId::Ebr => Self {
                id,
                display_name: "EBR".to_string(),
                spec_file: PathBuf::from("EBR.smr"),
                guarantee_file: Some(PathBuf::from("CustomTypes/EBR.txt")),
                program_folder: PathBuf::from("EBR"),
                extra_flags: Vec::new(),
            },
            SchemeId::HpMonolith => Self {
                id,
                display_name: "HP (monolith)".to_string(),
                spec_file: PathBuf::from("HPmonolith.smr"),
                guarantee_file: Some(PathBuf::from("CustomTypes/HP.txt")),
                program_folder: PathBuf::from("HP"),
                extra_flags: Vec::new(),
            },
        }
    }
}

/// Immutable lookup table from scheme id to its configuration.
#[derive(Debug, Clone)]
pub struct SchemeRegistry {
    schemes: HashMap<SchemeId, SchemeConfig>,
}

impl SchemeRegistry {
    /// Build a registry. A later entry for the same id replaces an earlier one.
    pub fn new(schemes: impl IntoIterator<Item = SchemeConfig>) -> Self {
        Self {
            schemes: schemes.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    /// Registry with every built-in scheme.
    pub fn builtin() -> Self {
        Self::new(SchemeId::ALL.into_iter().map(SchemeConfig::builtin))
    }

    pub fn get(&self, id: SchemeId) -> Result<&SchemeConfig, ConfigError> {
        self.schemes
            .get(&id)
            .ok_or(ConfigError::UnregisteredScheme(id))
    }

    pub fn contains(&self, id: SchemeId) -> bool {
        self.schemes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}
