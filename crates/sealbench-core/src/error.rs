//! Error taxonomy for the benchmark harness.
//!
//! Only [`ConfigError`] and output failures abort a run. Launch and gist
//! failures stay local to the invocation that produced them.

use std::path::PathBuf;

use crate::registry::SchemeId;

/// The harness itself is misconfigured. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown scheme identifier: {0}")]
    UnknownScheme(String),

    #[error("scheme {0} is not registered")]
    UnregisteredScheme(SchemeId),

    #[error("scheme {0} has no hand-crafted type guarantee file")]
    MissingGuaranteeFile(SchemeId),

    #[error("verifier command must not be empty")]
    EmptyVerifierCommand,

    #[error("timeout must be at least one second")]
    ZeroTimeout,

    #[error("section {section} ({scheme}) is invalid: {reason}")]
    InvalidSection {
        section: usize,
        scheme: SchemeId,
        reason: String,
    },

    #[error("failed to read plan file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed plan: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures of the bounded process runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed while waiting for the verifier: {0}")]
    Wait(#[source] std::io::Error),

    #[error("run interrupted")]
    Interrupted,
}

/// The verifier's output does not follow the gist grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GistError {
    #[error("verifier produced no output")]
    EmptyOutput,

    #[error("status line has no '=' delimiter: {line:?}")]
    MissingDelimiter { line: String },

    #[error("expected {expected} categories, found {found}")]
    CategoryCount { expected: usize, found: usize },

    #[error("category {index} is not <verdict>:<duration>: {cell:?}")]
    MalformedCategory { index: usize, cell: String },

    #[error("slot {index} should hold a guarantee count: {cell:?}")]
    InvalidCount { index: usize, cell: String },
}

/// Fatal driver errors.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
