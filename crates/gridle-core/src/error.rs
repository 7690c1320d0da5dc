//! Error types for gridle-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigField;

/// Result type for gridle-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Any error produced by gridle-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be built or merged.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The simulation could not be started.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// The simulation could not be killed.
    #[error(transparent)]
    Kill(#[from] KillError),

    /// A progress line could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors raised while building or merging a configuration.
///
/// All of these are reported before any process is started, and none of
/// them leaves a partially merged configuration behind.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A raw override could not be parsed for its field.
    #[error("invalid value {value:?} for {field}")]
    Parse { field: ConfigField, value: String },

    /// A field required by the operating mode has no value.
    #[error("missing required field {0}")]
    MissingRequiredField(ConfigField),

    /// A Constant color map entry has no parseable value.
    #[error("color map entry {0} needs a numeric value")]
    InvalidColorValue(usize),

    /// The raw color map skips an index.
    #[error("color map entry {0} is missing")]
    IndexGap(usize),

    /// A color map entry declares a type outside Constant/HorizontalLerp/VerticalLerp.
    #[error("color map entry {index} has unknown type {kind:?}")]
    UnknownEntryType { index: usize, kind: String },

    /// A color map entry refers to an index with no prior color.
    #[error("color map entry {0} has no known color")]
    UnknownIndex(usize),

    /// Preprocess output did not contain a framed JSON report.
    #[error("malformed preprocess report: {0}")]
    MalformedReport(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading a configuration document.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised when starting a simulation.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Another simulation currently owns the process slot.
    #[error("a simulation is already running")]
    AlreadyRunning,

    /// The simulation executable does not exist or could not be located.
    #[error("simulation executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    /// Spawning failed for another reason.
    #[error("failed to spawn {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised when killing a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KillError {
    /// No simulation is running.
    #[error("no simulation is running")]
    NotRunning,
}

/// A single progress line that was not a valid record.
///
/// Decoding continues with the next line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed progress line {line}: {reason}")]
pub struct DecodeError {
    /// 1-based line number within the stream.
    pub line: usize,
    /// The offending line, lossily decoded.
    pub content: String,
    /// Why the line was rejected.
    pub reason: String,
}
