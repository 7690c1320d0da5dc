//! Progress records emitted by the solver.

use serde::{Deserialize, Serialize};

/// One decoded line of solver output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressRecord {
    /// Free-form log line.
    Message { message: String },

    /// A graph was written to `file`.
    Graph { file: String, message: String },

    /// A timed solver function finished.
    Timing {
        function: String,
        #[serde(rename = "duration")]
        duration_ms: u64,
    },
}

impl ProgressRecord {
    /// A plain message record.
    pub fn text(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// The human-readable message, if the record carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Message { message } | Self::Graph { message, .. } => Some(message),
            Self::Timing { .. } => None,
        }
    }
}

/// Loose shape of a line on the wire.
///
/// Lines without a `type` are plain messages, as are lines with a type this
/// version does not know about.
#[derive(Deserialize)]
pub(super) struct WireRecord {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    function: Option<String>,
    #[serde(default)]
    duration: Option<u64>,
}

impl TryFrom<WireRecord> for ProgressRecord {
    type Error = String;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        match wire.kind.as_deref() {
            Some("graph") => Ok(Self::Graph {
                file: wire.file.ok_or("graph record without \"file\"")?,
                message: wire.message.unwrap_or_default(),
            }),
            Some("timing") => Ok(Self::Timing {
                function: wire.function.ok_or("timing record without \"function\"")?,
                duration_ms: wire.duration.ok_or("timing record without \"duration\"")?,
            }),
            _ => Ok(Self::Message {
                message: wire.message.ok_or("record without \"message\"")?,
            }),
        }
    }
}
