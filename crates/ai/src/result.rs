use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Output of one agent invocation: the new artifact text plus free-form stage
/// metadata (backend name, scores, timings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub content: String,
    pub metadata: JsonValue,
}

impl StageOutput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: JsonValue::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Cause category of a generation failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    UpstreamTimeout,
    UpstreamRejected,
    InvalidOutput,
    Unknown,
}

impl GenerationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationErrorKind::UpstreamTimeout => "upstream_timeout",
            GenerationErrorKind::UpstreamRejected => "upstream_rejected",
            GenerationErrorKind::InvalidOutput => "invalid_output",
            GenerationErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::UpstreamTimeout, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::UpstreamRejected, message)
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::InvalidOutput, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Unknown, message)
    }
}
