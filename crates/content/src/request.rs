use serde::{Deserialize, Serialize};

use contentforge_core::{DomainError, DomainResult};

/// Requested size of the produced piece.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentLength {
    Short,
    Medium,
    Long,
}

impl ContentLength {
    /// Rough word target handed to generation backends.
    pub fn target_words(&self) -> u32 {
        match self {
            ContentLength::Short => 150,
            ContentLength::Medium => 600,
            ContentLength::Long => 1500,
        }
    }
}

/// Content-generation parameters submitted by a client.
///
/// Immutable once a job has been created from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub content_type: String,
    pub topic: String,
    pub audience: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<ContentLength>,
}

impl ContentRequest {
    pub fn new(
        content_type: impl Into<String>,
        topic: impl Into<String>,
        audience: impl Into<String>,
        goals: Vec<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            topic: topic.into(),
            audience: audience.into(),
            goals,
            tone: None,
            length: None,
        }
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    pub fn with_length(mut self, length: ContentLength) -> Self {
        self.length = Some(length);
        self
    }

    /// Minimal shape check: required fields present and non-blank.
    pub fn validate(&self) -> DomainResult<()> {
        require("contentType", &self.content_type)?;
        require("topic", &self.topic)?;
        require("audience", &self.audience)?;

        if self.goals.is_empty() {
            return Err(DomainError::validation("goals must contain at least one entry"));
        }
        if self.goals.iter().any(|g| g.trim().is_empty()) {
            return Err(DomainError::validation("goals cannot contain blank entries"));
        }
        if let Some(tone) = &self.tone {
            require("tone", tone)?;
        }
        Ok(())
    }

    /// Content type key used to select a pipeline (trimmed, lowercase).
    pub fn pipeline_key(&self) -> String {
        self.content_type.trim().to_lowercase()
    }
}

fn require(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
