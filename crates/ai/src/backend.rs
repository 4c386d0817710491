//! Generation backends: the only way agents reach a language model.

use async_trait::async_trait;

use crate::result::GenerationError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GenerationTask {
    Draft,
    Review,
    Revise,
}

/// A single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPrompt {
    pub task: GenerationTask,
    /// Role/system instructions.
    pub instructions: String,
    /// Text the model works on (brief, draft or prior artifact).
    pub material: String,
    pub feedback: Option<String>,
}

impl GenerationPrompt {
    pub fn new(
        task: GenerationTask,
        instructions: impl Into<String>,
        material: impl Into<String>,
    ) -> Self {
        Self {
            task,
            instructions: instructions.into(),
            material: material.into(),
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, GenerationError>;
}

/// Deterministic offline backend.
///
/// Drafts return the brief as written, reviews normalise whitespace, and
/// revisions append the reviewer's notes. Useful for local runs and tests
/// where no hosted model is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateBackend;

impl TemplateBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationBackend for TemplateBackend {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, GenerationError> {
        let material = prompt.material.trim();
        if material.is_empty() {
            return Err(GenerationError::invalid_output("empty material"));
        }

        let out = match prompt.task {
            GenerationTask::Draft => material.to_string(),
            GenerationTask::Review => normalise(material),
            GenerationTask::Revise => match prompt.feedback.as_deref().map(str::trim) {
                Some(feedback) if !feedback.is_empty() => {
                    format!("{material}\n\n## Revision notes\n\n{feedback}")
                }
                _ => material.to_string(),
            },
        };
        Ok(out)
    }
}

/// Trim trailing spaces and collapse runs of blank lines.
fn normalise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}
