use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use contentforge_content::ContentRequest;

use crate::agent::{Agent, AgentInput, SharedContext};
use crate::backend::{GenerationBackend, GenerationPrompt, GenerationTask};
use crate::result::{GenerationError, StageOutput};

const INSTRUCTIONS: &str = "You are a content writer. Expand the brief into a complete piece. \
Keep the heading structure and address every goal.";

/// First stage of every pipeline: turns the request into a first draft.
pub struct DraftingAgent {
    backend: Arc<dyn GenerationBackend>,
}

impl DraftingAgent {
    pub const STAGE: &'static str = "draft";

    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }
}

/// Markdown brief handed to the backend.
pub(crate) fn brief(request: &ContentRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", request.topic.trim());
    let _ = writeln!(out);

    let _ = write!(
        out,
        "_A {} for {}",
        request.content_type.trim(),
        request.audience.trim()
    );
    if let Some(tone) = &request.tone {
        let _ = write!(out, ", written in a {} tone", tone.trim());
    }
    if let Some(length) = request.length {
        let _ = write!(out, ", about {} words", length.target_words());
    }
    let _ = writeln!(out, "._");

    for goal in &request.goals {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {}", goal.trim());
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "How {} helps {} with this.",
            request.topic.trim(),
            request.audience.trim()
        );
    }
    out
}

#[async_trait]
impl Agent for DraftingAgent {
    fn stage(&self) -> &str {
        Self::STAGE
    }

    async fn run(
        &self,
        input: &AgentInput,
        ctx: &SharedContext,
    ) -> Result<StageOutput, GenerationError> {
        let prompt = GenerationPrompt::new(GenerationTask::Draft, INSTRUCTIONS, brief(&input.request));
        let content = self.backend.generate(&prompt).await?;
        if content.trim().is_empty() {
            return Err(GenerationError::invalid_output("draft is empty"));
        }

        let words = content.split_whitespace().count();
        Ok(StageOutput::new(content).with_metadata(json!({
            "backend": self.backend.name(),
            "attempt": ctx.attempt,
            "words": words,
        })))
    }
}
