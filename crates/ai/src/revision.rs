use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::agent::{Agent, AgentInput, SharedContext};
use crate::backend::{GenerationBackend, GenerationPrompt, GenerationTask};
use crate::result::{GenerationError, StageOutput};

const INSTRUCTIONS: &str = "You are a content writer revising your own piece. Apply the \
reviewer feedback and return the full revised piece.";

/// Entry stage of a revision cycle: rewrites the current artifact against
/// reviewer feedback.
pub struct RevisionAgent {
    backend: Arc<dyn GenerationBackend>,
}

impl RevisionAgent {
    pub const STAGE: &'static str = "revise";

    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Agent for RevisionAgent {
    fn stage(&self) -> &str {
        Self::STAGE
    }

    async fn run(
        &self,
        input: &AgentInput,
        ctx: &SharedContext,
    ) -> Result<StageOutput, GenerationError> {
        let prior = input
            .prior
            .as_ref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| GenerationError::invalid_output("nothing to revise"))?;
        let feedback = input
            .feedback
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| GenerationError::invalid_output("revision requires feedback"))?;

        let prompt = GenerationPrompt::new(GenerationTask::Revise, INSTRUCTIONS, prior.content.clone())
            .with_feedback(feedback);
        let content = self.backend.generate(&prompt).await?;

        if content.trim().is_empty() {
            return Err(GenerationError::invalid_output("revision returned empty text"));
        }
        if content.trim() == prior.content.trim() {
            return Err(GenerationError::invalid_output("revision left the artifact unchanged"));
        }

        Ok(StageOutput::new(content).with_metadata(json!({
            "backend": self.backend.name(),
            "attempt": ctx.attempt,
            "revision": ctx.revision,
            "feedback": feedback,
            "revisedFromVersion": prior.version,
        })))
    }
}
