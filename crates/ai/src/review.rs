use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use contentforge_content::ContentRequest;

use crate::agent::{Agent, AgentInput, SharedContext};
use crate::backend::{GenerationBackend, GenerationPrompt, GenerationTask};
use crate::result::{GenerationError, StageOutput};

const INSTRUCTIONS: &str = "You are an editor. Return the piece with grammar, clarity and \
structure fixed. Do not add commentary.";

/// Quality pass over the previous stage's artifact.
///
/// The polished text becomes the new artifact; automated checks are attached
/// as stage metadata for the human reviewer, they never fail the stage.
pub struct ReviewAgent {
    backend: Arc<dyn GenerationBackend>,
}

impl ReviewAgent {
    pub const STAGE: &'static str = "review";

    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }
}

fn quality_checks(request: &ContentRequest, content: &str) -> serde_json::Value {
    let lower = content.to_lowercase();
    let mentions_topic = lower.contains(&request.topic.trim().to_lowercase());
    let missing_goals: Vec<&str> = request
        .goals
        .iter()
        .map(|g| g.trim())
        .filter(|g| !lower.contains(&g.to_lowercase()))
        .collect();

    let mut issues = Vec::new();
    if !mentions_topic {
        issues.push("topic is never mentioned".to_string());
    }
    for goal in &missing_goals {
        issues.push(format!("goal not addressed: {goal}"));
    }

    let checks = 1 + request.goals.len();
    let passed = checks - issues.len();
    json!({
        "score": passed as f64 / checks as f64,
        "words": content.split_whitespace().count(),
        "issues": issues,
    })
}

#[async_trait]
impl Agent for ReviewAgent {
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
            .ok_or_else(|| GenerationError::invalid_output("nothing to review"))?;

        let prompt = GenerationPrompt::new(GenerationTask::Review, INSTRUCTIONS, prior.content.clone());
        let content = self.backend.generate(&prompt).await?;
        if content.trim().is_empty() {
            return Err(GenerationError::invalid_output("review returned empty text"));
        }

        let mut metadata = quality_checks(&input.request, &content);
        metadata["backend"] = json!(self.backend.name());
        metadata["attempt"] = json!(ctx.attempt);
        Ok(StageOutput::new(content).with_metadata(metadata))
    }
}
