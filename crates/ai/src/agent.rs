use async_trait::async_trait;

use contentforge_content::{Artifact, ContentRequest};
use contentforge_core::JobId;

use crate::result::{GenerationError, StageOutput};

/// What a stage works on: the original request, plus the previous stage's
/// artifact and reviewer feedback when there are any.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentInput {
    pub request: ContentRequest,
    pub prior: Option<Artifact>,
    pub feedback: Option<String>,
}

impl AgentInput {
    pub fn new(request: ContentRequest) -> Self {
        Self {
            request,
            prior: None,
            feedback: None,
        }
    }

    pub fn with_prior(mut self, prior: Option<Artifact>) -> Self {
        self.prior = prior;
        self
    }

    pub fn with_feedback(mut self, feedback: Option<String>) -> Self {
        self.feedback = feedback;
        self
    }
}

/// Read-only run context shared by all stages of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedContext {
    pub job_id: JobId,
    /// 1-indexed attempt of the current stage.
    pub attempt: u32,
    /// Revision cycle (0 = initial run).
    pub revision: u32,
}

/// A stateless unit performing one pipeline stage.
///
/// Implementations must not keep per-job state between calls: revision
/// cycles re-enter mid-pipeline using only what the job record persisted.
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    /// Stage name recorded in job history.
    fn stage(&self) -> &str;

    async fn run(
        &self,
        input: &AgentInput,
        ctx: &SharedContext,
    ) -> Result<StageOutput, GenerationError>;
}
