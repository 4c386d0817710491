//! Ordered agent pipelines per content type.

use std::collections::HashMap;
use std::sync::Arc;

use contentforge_ai::{Agent, DraftingAgent, GenerationBackend, ReviewAgent, RevisionAgent};
use contentforge_content::ContentRequest;

use crate::jobs::RetryPolicy;

/// Execution settings shared by all stages of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    /// Progress a revision cycle restarts from (clamped below 100).
    pub revision_progress_floor: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            revision_progress_floor: 50,
        }
    }
}

/// The agents run for one content type.
///
/// `stages` run for a fresh job; `revision_stages` run when a reviewer
/// requests changes, starting from the current artifact.
#[derive(Clone)]
pub struct Pipeline {
    name: String,
    stages: Vec<Arc<dyn Agent>>,
    revision_stages: Vec<Arc<dyn Agent>>,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .field("revision_stages", &self.revision_stage_names())
            .field("config", &self.config)
            .finish()
    }
}

impl Pipeline {
    pub fn new(name: impl Into<String>, stages: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.into(),
            stages,
            revision_stages: Vec::new(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_revision_stages(mut self, stages: Vec<Arc<dyn Agent>>) -> Self {
        self.revision_stages = stages;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// draft → review, revised through revise → review.
    pub fn editorial(backend: Arc<dyn GenerationBackend>, config: PipelineConfig) -> Self {
        let draft: Arc<dyn Agent> = Arc::new(DraftingAgent::new(backend.clone()));
        let review: Arc<dyn Agent> = Arc::new(ReviewAgent::new(backend.clone()));
        let revise: Arc<dyn Agent> = Arc::new(RevisionAgent::new(backend));

        Self::new("editorial", vec![draft, review.clone()])
            .with_revision_stages(vec![revise, review])
            .with_config(config)
    }

    /// Short-form content: a single drafting pass, revised in one step.
    pub fn short_form(backend: Arc<dyn GenerationBackend>, config: PipelineConfig) -> Self {
        let draft: Arc<dyn Agent> = Arc::new(DraftingAgent::new(backend.clone()));
        let revise: Arc<dyn Agent> = Arc::new(RevisionAgent::new(backend));

        Self::new("short_form", vec![draft])
            .with_revision_stages(vec![revise])
            .with_config(config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Arc<dyn Agent>] {
        &self.stages
    }

    pub fn revision_stages(&self) -> &[Arc<dyn Agent>] {
        &self.revision_stages
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|a| a.stage()).collect()
    }

    pub fn revision_stage_names(&self) -> Vec<&str> {
        self.revision_stages.iter().map(|a| a.stage()).collect()
    }
}

/// Maps content types to pipelines, falling back to a default.
#[derive(Debug, Clone)]
pub struct PipelineRegistry {
    default: Arc<Pipeline>,
    by_type: HashMap<String, Arc<Pipeline>>,
}

impl PipelineRegistry {
    pub fn new(default: Pipeline) -> Self {
        Self {
            default: Arc::new(default),
            by_type: HashMap::new(),
        }
    }

    /// Editorial pipeline for everything except short social posts.
    pub fn standard(backend: Arc<dyn GenerationBackend>, config: PipelineConfig) -> Self {
        Self::new(Pipeline::editorial(backend.clone(), config.clone()))
            .register("social_post", Pipeline::short_form(backend, config))
    }

    /// Register a pipeline for a content type (matched case-insensitively).
    pub fn register(mut self, content_type: &str, pipeline: Pipeline) -> Self {
        self.by_type
            .insert(content_type.trim().to_lowercase(), Arc::new(pipeline));
        self
    }

    pub fn default_pipeline(&self) -> &Arc<Pipeline> {
        &self.default
    }

    pub fn resolve(&self, request: &ContentRequest) -> Arc<Pipeline> {
        self.by_type
            .get(&request.pipeline_key())
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
