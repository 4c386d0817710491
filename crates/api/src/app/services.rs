//! Service wiring: store and backend selection from config.

use std::sync::Arc;

use anyhow::Context;

use contentforge_ai::{GenerationBackend, OpenAiCompatibleBackend, TemplateBackend};
use contentforge_infra::{
    AppConfig, BackendConfig, InMemoryJobStore, JobManager, JobStore, PipelineRegistry,
    QualityGate, WorkflowEngine,
};

/// Shared state handed to every handler.
pub struct AppServices {
    pub manager: JobManager,
    pub gate: QualityGate,
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store = build_store(config)?;
    let backend = build_backend(&config.backend)?;
    tracing::info!(backend = backend.name(), "generation backend ready");

    let pipelines = PipelineRegistry::standard(backend, config.pipeline_config());
    let engine = Arc::new(WorkflowEngine::new(store, pipelines));

    Ok(AppServices {
        manager: JobManager::new(engine.clone()),
        gate: QualityGate::new(engine),
    })
}

fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn JobStore>> {
    if config.use_persistent_stores {
        #[cfg(feature = "redis")]
        {
            let store = contentforge_infra::jobs::RedisJobStore::new(
                &config.redis_url,
                config.job_retention,
            )
            .context("failed to open redis job store")?;
            tracing::info!(retention = ?config.job_retention, "using redis job store");
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but redis feature not enabled, falling back to in-memory"
            );
        }
    }

    Ok(InMemoryJobStore::arc())
}

fn build_backend(config: &BackendConfig) -> anyhow::Result<Arc<dyn GenerationBackend>> {
    Ok(match config {
        BackendConfig::Template => Arc::new(TemplateBackend::new()),
        BackendConfig::OpenAi(openai) => Arc::new(
            OpenAiCompatibleBackend::new(openai.clone())
                .context("failed to build generation backend")?,
        ),
    })
}
