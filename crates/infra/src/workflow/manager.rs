//! Job manager: creation and status lookups.

use std::sync::Arc;

use tracing::{error, info};

use contentforge_content::{ContentJob, ContentRequest};
use contentforge_core::JobId;

use crate::jobs::JobStore;

use super::engine::WorkflowEngine;
use super::error::WorkflowError;

/// Entry point for clients: creates jobs and serves their snapshots.
#[derive(Clone)]
pub struct JobManager {
    store: Arc<dyn JobStore>,
    engine: Arc<WorkflowEngine>,
}

impl JobManager {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self {
            store: engine.store().clone(),
            engine,
        }
    }

    /// Validate the request, persist a `queued` job and schedule exactly one
    /// background run for it. Returns without waiting for the run.
    ///
    /// Nothing is written when validation fails, and nothing is scheduled
    /// when the initial write fails.
    pub async fn create_job(&self, request: ContentRequest) -> Result<ContentJob, WorkflowError> {
        request.validate()?;

        let job = ContentJob::new(request);
        if let Err(e) = self.store.put(&job).await {
            error!(error = %e, "could not persist new job");
            return Err(e.into());
        }

        info!(
            job_id = %job.id,
            content_type = %job.request.content_type,
            "job created"
        );
        self.engine.spawn(&job);
        Ok(job)
    }

    /// Latest persisted snapshot; never waits on in-flight work.
    pub async fn get_job(&self, job_id: JobId) -> Result<ContentJob, WorkflowError> {
        self.store
            .get(job_id)
            .await?
            .ok_or(WorkflowError::NotFound(job_id))
    }
}
