//! Job storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use contentforge_content::ContentJob;
use contentforge_core::JobId;

/// Job store abstraction: a key-value blob store keyed by job id.
///
/// No transactional guarantees beyond last-write-wins.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Get the latest persisted snapshot of a job.
    async fn get(&self, job_id: JobId) -> Result<Option<ContentJob>, StoreError>;

    /// Write the full record (create or overwrite).
    async fn put(&self, job: &ContentJob) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: JobStore + ?Sized> JobStore for Arc<T> {
    async fn get(&self, job_id: JobId) -> Result<Option<ContentJob>, StoreError> {
        (**self).get(job_id).await
    }

    async fn put(&self, job: &ContentJob) -> Result<(), StoreError> {
        (**self).put(job).await
    }
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("job store unavailable: {0}")]
    Unavailable(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// In-memory job store for tests/dev.
///
/// Records are kept serialized so reads go through the same encode/decode
/// path a remote store would.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, String>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, job_id: JobId) -> Result<Option<ContentJob>, StoreError> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        jobs.get(&job_id)
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .transpose()
    }

    async fn put(&self, job: &ContentJob) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(job).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.jobs.write().map_err(poisoned)?.insert(job.id, raw);
        Ok(())
    }
}
