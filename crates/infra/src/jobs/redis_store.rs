//! Redis-backed job store (durable, shared across instances).
//!
//! - **Key**: `contentforge:job:{job_id}` (one record per job)
//! - **Value**: JSON-serialized `ContentJob`
//! - **Retention**: every write refreshes the record TTL, so a job expires
//!   a fixed time after its last mutation

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use contentforge_content::ContentJob;
use contentforge_core::JobId;

use super::store::{JobStore, StoreError};

const DEFAULT_KEY_PREFIX: &str = "contentforge:job";

#[derive(Debug, Clone)]
pub struct RedisJobStore {
    client: redis::Client,
    key_prefix: String,
    retention: Option<Duration>,
}

impl RedisJobStore {
    /// Create a store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `retention` - TTL applied on each write; `None` keeps records forever
    pub fn new(redis_url: impl AsRef<str>, retention: Option<Duration>) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            retention,
        })
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, job_id: JobId) -> String {
        format!("{}:{}", self.key_prefix, job_id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn get(&self, job_id: JobId) -> Result<Option<ContentJob>, StoreError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(self.key(job_id))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        debug!(job_id = %job_id, found = raw.is_some(), "job record read");
        raw.map(|r| serde_json::from_str(&r).map_err(|e| StoreError::Serialization(e.to_string())))
            .transpose()
    }

    async fn put(&self, job: &ContentJob) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(job).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let key = self.key(job.id);
        let mut conn = self.connection().await?;

        let result: redis::RedisResult<()> = match self.retention {
            Some(ttl) => conn.set_ex(key, payload, ttl.as_secs().max(1)).await,
            None => conn.set(key, payload).await,
        };
        result.map_err(|e| StoreError::Unavailable(e.to_string()))?;

        debug!(job_id = %job.id, status = %job.status, "job record written");
        Ok(())
    }
}
