//! Job persistence and stage retry policy.
//!
//! ## Design
//!
//! - The job store is the single source of truth: one record per job,
//!   keyed by job id, value is the serialized `ContentJob`
//! - Last-write-wins is sufficient because every job has one writer at a time
//!   (the engine while running, the quality gate while awaiting review)
//! - Retry policy with fixed/linear/exponential backoff per pipeline
//!
//! ## Components
//!
//! - `JobStore`: async get/put abstraction
//! - `InMemoryJobStore`: serialized blobs in a map (dev/tests)
//! - `RedisJobStore`: durable store with retention TTL (feature `redis`)
//! - `RetryPolicy`: bounded retries for transient generation failures

#[cfg(feature = "redis")]
pub mod redis_store;
pub mod retry;
pub mod store;

#[cfg(feature = "redis")]
pub use redis_store::RedisJobStore;
pub use retry::{BackoffStrategy, RetryPolicy};
pub use store::{InMemoryJobStore, JobStore, StoreError};
