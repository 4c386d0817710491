//! Infrastructure layer: job persistence, pipeline execution, configuration.

pub mod config;
pub mod jobs;
pub mod workflow;

pub use config::{AppConfig, BackendConfig, ConfigError};
pub use jobs::{InMemoryJobStore, JobStore, RetryPolicy, StoreError};
pub use workflow::{
    JobManager, Pipeline, PipelineConfig, PipelineRegistry, QualityGate, WorkflowEngine,
    WorkflowError,
};
