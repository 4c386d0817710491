//! Job orchestration: pipelines, the workflow engine, the job manager and the
//! quality control gate.
//!
//! ```text
//! client ── JobManager::create_job ──► JobStore (queued)
//!                 │
//!                 └─ spawn ─► WorkflowEngine::run ──► JobStore (per stage)
//! client ── JobManager::get_job ─────► JobStore
//! client ── QualityGate::{approve,reject,request_revision} ──► JobStore
//!                 │
//!                 └─ (revision) spawn ─► WorkflowEngine::run
//! ```

pub mod engine;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod quality;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::WorkflowEngine;
pub use error::WorkflowError;
pub use manager::JobManager;
pub use pipeline::{Pipeline, PipelineConfig, PipelineRegistry};
pub use quality::QualityGate;
