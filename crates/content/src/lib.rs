//! Content-generation domain module.
//!
//! This crate contains the job record and its workflow state machine,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage, no model calls).

pub mod job;
pub mod request;
pub mod status;

pub use job::{Artifact, ContentJob, RecordKind, StageRecord};
pub use request::{ContentLength, ContentRequest};
pub use status::{JobStatus, QualityAction, TransitionError, Trigger};
