use thiserror::Error;

use contentforge_content::TransitionError;
use contentforge_core::{DomainError, JobId};

use crate::jobs::StoreError;

/// Caller-facing error of the orchestration layer.
///
/// Generation failures are deliberately absent: they end up recorded on the
/// job (`status = failed`) and are observed by polling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<DomainError> for WorkflowError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
        }
    }
}
