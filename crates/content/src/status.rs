//! Job workflow state machine.
//!
//! ```text
//!            Start              FinishPipeline
//!   queued ────────► running ─────────────────► awaiting_review ──Approve──► approved
//!     │               │  ▲ │                        │    │
//!     │          Fail │  │ └─BeginStage,            │    └──Reject───► rejected
//!     │               │  │   CompleteStage          │
//!     │               ▼  │                          │
//!     └──Fail────► failed  └──Start── revising ◄────┘ RequestRevision
//! ```
//!
//! Every mutation of a job goes through [`JobStatus::apply`]; any pair not in
//! the table is an [`TransitionError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted job status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    AwaitingReview,
    Revising,
    Approved,
    Rejected,
    Failed,
}

/// Event that drives a status change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Engine picked the job up (fresh run or revision cycle).
    Start,
    /// A stage is about to run.
    BeginStage,
    /// An intermediate stage finished and was persisted.
    CompleteStage,
    /// The last stage of the run finished.
    FinishPipeline,
    /// A stage exhausted its retries or progress could not be persisted.
    Fail,
    Approve,
    Reject,
    RequestRevision,
}

/// Reviewer decision applied at the quality gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityAction {
    Approve,
    Reject,
    RequestRevision,
}

impl QualityAction {
    pub fn trigger(&self) -> Trigger {
        match self {
            QualityAction::Approve => Trigger::Approve,
            QualityAction::Reject => Trigger::Reject,
            QualityAction::RequestRevision => Trigger::RequestRevision,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityAction::Approve => "approve",
            QualityAction::Reject => "reject",
            QualityAction::RequestRevision => "request_revision",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {trigger:?} to a job in status {from}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub trigger: Trigger,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::AwaitingReview,
        JobStatus::Revising,
        JobStatus::Approved,
        JobStatus::Rejected,
        JobStatus::Failed,
    ];

    /// Transition table.
    pub fn apply(self, trigger: Trigger) -> Result<JobStatus, TransitionError> {
        use JobStatus::*;
        use Trigger::*;

        let next = match (self, trigger) {
            (Queued, Start) | (Revising, Start) => Running,
            (Running, BeginStage) | (Running, CompleteStage) => Running,
            (Running, FinishPipeline) => AwaitingReview,
            (Queued, Fail) | (Running, Fail) | (Revising, Fail) => Failed,
            (AwaitingReview, Approve) => Approved,
            (AwaitingReview, Reject) => Rejected,
            (AwaitingReview, RequestRevision) => Revising,
            (from, trigger) => return Err(TransitionError { from, trigger }),
        };
        Ok(next)
    }

    /// Triggers accepted from this status.
    pub fn valid_triggers(&self) -> &'static [Trigger] {
        use Trigger::*;
        match self {
            JobStatus::Queued => &[Start, Fail],
            JobStatus::Running => &[BeginStage, CompleteStage, FinishPipeline, Fail],
            JobStatus::AwaitingReview => &[Approve, Reject, RequestRevision],
            JobStatus::Revising => &[Start, Fail],
            JobStatus::Approved | JobStatus::Rejected | JobStatus::Failed => &[],
        }
    }

    /// No further transitions are accepted.
    pub fn is_terminal(&self) -> bool {
        self.valid_triggers().is_empty()
    }

    /// The engine owns the record in these states.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobStatus::Queued | JobStatus::Running | JobStatus::Revising
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::AwaitingReview => "awaiting_review",
            JobStatus::Revising => "revising",
            JobStatus::Approved => "approved",
            JobStatus::Rejected => "rejected",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
