//! The persisted job record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use contentforge_core::JobId;

use crate::request::ContentRequest;
use crate::status::{JobStatus, QualityAction, TransitionError, Trigger};

/// Latest produced content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub content: String,
    /// Stage that produced this version.
    pub stage: String,
    /// 1 for the first artifact of a job, +1 for each later stage.
    pub version: u32,
}

impl Artifact {
    pub fn new(content: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            stage: stage.into(),
            version: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Stage,
    Approved,
    Rejected,
    RevisionRequested,
}

impl From<QualityAction> for RecordKind {
    fn from(action: QualityAction) -> Self {
        match action {
            QualityAction::Approve => RecordKind::Approved,
            QualityAction::Reject => RecordKind::Rejected,
            QualityAction::RequestRevision => RecordKind::RevisionRequested,
        }
    }
}

/// One append-only history entry: a completed stage or a reviewer decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage: String,
    pub kind: RecordKind,
    /// Stage output, or the reviewer's feedback for decisions.
    pub output: String,
    #[serde(default)]
    pub metadata: JsonValue,
    /// Attempts the stage needed (0 for decisions).
    pub attempts: u32,
    /// Revision cycle the entry belongs to (0 = initial run).
    pub revision: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Stage name recorded for reviewer decisions.
pub const QUALITY_GATE_STAGE: &str = "quality_gate";

/// A content-generation job.
///
/// All mutators route through the transition table in [`crate::status`] and
/// refresh `updated_at`; none of them perform IO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentJob {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    /// Stage in flight; empty when idle.
    pub current_stage: String,
    pub request: ContentRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub history: Vec<StageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    /// Number of revision cycles started.
    #[serde(default)]
    pub revision: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentJob {
    /// Create a queued job for an (already validated) request.
    pub fn new(request: ContentRequest) -> Self {
        Self::with_id(JobId::new(), request)
    }

    pub fn with_id(id: JobId, request: ContentRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            current_stage: String::new(),
            request,
            artifact: None,
            history: Vec::new(),
            error: None,
            failed_stage: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, trigger: Trigger) -> Result<(), TransitionError> {
        self.status = self.status.apply(trigger)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Enter `running`, either fresh (`queued`) or for a revision cycle
    /// (`revising`), where progress restarts from `revision_floor`.
    pub fn start(&mut self, revision_floor: u8) -> Result<(), TransitionError> {
        let revising = self.status == JobStatus::Revising;
        self.transition(Trigger::Start)?;
        if revising {
            self.revision += 1;
            self.progress = revision_floor.min(99);
        } else {
            self.progress = 0;
        }
        Ok(())
    }

    /// Mark a stage as in flight. Only valid while running.
    pub fn begin_stage(&mut self, stage: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(Trigger::BeginStage)?;
        self.current_stage = stage.into();
        Ok(())
    }

    /// Record a successful stage and advance progress.
    ///
    /// When `last` is set the job moves to `awaiting_review` with progress
    /// 100 in the same mutation; otherwise progress is clamped below 100 so
    /// that 100 is only ever observed together with `awaiting_review`.
    pub fn complete_stage(
        &mut self,
        stage: impl Into<String>,
        content: String,
        metadata: JsonValue,
        attempts: u32,
        progress: u8,
        last: bool,
    ) -> Result<(), TransitionError> {
        self.transition(Trigger::CompleteStage)?;
        if last {
            self.transition(Trigger::FinishPipeline)?;
        }

        let stage = stage.into();
        let version = self.artifact.as_ref().map_or(1, |a| a.version + 1);
        self.history.push(StageRecord {
            stage: stage.clone(),
            kind: RecordKind::Stage,
            output: content.clone(),
            metadata,
            attempts,
            revision: self.revision,
            recorded_at: self.updated_at,
        });
        self.artifact = Some(Artifact {
            content,
            stage,
            version,
        });

        self.progress = if last {
            self.current_stage.clear();
            100
        } else {
            self.progress.max(progress.min(99))
        };
        Ok(())
    }

    /// Terminate the run. History and artifact from earlier stages are kept.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(Trigger::Fail)?;
        let error = error.into();
        self.error = Some(if error.trim().is_empty() {
            "unknown failure".to_string()
        } else {
            error
        });
        if !self.current_stage.is_empty() {
            self.failed_stage = Some(std::mem::take(&mut self.current_stage));
        }
        Ok(())
    }

    /// Apply a reviewer decision and append it to the history.
    pub fn decide(
        &mut self,
        action: QualityAction,
        feedback: Option<String>,
    ) -> Result<(), TransitionError> {
        self.transition(action.trigger())?;
        self.history.push(StageRecord {
            stage: QUALITY_GATE_STAGE.to_string(),
            kind: action.into(),
            output: feedback.unwrap_or_default(),
            metadata: JsonValue::Null,
            attempts: 0,
            revision: self.revision,
            recorded_at: self.updated_at,
        });
        Ok(())
    }

    /// Feedback of the most recent revision request, if any.
    pub fn revision_feedback(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|r| r.kind == RecordKind::RevisionRequested)
            .map(|r| r.output.as_str())
    }

    /// Number of completed stage entries (decisions excluded).
    pub fn completed_stages(&self) -> usize {
        self.history
            .iter()
            .filter(|r| r.kind == RecordKind::Stage)
            .count()
    }
}
