//! Quality control gate: reviewer decisions on finished pipelines.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use contentforge_content::{ContentJob, QualityAction};
use contentforge_core::JobId;

use crate::jobs::JobStore;

use super::engine::WorkflowEngine;
use super::error::WorkflowError;

/// Applies approve / reject / request-revision to jobs in `awaiting_review`.
///
/// Decisions are serialized within the process so a double submission sees
/// the first decision's result and fails with `InvalidTransition`.
pub struct QualityGate {
    store: Arc<dyn JobStore>,
    engine: Arc<WorkflowEngine>,
    decisions: Mutex<()>,
}

impl QualityGate {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self {
            store: engine.store().clone(),
            engine,
            decisions: Mutex::new(()),
        }
    }

    pub async fn approve(
        &self,
        job_id: JobId,
        feedback: Option<String>,
    ) -> Result<ContentJob, WorkflowError> {
        self.decide(job_id, QualityAction::Approve, feedback).await
    }

    pub async fn reject(
        &self,
        job_id: JobId,
        feedback: Option<String>,
    ) -> Result<ContentJob, WorkflowError> {
        self.decide(job_id, QualityAction::Reject, feedback).await
    }

    /// Move the job to `revising` and hand it back to the engine, which
    /// re-runs the revision stages on the current artifact plus `feedback`.
    ///
    /// The returned snapshot is the `revising` state; progress of the
    /// revision run is observed by polling. Blank feedback is a validation
    /// error, reported only once the job exists and awaits review.
    pub async fn request_revision(
        &self,
        job_id: JobId,
        feedback: String,
    ) -> Result<ContentJob, WorkflowError> {
        let job = self
            .decide(job_id, QualityAction::RequestRevision, Some(feedback))
            .await?;
        self.engine.spawn(&job);
        Ok(job)
    }

    /// Dispatch on an action value, as received from a client.
    pub async fn apply(
        &self,
        job_id: JobId,
        action: QualityAction,
        feedback: Option<String>,
    ) -> Result<ContentJob, WorkflowError> {
        match action {
            QualityAction::Approve => self.approve(job_id, feedback).await,
            QualityAction::Reject => self.reject(job_id, feedback).await,
            QualityAction::RequestRevision => {
                self.request_revision(job_id, feedback.unwrap_or_default())
                    .await
            }
        }
    }

    async fn decide(
        &self,
        job_id: JobId,
        action: QualityAction,
        feedback: Option<String>,
    ) -> Result<ContentJob, WorkflowError> {
        let _guard = self.decisions.lock().await;

        let mut job = self
            .store
            .get(job_id)
            .await?
            .ok_or(WorkflowError::NotFound(job_id))?;

        let feedback = feedback.filter(|f| !f.trim().is_empty());
        let checked = job
            .status
            .apply(action.trigger())
            .map_err(WorkflowError::from)
            .and_then(|_| match (action, &feedback) {
                (QualityAction::RequestRevision, None) => Err(WorkflowError::Validation(
                    "feedback is required to request a revision".to_string(),
                )),
                _ => Ok(()),
            });
        if let Err(e) = checked {
            warn!(job_id = %job_id, action = action.as_str(), error = %e, "quality action rejected");
            return Err(e);
        }

        job.decide(action, feedback)?;
        self.store.put(&job).await?;

        info!(job_id = %job_id, action = action.as_str(), status = %job.status, "quality decision applied");
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::InMemoryJobStore;
    use crate::workflow::manager::JobManager;
    use crate::workflow::testing::{ScriptedAgent, agents, engine, pipeline, request, wait_for};
    use contentforge_content::{JobStatus, RecordKind, TransitionError, Trigger};

    struct Harness {
        store: Arc<InMemoryJobStore>,
        manager: JobManager,
        gate: QualityGate,
    }

    fn harness() -> Harness {
        let store = InMemoryJobStore::arc();
        let engine = engine(
            store.clone(),
            pipeline(vec![ScriptedAgent::new("draft"), ScriptedAgent::new("review")])
                .with_revision_stages(agents(vec![
                    ScriptedAgent::new("revise"),
                    ScriptedAgent::new("review"),
                ])),
        );
        Harness {
            store,
            manager: JobManager::new(engine.clone()),
            gate: QualityGate::new(engine),
        }
    }

    async fn awaiting_review(h: &Harness) -> ContentJob {
        let job = h.manager.create_job(request()).await.unwrap();
        wait_for(h.store.as_ref(), job.id, |j| j.status == JobStatus::AwaitingReview).await
    }

    #[tokio::test]
    async fn approve_is_terminal_and_records_feedback() {
        let h = harness();
        let job = awaiting_review(&h).await;

        let approved = h.gate.approve(job.id, Some("ship it".into())).await.unwrap();
        assert_eq!(approved.status, JobStatus::Approved);
        assert_eq!(approved.artifact, job.artifact);

        let last = approved.history.last().unwrap();
        assert_eq!(last.kind, RecordKind::Approved);
        assert_eq!(last.output, "ship it");
        assert_eq!(h.manager.get_job(job.id).await.unwrap(), approved);
    }

    #[tokio::test]
    async fn second_decision_fails_with_invalid_transition() {
        let h = harness();
        let job = awaiting_review(&h).await;

        h.gate.approve(job.id, None).await.unwrap();
        let err = h.gate.approve(job.id, None).await.unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition(TransitionError {
                from: JobStatus::Approved,
                trigger: Trigger::Approve,
            })
        );

        let err = h.gate.reject(job.id, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));

        let stored = h.manager.get_job(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Approved);
        assert_eq!(stored.history.len(), 3);
    }

    #[tokio::test]
    async fn concurrent_decisions_apply_exactly_once() {
        let h = harness();
        let job = awaiting_review(&h).await;

        let (a, b) = tokio::join!(
            h.gate.reject(job.id, Some("off topic".into())),
            h.gate.approve(job.id, None)
        );
        assert!(a.is_ok() ^ b.is_ok());

        let stored = h.manager.get_job(job.id).await.unwrap();
        assert!(stored.status.is_terminal());
        assert_eq!(stored.history.len(), 3);
    }

    #[tokio::test]
    async fn decision_before_pipeline_finishes_is_rejected() {
        let h = harness();
        let queued = ContentJob::new(request());
        h.store.put(&queued).await.unwrap();

        let err = h.gate.reject(queued.id, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn revision_reenters_engine_with_feedback() {
        let h = harness();
        let job = awaiting_review(&h).await;
        let first = job.artifact.clone().unwrap();

        let revising = h
            .gate
            .request_revision(job.id, "add a benchmark section".into())
            .await
            .unwrap();
        assert_eq!(revising.status, JobStatus::Revising);

        let done = wait_for(h.store.as_ref(), job.id, |j| {
            j.status == JobStatus::AwaitingReview && j.revision == 1
        })
        .await;
        let artifact = done.artifact.unwrap();
        assert_ne!(artifact.content, first.content);
        assert!(artifact.content.contains("add a benchmark section"));
        assert_eq!(done.progress, 100);

        let stages: Vec<_> = done.history.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(stages, vec!["draft", "review", "quality_gate", "revise", "review"]);
        assert_eq!(done.history[0].output, job.history[0].output);
    }

    #[tokio::test]
    async fn revision_requires_feedback() {
        let h = harness();
        let job = awaiting_review(&h).await;

        let err = h.gate.request_revision(job.id, " ".into()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(
            h.manager.get_job(job.id).await.unwrap().status,
            JobStatus::AwaitingReview
        );
    }

    #[tokio::test]
    async fn revision_of_unknown_job_is_not_found_even_without_feedback() {
        let h = harness();
        let id = JobId::new();

        assert_eq!(
            h.gate.request_revision(id, String::new()).await,
            Err(WorkflowError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn repeated_revision_after_decision_is_invalid_transition() {
        let h = harness();
        let job = awaiting_review(&h).await;
        h.gate.approve(job.id, None).await.unwrap();

        for feedback in ["", "one more pass"] {
            let err = h
                .gate
                .request_revision(job.id, feedback.into())
                .await
                .unwrap_err();
            assert_eq!(
                err,
                WorkflowError::InvalidTransition(TransitionError {
                    from: JobStatus::Approved,
                    trigger: Trigger::RequestRevision,
                })
            );
        }
    }

    #[tokio::test]
    async fn apply_dispatches_by_action() {
        let h = harness();
        let job = awaiting_review(&h).await;

        let rejected = h
            .gate
            .apply(job.id, QualityAction::Reject, Some("wrong audience".into()))
            .await
            .unwrap();
        assert_eq!(rejected.status, JobStatus::Rejected);
        assert_eq!(rejected.history.last().unwrap().kind, RecordKind::Rejected);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let h = harness();
        let id = JobId::new();
        assert_eq!(
            h.gate.approve(id, None).await,
            Err(WorkflowError::NotFound(id))
        );
    }
}
