//! Workflow engine: drives one job through its pipeline.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use contentforge_ai::{Agent, AgentInput, GenerationError, SharedContext, StageOutput};
use contentforge_content::{ContentJob, JobStatus, TransitionError};
use contentforge_core::JobId;

use crate::jobs::{JobStore, RetryPolicy, StoreError};

use super::error::WorkflowError;
use super::pipeline::PipelineRegistry;

/// Runs pipelines against jobs held in a [`JobStore`].
///
/// Every state change is persisted before the next stage starts, so a poller
/// always sees a state the job actually went through. A run is the only
/// writer of its job until it reaches `awaiting_review` or `failed`.
pub struct WorkflowEngine {
    store: Arc<dyn JobStore>,
    pipelines: PipelineRegistry,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn JobStore>, pipelines: PipelineRegistry) -> Self {
        Self { store, pipelines }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Run the job in the background. Errors are logged, never returned:
    /// callers observe the outcome by reading the job.
    ///
    /// `job` is the snapshot the caller just persisted. If the run cannot
    /// read the job back, that snapshot is recorded as failed instead.
    pub fn spawn(self: &Arc<Self>, job: &ContentJob) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let job_id = job.id;
        let last_known = job.clone();
        tokio::spawn(
            async move {
                match engine.execute(job_id, Some(last_known)).await {
                    Ok(status) => info!(status = %status, "workflow run finished"),
                    Err(e) => error!(error = %e, "workflow run aborted"),
                }
            }
            .instrument(info_span!("workflow", job_id = %job_id)),
        )
    }

    /// Execute the job's pipeline from `queued` (full pipeline) or
    /// `revising` (revision stages) until it awaits review or fails.
    ///
    /// Returns the status the run ended in. Generation failures are recorded
    /// on the job and yield `Ok(JobStatus::Failed)`; `Err` is reserved for
    /// missing jobs, illegal starting states and storage faults.
    pub async fn run(&self, job_id: JobId) -> Result<JobStatus, WorkflowError> {
        self.execute(job_id, None).await
    }

    async fn execute(
        &self,
        job_id: JobId,
        last_known: Option<ContentJob>,
    ) -> Result<JobStatus, WorkflowError> {
        let mut job = match self.load(job_id).await {
            Ok(job) => job,
            Err(WorkflowError::Storage(e)) => {
                if let Some(known) = &last_known {
                    self.abort(known, format!("could not load job state: {e}"))
                        .await;
                }
                return Err(e.into());
            }
            Err(e) => return Err(e),
        };

        let pipeline = self.pipelines.resolve(&job.request);
        let revising = job.status == JobStatus::Revising;
        let (stages, floor) = if revising {
            (
                pipeline.revision_stages(),
                pipeline.config().revision_progress_floor.min(99),
            )
        } else {
            (pipeline.stages(), 0)
        };
        let retry = &pipeline.config().retry;

        self.commit(&mut job, |j| j.start(floor)).await?;
        info!(
            job_id = %job_id,
            pipeline = pipeline.name(),
            revision = job.revision,
            stages = stages.len(),
            "workflow run started"
        );

        if stages.is_empty() {
            let message = format!("pipeline '{}' has no stages", pipeline.name());
            warn!(job_id = %job_id, "{message}");
            self.commit(&mut job, |j| j.fail(message)).await?;
            return Ok(job.status);
        }

        let feedback = if revising {
            job.revision_feedback().map(str::to_owned)
        } else {
            None
        };
        let total = stages.len();

        for (index, agent) in stages.iter().enumerate() {
            let stage = agent.stage().to_string();
            self.commit(&mut job, |j| j.begin_stage(stage.clone())).await?;

            let input = AgentInput::new(job.request.clone())
                .with_prior(job.artifact.clone())
                .with_feedback(feedback.clone());
            let ctx = SharedContext {
                job_id,
                attempt: 1,
                revision: job.revision,
            };

            match run_stage(agent.as_ref(), &input, ctx, retry).await {
                Ok((output, attempts)) => {
                    let progress = stage_progress(floor, index, total);
                    let last = index + 1 == total;
                    self.commit(&mut job, |j| {
                        j.complete_stage(
                            stage.clone(),
                            output.content,
                            output.metadata,
                            attempts,
                            progress,
                            last,
                        )
                    })
                    .await?;
                    debug!(
                        job_id = %job_id,
                        stage = %stage,
                        attempts,
                        progress = job.progress,
                        "stage completed"
                    );
                }
                Err(e) => {
                    warn!(job_id = %job_id, stage = %stage, error = %e, "stage failed");
                    let message = e.to_string();
                    self.commit(&mut job, |j| j.fail(message)).await?;
                    return Ok(job.status);
                }
            }
        }

        Ok(job.status)
    }

    /// Apply `mutate` to a copy of the job and persist it. The caller's copy
    /// only advances once the write succeeded.
    async fn commit<F>(&self, job: &mut ContentJob, mutate: F) -> Result<(), WorkflowError>
    where
        F: FnOnce(&mut ContentJob) -> Result<(), TransitionError>,
    {
        let mut next = job.clone();
        mutate(&mut next)?;
        if let Err(e) = self.store.put(&next).await {
            self.abort(job, format!("could not persist job state: {e}"))
                .await;
            return Err(e.into());
        }
        *job = next;
        Ok(())
    }

    /// Read the job, retrying while the store is unavailable. The job's own
    /// pipeline is unknown until it is read, so the default pipeline's retry
    /// policy applies.
    async fn load(&self, job_id: JobId) -> Result<ContentJob, WorkflowError> {
        let retry = &self.pipelines.default_pipeline().config().retry;
        let mut retries = 0;
        loop {
            match self.store.get(job_id).await {
                Ok(Some(job)) => return Ok(job),
                Ok(None) => return Err(WorkflowError::NotFound(job_id)),
                Err(e @ StoreError::Unavailable(_)) if retry.should_retry(retries) => {
                    retries += 1;
                    let delay = retry.delay_for_retry(retries);
                    warn!(
                        job_id = %job_id,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "could not load job, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Best effort: mark `job` (the last state known to be persisted) as
    /// failed so it does not stay active forever once the store recovers.
    async fn abort(&self, job: &ContentJob, reason: String) {
        error!(job_id = %job.id, reason = %reason, "workflow run aborted by store fault");

        let mut failed = job.clone();
        if failed.fail(reason).is_err() {
            return;
        }
        if let Err(e) = self.store.put(&failed).await {
            error!(job_id = %job.id, error = %e, "could not record job failure");
        }
    }
}

/// Run one agent, retrying transient failures per `retry`.
/// Returns the output with the number of attempts used.
async fn run_stage(
    agent: &dyn Agent,
    input: &AgentInput,
    mut ctx: SharedContext,
    retry: &RetryPolicy,
) -> Result<(StageOutput, u32), GenerationError> {
    let mut retries = 0;
    loop {
        ctx.attempt = retries + 1;
        match agent.run(input, &ctx).await {
            Ok(output) => return Ok((output, ctx.attempt)),
            Err(e) if retry.is_retryable(&e) && retry.should_retry(retries) => {
                retries += 1;
                let delay = retry.delay_for_retry(retries);
                warn!(
                    job_id = %ctx.job_id,
                    stage = agent.stage(),
                    attempt = ctx.attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "stage attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Progress after completing stage `index` of `total`, spread over
/// `floor..=100`.
fn stage_progress(floor: u8, index: usize, total: usize) -> u8 {
    let floor = u32::from(floor.min(100));
    let span = 100 - floor;
    let done = (index + 1).min(total) as u32;
    (floor + span * done / total.max(1) as u32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::InMemoryJobStore;
    use crate::workflow::testing::{
        FlakyStore, ScriptedAgent, agents, engine, pipeline, queued_job, wait_for,
    };
    use contentforge_ai::GenerationErrorKind;
    use contentforge_content::{QualityAction, RecordKind};

    #[test]
    fn stage_progress_spreads_over_range() {
        assert_eq!(stage_progress(0, 0, 2), 50);
        assert_eq!(stage_progress(0, 1, 2), 100);
        assert_eq!(stage_progress(50, 0, 2), 75);
        assert_eq!(stage_progress(50, 1, 2), 100);
        assert_eq!(stage_progress(0, 0, 3), 33);
    }

    #[tokio::test]
    async fn run_takes_queued_job_to_awaiting_review() {
        let store = InMemoryJobStore::arc();
        let draft = ScriptedAgent::new("draft");
        let review = ScriptedAgent::new("review");
        let engine = engine(store.clone(), pipeline(vec![draft.clone(), review.clone()]));
        let job = queued_job(&store).await;

        let status = engine.run(job.id).await.unwrap();
        assert_eq!(status, JobStatus::AwaitingReview);

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::AwaitingReview);
        assert_eq!(stored.progress, 100);
        assert!(stored.current_stage.is_empty());
        assert_eq!(stored.history.len(), 2);
        assert_eq!(stored.history[0].stage, "draft");
        assert_eq!(stored.history[1].stage, "review");
        let artifact = stored.artifact.unwrap();
        assert_eq!(artifact.stage, "review");
        assert_eq!(artifact.version, 2);
        assert_eq!(draft.calls(), 1);
        assert_eq!(review.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() {
        let store = InMemoryJobStore::arc();
        let draft = ScriptedAgent::failing("draft", 1, GenerationErrorKind::UpstreamTimeout);
        let engine = engine(store.clone(), pipeline(vec![draft.clone()]));
        let job = queued_job(&store).await;

        assert_eq!(engine.run(job.id).await.unwrap(), JobStatus::AwaitingReview);

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.history[0].attempts, 2);
        assert_eq!(draft.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_the_job_and_keep_partial_history() {
        let store = InMemoryJobStore::arc();
        let draft = ScriptedAgent::new("draft");
        let review = ScriptedAgent::failing("review", 10, GenerationErrorKind::UpstreamTimeout);
        let engine = engine(store.clone(), pipeline(vec![draft, review.clone()]));
        let job = queued_job(&store).await;

        assert_eq!(engine.run(job.id).await.unwrap(), JobStatus::Failed);

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failed_stage.as_deref(), Some("review"));
        assert_eq!(
            stored.error.as_deref(),
            Some("upstream_timeout: scripted failure 3")
        );
        assert_eq!(stored.history.len(), 1);
        assert_eq!(stored.artifact.unwrap().stage, "draft");
        assert!(stored.progress < 100);
        // default policy: first attempt plus two retries
        assert_eq!(review.calls(), 3);
    }

    #[tokio::test]
    async fn non_retryable_failure_fails_immediately() {
        let store = InMemoryJobStore::arc();
        let draft = ScriptedAgent::failing("draft", 1, GenerationErrorKind::UpstreamRejected);
        let engine = engine(store.clone(), pipeline(vec![draft.clone()]));
        let job = queued_job(&store).await;

        assert_eq!(engine.run(job.id).await.unwrap(), JobStatus::Failed);
        assert_eq!(draft.calls(), 1);

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(
            stored.error.as_deref(),
            Some("upstream_rejected: scripted failure 1")
        );
    }

    #[tokio::test]
    async fn storage_fault_aborts_run_and_records_failure() {
        let store = Arc::new(FlakyStore::new());
        let engine = engine(
            store.clone(),
            pipeline(vec![ScriptedAgent::new("draft"), ScriptedAgent::new("review")]),
        );
        let job = queued_job(store.inner()).await;

        // puts: start, begin draft, complete draft (fails)
        store.fail_put(3);
        let err = engine.run(job.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Storage(StoreError::Unavailable(_))));

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failed_stage.as_deref(), Some("draft"));
        assert!(
            stored
                .error
                .unwrap()
                .starts_with("could not persist job state")
        );
        assert!(stored.history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_read_failure_at_start_is_retried() {
        let store = Arc::new(FlakyStore::new());
        let engine = engine(store.clone(), pipeline(vec![ScriptedAgent::new("draft")]));
        let job = queued_job(store.inner()).await;

        store.fail_gets(1);
        engine.spawn(&job).await.unwrap();

        let stored = store.inner().get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::AwaitingReview);
        assert!(stored.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_job_is_recorded_as_failed() {
        let store = Arc::new(FlakyStore::new());
        let draft = ScriptedAgent::new("draft");
        let engine = engine(store.clone(), pipeline(vec![draft.clone()]));
        let job = queued_job(store.inner()).await;

        // default policy: first read plus two retries
        store.fail_gets(3);
        engine.spawn(&job).await.unwrap();

        let stored = store.inner().get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(
            stored
                .error
                .unwrap()
                .starts_with("could not load job state")
        );
        assert_eq!(draft.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn direct_run_surfaces_read_failure() {
        let store = Arc::new(FlakyStore::new());
        let engine = engine(store.clone(), pipeline(vec![ScriptedAgent::new("draft")]));
        let job = queued_job(store.inner()).await;

        store.fail_gets(3);
        let err = engine.run(job.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Storage(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn run_of_unknown_job_is_not_found() {
        let store = InMemoryJobStore::arc();
        let engine = engine(store, pipeline(vec![ScriptedAgent::new("draft")]));
        let id = JobId::new();

        assert_eq!(engine.run(id).await, Err(WorkflowError::NotFound(id)));
    }

    #[tokio::test]
    async fn run_of_job_awaiting_review_is_rejected() {
        let store = InMemoryJobStore::arc();
        let engine = engine(store.clone(), pipeline(vec![ScriptedAgent::new("draft")]));
        let job = queued_job(&store).await;
        engine.run(job.id).await.unwrap();

        let err = engine.run(job.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn progress_stays_below_100_while_running() {
        let store = InMemoryJobStore::arc();
        let (review, gate) = ScriptedAgent::gated("review");
        let engine = engine(
            store.clone(),
            pipeline(vec![ScriptedAgent::new("draft"), review]),
        );
        let job = queued_job(&store).await;

        let handle = engine.spawn(&job);
        let running = wait_for(store.as_ref(), job.id, |j| j.current_stage == "review").await;
        assert_eq!(running.status, JobStatus::Running);
        assert_eq!(running.progress, 50);

        gate.notify_one();
        handle.await.unwrap();
        let done = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::AwaitingReview);
        assert_eq!(done.progress, 100);
    }

    #[tokio::test]
    async fn revision_cycle_restarts_from_progress_floor() {
        let store = InMemoryJobStore::arc();
        let engine = engine(
            store.clone(),
            pipeline(vec![ScriptedAgent::new("draft"), ScriptedAgent::new("review")])
                .with_revision_stages(agents(vec![
                    ScriptedAgent::new("revise"),
                    ScriptedAgent::new("review"),
                ])),
        );
        let job = queued_job(&store).await;
        engine.run(job.id).await.unwrap();

        let mut awaiting = store.get(job.id).await.unwrap().unwrap();
        let first = awaiting.artifact.clone().unwrap();
        awaiting
            .decide(QualityAction::RequestRevision, Some("shorter intro".into()))
            .unwrap();
        store.put(&awaiting).await.unwrap();

        assert_eq!(engine.run(job.id).await.unwrap(), JobStatus::AwaitingReview);

        let revised = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(revised.revision, 1);
        assert_eq!(revised.progress, 100);
        let artifact = revised.artifact.unwrap();
        assert_ne!(artifact.content, first.content);
        assert!(artifact.content.contains("shorter intro"));
        assert_eq!(artifact.version, 4);

        let kinds: Vec<_> = revised.history.iter().map(|r| (r.stage.as_str(), r.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("draft", RecordKind::Stage),
                ("review", RecordKind::Stage),
                ("quality_gate", RecordKind::RevisionRequested),
                ("revise", RecordKind::Stage),
                ("review", RecordKind::Stage),
            ]
        );
        assert!(revised.history[3..].iter().all(|r| r.revision == 1));
    }
}
