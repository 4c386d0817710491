//! Scripted agents and stores for workflow tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use contentforge_ai::{
    Agent, AgentInput, GenerationError, GenerationErrorKind, SharedContext, StageOutput,
};
use contentforge_content::{ContentJob, ContentRequest};
use contentforge_core::JobId;

use crate::jobs::{InMemoryJobStore, JobStore, StoreError};

use super::engine::WorkflowEngine;
use super::pipeline::{Pipeline, PipelineRegistry};

/// Agent whose behaviour is fixed up front: optionally fail the first
/// `failures` calls, optionally wait on a gate before answering.
pub(crate) struct ScriptedAgent {
    stage: &'static str,
    failures: u32,
    failure_kind: GenerationErrorKind,
    gate: Option<Arc<Notify>>,
    calls: AtomicU32,
}

impl ScriptedAgent {
    pub(crate) fn new(stage: &'static str) -> Arc<Self> {
        Arc::new(Self::plain(stage))
    }

    pub(crate) fn failing(stage: &'static str, failures: u32, kind: GenerationErrorKind) -> Arc<Self> {
        Arc::new(Self {
            failures,
            failure_kind: kind,
            ..Self::plain(stage)
        })
    }

    /// Agent that blocks every call until the returned gate is notified.
    pub(crate) fn gated(stage: &'static str) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let agent = Arc::new(Self {
            gate: Some(gate.clone()),
            ..Self::plain(stage)
        });
        (agent, gate)
    }

    fn plain(stage: &'static str) -> Self {
        Self {
            stage,
            failures: 0,
            failure_kind: GenerationErrorKind::Unknown,
            gate: None,
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn stage(&self) -> &str {
        self.stage
    }

    async fn run(
        &self,
        input: &AgentInput,
        _ctx: &SharedContext,
    ) -> Result<StageOutput, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if call <= self.failures {
            return Err(GenerationError::new(
                self.failure_kind,
                format!("scripted failure {call}"),
            ));
        }

        let mut content = match &input.prior {
            Some(prior) => format!("{}\n[{}]", prior.content, self.stage),
            None => format!("{} on {}", self.stage, input.request.topic),
        };
        if let Some(feedback) = &input.feedback {
            content.push_str(&format!(" ({feedback})"));
        }
        Ok(StageOutput::new(content).with_metadata(serde_json::json!({ "call": call })))
    }
}

pub(crate) fn agents(agents: Vec<Arc<ScriptedAgent>>) -> Vec<Arc<dyn Agent>> {
    agents
        .into_iter()
        .map(|a| a as Arc<dyn Agent>)
        .collect()
}

pub(crate) fn pipeline(stages: Vec<Arc<ScriptedAgent>>) -> Pipeline {
    Pipeline::new("scripted", agents(stages))
}

pub(crate) fn engine(store: Arc<dyn JobStore>, pipeline: Pipeline) -> Arc<WorkflowEngine> {
    Arc::new(WorkflowEngine::new(store, PipelineRegistry::new(pipeline)))
}

pub(crate) fn request() -> ContentRequest {
    ContentRequest::new(
        "blog",
        "edge caching",
        "platform engineers",
        vec!["explain trade-offs".into()],
    )
}

pub(crate) async fn queued_job<S: JobStore + ?Sized>(store: &S) -> ContentJob {
    let job = ContentJob::new(request());
    store.put(&job).await.unwrap();
    job
}

/// Poll until `done` holds for the stored job.
pub(crate) async fn wait_for<S, F>(store: &S, id: JobId, done: F) -> ContentJob
where
    S: JobStore + ?Sized,
    F: Fn(&ContentJob) -> bool,
{
    for _ in 0..500 {
        if let Some(job) = store.get(id).await.unwrap() {
            if done(&job) {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} never reached the expected state");
}

/// In-memory store that fails one chosen `put` (1-indexed) and/or the next
/// few `get`s.
pub(crate) struct FlakyStore {
    inner: InMemoryJobStore,
    puts: AtomicUsize,
    fail_on: AtomicUsize,
    failing_gets: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryJobStore::new(),
            puts: AtomicUsize::new(0),
            fail_on: AtomicUsize::new(0),
            failing_gets: AtomicUsize::new(0),
        }
    }

    pub(crate) fn inner(&self) -> &InMemoryJobStore {
        &self.inner
    }

    /// Fail the `n`th put counted from now.
    pub(crate) fn fail_put(&self, n: usize) {
        self.puts.store(0, Ordering::SeqCst);
        self.fail_on.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` gets.
    pub(crate) fn fail_gets(&self, n: usize) {
        self.failing_gets.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn get(&self, job_id: JobId) -> Result<Option<ContentJob>, StoreError> {
        let failing = self
            .failing_gets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("read timed out".to_string()));
        }
        self.inner.get(job_id).await
    }

    async fn put(&self, job: &ContentJob) -> Result<(), StoreError> {
        let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.put(job).await
    }
}
