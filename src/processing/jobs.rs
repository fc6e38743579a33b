//! Registry for long-running answer and summarization jobs
//!
//! Jobs are keyed by opaque `Uuid`, carry an explicit state, and support
//! cooperative cancellation. Outcomes are held until explicitly reaped or
//! their TTL elapses so the registry cannot grow without bound. Nothing is
//! persisted; the registry dies with the process.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::JobConfig;
use crate::error::Error;
use crate::types::{AnswerResult, ConversationTurn, SourceDocument};

use super::pipeline::{QaPipeline, RequestStage};

/// State of a registered job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    /// Whether the job can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Result payload of a finished job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// An answered question
    Answer(AnswerResult),
    /// A document-set summary
    Summary(String),
}

/// Cooperative cancellation flag shared with a running job
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Externally visible snapshot of one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: Uuid,
    pub state: JobState,
    pub stage: RequestStage,
    pub outcome: Option<JobOutcome>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct JobRecord {
    status: JobStatus,
    cancel: CancelToken,
}

/// Registry of in-flight and recently finished jobs
pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, JobRecord>>,
    result_ttl: Duration,
}

impl JobRegistry {
    /// Create a registry from configuration
    pub fn new(config: &JobConfig) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            result_ttl: Duration::from_secs(config.result_ttl_secs),
        }
    }

    /// Spawn an answer job over a document set
    pub fn spawn_answer(
        &self,
        pipeline: Arc<QaPipeline>,
        documents: Vec<SourceDocument>,
        question: String,
        history: Vec<ConversationTurn>,
    ) -> Uuid {
        let id = self.register();
        let jobs = Arc::clone(&self.jobs);
        let cancel = self.cancel_token(&id);

        tokio::spawn(async move {
            set_running(&jobs, &id);

            let progress_jobs = Arc::clone(&jobs);
            let result = pipeline
                .answer_documents_with_progress(
                    &documents,
                    &question,
                    &history,
                    &cancel,
                    move |stage| update_stage(&progress_jobs, &id, stage),
                )
                .await;

            finish(&jobs, &id, result.map(JobOutcome::Answer));
        });

        id
    }

    /// Spawn a summarization job over a document set
    pub fn spawn_summarize(&self, pipeline: Arc<QaPipeline>, documents: Vec<SourceDocument>) -> Uuid {
        let id = self.register();
        let jobs = Arc::clone(&self.jobs);
        let cancel = self.cancel_token(&id);

        tokio::spawn(async move {
            set_running(&jobs, &id);
            let result = pipeline.summarize_documents(&documents, &cancel).await;
            finish(&jobs, &id, result.map(JobOutcome::Summary));
        });

        id
    }

    /// Look up the current status of a job
    pub fn status(&self, id: &Uuid) -> Option<JobStatus> {
        self.jobs.get(id).map(|record| record.status.clone())
    }

    /// Request cancellation of a job
    ///
    /// Returns false when the job is unknown or already terminal. The state
    /// flips to `Cancelled` once the running task observes the flag.
    pub fn cancel(&self, id: &Uuid) -> bool {
        match self.jobs.get(id) {
            Some(record) if !record.status.state.is_terminal() => {
                record.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Remove a finished job and return its final status
    pub fn reap(&self, id: &Uuid) -> Option<JobStatus> {
        let terminal = self
            .jobs
            .get(id)
            .map(|record| record.status.state.is_terminal())
            .unwrap_or(false);

        if terminal {
            self.jobs.remove(id).map(|(_, record)| record.status)
        } else {
            None
        }
    }

    /// Drop terminal jobs whose results have outlived the TTL
    pub fn reap_expired(&self) -> usize {
        let now = Utc::now();
        let ttl = chrono::TimeDelta::from_std(self.result_ttl).unwrap_or(chrono::TimeDelta::MAX);
        let before = self.jobs.len();

        self.jobs.retain(|_, record| {
            let expired = record.status.state.is_terminal()
                && record
                    .status
                    .finished_at
                    .map(|finished| now - finished >= ttl)
                    .unwrap_or(false);
            !expired
        });

        before - self.jobs.len()
    }

    /// Number of tracked jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the registry tracks no jobs
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn register(&self) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.jobs.insert(
            id,
            JobRecord {
                status: JobStatus {
                    id,
                    state: JobState::Pending,
                    stage: RequestStage::Received,
                    outcome: None,
                    error: None,
                    created_at: now,
                    updated_at: now,
                    finished_at: None,
                },
                cancel: CancelToken::new(),
            },
        );

        id
    }

    fn cancel_token(&self, id: &Uuid) -> CancelToken {
        self.jobs
            .get(id)
            .map(|record| record.cancel.clone())
            .unwrap_or_default()
    }
}

fn set_running(jobs: &DashMap<Uuid, JobRecord>, id: &Uuid) {
    if let Some(mut record) = jobs.get_mut(id) {
        record.status.state = JobState::Running;
        record.status.updated_at = Utc::now();
    }
}

fn update_stage(jobs: &DashMap<Uuid, JobRecord>, id: &Uuid, stage: RequestStage) {
    if let Some(mut record) = jobs.get_mut(id) {
        record.status.stage = stage;
        record.status.updated_at = Utc::now();
    }
}

fn finish(
    jobs: &DashMap<Uuid, JobRecord>,
    id: &Uuid,
    result: crate::error::Result<JobOutcome>,
) {
    if let Some(mut record) = jobs.get_mut(id) {
        let now = Utc::now();
        record.status.updated_at = now;
        record.status.finished_at = Some(now);

        match result {
            Ok(outcome) => {
                record.status.state = JobState::Completed;
                record.status.stage = RequestStage::Completed;
                record.status.outcome = Some(outcome);
            }
            Err(Error::Cancelled) => {
                record.status.state = JobState::Cancelled;
                tracing::info!(job = %id, "job cancelled");
            }
            Err(e) => {
                record.status.state = JobState::Failed;
                record.status.stage = RequestStage::Failed;
                record.status.error = Some(e.to_string());
                tracing::warn!(job = %id, "job failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    use crate::config::RagConfig;
    use crate::error::Result;
    use crate::providers::{EmbeddingProvider, LlmProvider};

    struct SlowEmbedder {
        delay_ms: u64,
    }

    #[async_trait]
    impl EmbeddingProvider for SlowEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    struct CannedLlm;

    #[async_trait]
    impl LlmProvider for CannedLlm {
        async fn generate_answer(
            &self,
            _question: &str,
            _context: &str,
            _history: &[ConversationTurn],
        ) -> Result<String> {
            Ok("A canned answer.".to_string())
        }

        async fn generate_summary(&self, _text: &str) -> Result<String> {
            Ok("A canned summary.".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    fn test_pipeline(embed_delay_ms: u64) -> Arc<QaPipeline> {
        Arc::new(QaPipeline::with_providers(
            RagConfig::default(),
            Arc::new(SlowEmbedder {
                delay_ms: embed_delay_ms,
            }),
            Arc::new(CannedLlm),
        ))
    }

    fn text_doc(name: &str) -> SourceDocument {
        SourceDocument::from_text(
            name,
            "A body of text that is comfortably longer than the fifty character minimum segment length.",
        )
    }

    async fn wait_terminal(registry: &JobRegistry, id: &Uuid) -> JobStatus {
        for _ in 0..200 {
            if let Some(status) = registry.status(id) {
                if status.state.is_terminal() {
                    return status;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job did not reach a terminal state in time");
    }

    #[tokio::test]
    async fn test_answer_job_completes_with_outcome() {
        let registry = JobRegistry::new(&JobConfig::default());
        let pipeline = test_pipeline(0);

        let id = registry.spawn_answer(
            pipeline,
            vec![text_doc("a.txt")],
            "What is this about?".to_string(),
            Vec::new(),
        );

        let status = wait_terminal(&registry, &id).await;
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.stage, RequestStage::Completed);
        match status.outcome {
            Some(JobOutcome::Answer(result)) => assert_eq!(result.answer, "A canned answer."),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_summarize_job_completes() {
        let registry = JobRegistry::new(&JobConfig::default());
        let pipeline = test_pipeline(0);

        let id = registry.spawn_summarize(pipeline, vec![text_doc("a.txt"), text_doc("b.txt")]);

        let status = wait_terminal(&registry, &id).await;
        assert_eq!(status.state, JobState::Completed);
        match status.outcome {
            Some(JobOutcome::Summary(summary)) => {
                assert!(summary.contains("a.txt"));
                assert!(summary.contains("b.txt"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_job_failure_is_recorded() {
        let registry = JobRegistry::new(&JobConfig::default());
        let pipeline = test_pipeline(0);

        // No documents at all: the pipeline fails with NoContent
        let id = registry.spawn_answer(pipeline, Vec::new(), "Anything?".to_string(), Vec::new());

        let status = wait_terminal(&registry, &id).await;
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.stage, RequestStage::Failed);
        assert!(status.error.is_some());
        assert!(status.outcome.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_reaches_cancelled_state() {
        let registry = JobRegistry::new(&JobConfig::default());
        // Slow embedding keeps the job running long enough to cancel
        let pipeline = test_pipeline(50);
        let documents: Vec<SourceDocument> =
            (0..20).map(|i| text_doc(&format!("doc-{}.txt", i))).collect();

        let id = registry.spawn_answer(pipeline, documents, "Anything?".to_string(), Vec::new());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(registry.cancel(&id));

        let status = wait_terminal(&registry, &id).await;
        assert_eq!(status.state, JobState::Cancelled);
        assert!(status.outcome.is_none());
    }

    #[tokio::test]
    async fn test_cancel_unknown_or_finished_job_is_false() {
        let registry = JobRegistry::new(&JobConfig::default());
        assert!(!registry.cancel(&Uuid::new_v4()));

        let pipeline = test_pipeline(0);
        let id = registry.spawn_answer(
            pipeline,
            vec![text_doc("a.txt")],
            "Q?".to_string(),
            Vec::new(),
        );
        wait_terminal(&registry, &id).await;
        assert!(!registry.cancel(&id));
    }

    #[tokio::test]
    async fn test_reap_removes_terminal_jobs_only() {
        let registry = JobRegistry::new(&JobConfig::default());
        let pipeline = test_pipeline(0);
        let id = registry.spawn_answer(
            pipeline,
            vec![text_doc("a.txt")],
            "Q?".to_string(),
            Vec::new(),
        );

        wait_terminal(&registry, &id).await;
        let reaped = registry.reap(&id);
        assert!(reaped.is_some());
        assert!(registry.status(&id).is_none());
    }

    #[tokio::test]
    async fn test_expired_results_are_reaped() {
        let registry = JobRegistry::new(&JobConfig { result_ttl_secs: 0 });
        let pipeline = test_pipeline(0);
        let id = registry.spawn_answer(
            pipeline,
            vec![text_doc("a.txt")],
            "Q?".to_string(),
            Vec::new(),
        );

        wait_terminal(&registry, &id).await;
        let removed = registry.reap_expired();
        assert_eq!(removed, 1);
        assert!(registry.is_empty());
    }
}
