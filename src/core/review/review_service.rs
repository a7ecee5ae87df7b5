// Review service - drives the create / poll / fetch cycle against the assistant.
//
// The backend trait is the port; the OpenAI client in infra is the adapter.
// Every failure comes back as a `ReviewFailure` value, never as an Err.

use super::review_models::{
    ReviewConfig, ReviewError, ReviewFailure, ReviewJob, ReviewOutcome, RunState, ThreadMessage,
    Verdict,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[async_trait]
pub trait ReviewBackend: Send + Sync {
    /// Open a thread carrying `text` as the only user message and start a run on it.
    async fn create_run(&self, text: &str, config: &ReviewConfig)
        -> Result<ReviewJob, ReviewError>;

    /// Fetch the current status of a run.
    async fn run_state(&self, job: &ReviewJob) -> Result<RunState, ReviewError>;

    /// List the messages on the run's thread.
    async fn thread_messages(&self, job: &ReviewJob) -> Result<Vec<ThreadMessage>, ReviewError>;
}

pub struct ReviewService<B: ReviewBackend> {
    backend: B,
    config: ReviewConfig,
}

impl<B: ReviewBackend> ReviewService<B> {
    pub fn new(backend: B, config: ReviewConfig) -> Self {
        Self { backend, config }
    }

    /// Submit a message for review and wait for the verdict.
    ///
    /// `elapsed` is zero when the run could not even be created.
    pub async fn submit_for_review(&self, text: &str) -> ReviewOutcome {
        let started = Instant::now();
        tracing::info!(
            preview = %text.chars().take(100).collect::<String>(),
            "Submitting message for review"
        );

        let job = match self.backend.create_run(text, &self.config).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create review run");
                return ReviewOutcome {
                    result: Err(ReviewFailure::SubmissionError),
                    elapsed: Duration::ZERO,
                };
            }
        };
        tracing::info!(
            thread_id = %job.thread_id,
            run_id = %job.run_id,
            "Created review run"
        );

        let result = self.await_verdict(&job).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(verdict) => tracing::info!(
                status = verdict.status.as_str(),
                elapsed_secs = elapsed.as_secs_f64(),
                "Review completed"
            ),
            Err(failure) => tracing::error!(
                reason = %failure,
                run_id = %job.run_id,
                elapsed_secs = elapsed.as_secs_f64(),
                "Review did not produce a verdict"
            ),
        }

        ReviewOutcome { result, elapsed }
    }

    async fn await_verdict(&self, job: &ReviewJob) -> Result<Verdict, ReviewFailure> {
        for attempt in 1..=self.config.max_polls {
            let state = self.backend.run_state(job).await.map_err(|e| {
                tracing::error!(error = %e, attempt, "Run status check failed");
                ReviewFailure::Transport
            })?;
            tracing::debug!(attempt, state = ?state, "Run status check");

            match state {
                RunState::Completed => return self.fetch_verdict(job).await,
                RunState::Failed(status) => {
                    tracing::error!(status = %status, run_id = %job.run_id, "Review run failed");
                    return Err(ReviewFailure::RunFailed);
                }
                RunState::Pending => sleep(self.config.poll_interval).await,
            }
        }

        tracing::error!(
            max_polls = self.config.max_polls,
            "Review run still pending after maximum polls"
        );
        Err(ReviewFailure::Timeout)
    }

    async fn fetch_verdict(&self, job: &ReviewJob) -> Result<Verdict, ReviewFailure> {
        let messages = self.backend.thread_messages(job).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch review messages");
            ReviewFailure::Transport
        })?;

        // Listing is newest-first; on equal timestamps keep the first listed.
        let reply = messages
            .iter()
            .rev()
            .filter(|m| m.is_assistant())
            .max_by_key(|m| m.created_at)
            .ok_or_else(|| {
                tracing::error!(thread_id = %job.thread_id, "No assistant reply on thread");
                ReviewFailure::Unparseable
            })?;

        Verdict::parse(&reply.text).map_err(|e| {
            tracing::error!(error = %e, body = %reply.text, "Assistant reply is not a verdict");
            ReviewFailure::Unparseable
        })
    }
}
