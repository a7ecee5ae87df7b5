// Moderation pipeline - core business logic for one inbound message.
//
// Flow: review -> branch on verdict -> notify author + audit (independently)
// -> persist exactly one record.
//
// NO Discord dependencies here - notification and persistence are ports.

use super::moderation_models::{
    ActionTaken, InboundMessage, ModerationRecord, Outcome, RecentRecord, UserStats,
};
use crate::core::audit::{AuditEntry, AuditSink};
use crate::core::review::{ReviewBackend, ReviewService, VerdictStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The author does not accept private messages from us.
    #[error("Recipient unreachable: {0}")]
    Unreachable(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

// ============================================================================
// PORTS
// ============================================================================

/// Append-only moderation log.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Persist one record. Returns once the row is durable.
    async fn append(&self, record: &ModerationRecord) -> Result<(), StoreError>;

    /// Delete records older than `cutoff_days` days. Returns the number deleted.
    async fn purge_older_than(&self, cutoff_days: u32) -> Result<u64, StoreError>;

    /// Status counts for one user over the last `window_days` days.
    async fn stats_for_user(&self, user_id: u64, window_days: u32)
        -> Result<UserStats, StoreError>;

    /// The `limit` newest records, newest first.
    async fn recent_records(&self, limit: u32) -> Result<Vec<RecentRecord>, StoreError>;
}

/// Private channel back to the author of a message.
#[async_trait]
pub trait AuthorNotifier: Send + Sync {
    /// Send the reviewer's feedback along with the original content and attachments.
    async fn notify_author(&self, msg: &InboundMessage, feedback: &str)
        -> Result<(), NotifyError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationPipeline<B, S, A, N>
where
    B: ReviewBackend,
    S: ModerationStore,
    A: AuditSink,
    N: AuthorNotifier,
{
    reviewer: ReviewService<B>,
    store: Arc<S>,
    audit: A,
    notifier: N,
}

impl<B, S, A, N> ModerationPipeline<B, S, A, N>
where
    B: ReviewBackend,
    S: ModerationStore,
    A: AuditSink,
    N: AuthorNotifier,
{
    pub fn new(reviewer: ReviewService<B>, store: Arc<S>, audit: A, notifier: N) -> Self {
        Self {
            reviewer,
            store,
            audit,
            notifier,
        }
    }

    /// Review one message and act on the verdict.
    ///
    /// Always appends exactly one record. Notification, audit and storage
    /// failures are logged here and never surface to the caller.
    pub async fn process_message(&self, msg: &InboundMessage) {
        tracing::info!(
            message_id = msg.message_id,
            author = %msg.author_name,
            author_id = msg.author_id,
            "Processing message"
        );

        let review = self.reviewer.submit_for_review(&msg.content).await;
        let elapsed = review.elapsed;

        let record = match review.result {
            Err(failure) => {
                tracing::error!(
                    message_id = msg.message_id,
                    reason = %failure,
                    "Review failed, logging as error"
                );
                ModerationRecord::for_message(msg, Outcome::Error, None, ActionTaken::None, elapsed)
            }
            Ok(verdict) if verdict.status == VerdictStatus::Approved => {
                tracing::info!(message_id = msg.message_id, "Message approved");
                let outcome = Outcome::Reviewed(verdict.status);

                self.audit
                    .emit(AuditEntry {
                        message_id: msg.message_id,
                        channel_id: msg.channel_id,
                        author_name: msg.author_name.clone(),
                        outcome: outcome.clone(),
                        feedback: None,
                        content: None,
                    })
                    .await;

                ModerationRecord::for_message(
                    msg,
                    outcome,
                    Some(verdict.feedback),
                    ActionTaken::Approved,
                    elapsed,
                )
            }
            Ok(verdict) => {
                tracing::warn!(
                    message_id = msg.message_id,
                    status = verdict.status.as_str(),
                    "Message not approved"
                );
                let outcome = Outcome::Reviewed(verdict.status);
                let entry = AuditEntry {
                    message_id: msg.message_id,
                    channel_id: msg.channel_id,
                    author_name: msg.author_name.clone(),
                    outcome: outcome.clone(),
                    feedback: Some(verdict.feedback.clone()),
                    content: Some(msg.content.clone()),
                };

                let (notified, ()) = tokio::join!(
                    self.notifier.notify_author(msg, &verdict.feedback),
                    self.audit.emit(entry),
                );

                let action = match notified {
                    Ok(()) => ActionTaken::DmSent,
                    Err(e) => {
                        tracing::warn!(
                            message_id = msg.message_id,
                            author = %msg.author_name,
                            error = %e,
                            "Could not notify author"
                        );
                        ActionTaken::DmFailed
                    }
                };

                ModerationRecord::for_message(
                    msg,
                    outcome,
                    Some(verdict.feedback),
                    action,
                    elapsed,
                )
            }
        };

        if let Err(e) = self.store.append(&record).await {
            tracing::error!(
                message_id = msg.message_id,
                error = %e,
                "Failed to persist moderation record"
            );
        }
    }

    /// Drop records past the retention window.
    pub async fn purge_older_than(&self, cutoff_days: u32) -> Result<u64, StoreError> {
        let deleted = self.store.purge_older_than(cutoff_days).await?;
        if deleted > 0 {
            tracing::info!(deleted, cutoff_days, "Cleaned up old moderation records");
        }
        Ok(deleted)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::Attachment;
    use crate::core::review::review_service::tests::ScriptedBackend;
    use crate::core::review::{ReviewConfig, RunState};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory store for testing
    #[derive(Default)]
    struct MockStore {
        records: Mutex<Vec<ModerationRecord>>,
        fail_appends: bool,
    }

    #[async_trait]
    impl ModerationStore for MockStore {
        async fn append(&self, record: &ModerationRecord) -> Result<(), StoreError> {
            if self.fail_appends {
                return Err(StoreError::StorageError("disk full".to_string()));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn purge_older_than(&self, _cutoff_days: u32) -> Result<u64, StoreError> {
            Ok(0)
        }

        async fn stats_for_user(
            &self,
            user_id: u64,
            _window_days: u32,
        ) -> Result<UserStats, StoreError> {
            let mut stats = UserStats::default();
            for record in self.records.lock().unwrap().iter() {
                if record.user_id == user_id {
                    stats.tally(record.outcome.as_str(), 1);
                }
            }
            Ok(stats)
        }

        async fn recent_records(&self, _limit: u32) -> Result<Vec<RecentRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingAudit {
        entries: Mutex<Vec<AuditEntry>>,
    }

    #[async_trait]
    impl AuditSink for RecordingAudit {
        async fn emit(&self, entry: AuditEntry) {
            self.entries.lock().unwrap().push(entry);
        }
    }

    #[derive(Default)]
    struct MockNotifier {
        reachable: bool,
        calls: Mutex<Vec<String>>,
    }

    impl MockNotifier {
        fn reachable() -> Self {
            Self {
                reachable: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl AuthorNotifier for MockNotifier {
        async fn notify_author(
            &self,
            _msg: &InboundMessage,
            feedback: &str,
        ) -> Result<(), NotifyError> {
            self.calls.lock().unwrap().push(feedback.to_string());
            if self.reachable {
                Ok(())
            } else {
                Err(NotifyError::Unreachable("DMs disabled".to_string()))
            }
        }
    }

    type TestPipeline = ModerationPipeline<ScriptedBackend, MockStore, RecordingAudit, MockNotifier>;

    fn pipeline(backend: ScriptedBackend, notifier: MockNotifier) -> TestPipeline {
        ModerationPipeline::new(
            ReviewService::new(backend, ReviewConfig::new("asst_test")),
            Arc::new(MockStore::default()),
            RecordingAudit::default(),
            notifier,
        )
    }

    fn message(content: &str) -> InboundMessage {
        InboundMessage {
            message_id: 42,
            author_id: 7,
            author_name: "narek".to_string(),
            channel_id: 99,
            guild_id: Some(1),
            content: content.to_string(),
            attachments: vec![Attachment {
                filename: "pic.png".to_string(),
                url: "https://cdn.example/pic.png".to_string(),
            }],
        }
    }

    fn records(p: &TestPipeline) -> Vec<ModerationRecord> {
        p.store.records.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_approved_message_skips_notification() {
        let p = pipeline(
            ScriptedBackend::replying(r#"{"status": "approve", "feedback": "Great post"}"#),
            MockNotifier::reachable(),
        );

        p.process_message(&message("Selling my bike")).await;

        let records = records(&p);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, Outcome::Reviewed(VerdictStatus::Approved));
        assert_eq!(records[0].action, ActionTaken::Approved);
        assert_eq!(records[0].feedback.as_deref(), Some("Great post"));
        assert!(p.notifier.calls.lock().unwrap().is_empty());

        let entries = p.audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].feedback, None);
        assert_eq!(entries[0].content, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_message_notifies_and_audits() {
        let p = pipeline(
            ScriptedBackend::replying(r#"{"status": "reject", "feedback": "No ads"}"#),
            MockNotifier::reachable(),
        );

        p.process_message(&message("Buy now!!!")).await;

        let records = records(&p);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome.as_str(), "reject");
        assert_eq!(records[0].action, ActionTaken::DmSent);
        assert_eq!(records[0].attachment_urls, vec!["https://cdn.example/pic.png"]);
        assert_eq!(*p.notifier.calls.lock().unwrap(), vec!["No ads".to_string()]);

        let entries = p.audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].feedback.as_deref(), Some("No ads"));
        assert_eq!(entries[0].content.as_deref(), Some("Buy now!!!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_needs_edit_with_unreachable_author_still_audits() {
        let p = pipeline(
            ScriptedBackend::replying(r#"{"status": "needs_edit", "feedback": "Add a price"}"#),
            MockNotifier::default(),
        );

        p.process_message(&message("Selling a couch")).await;

        let records = records(&p);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, ActionTaken::DmFailed);
        assert_eq!(records[0].outcome.as_str(), "needs_edit");

        let entries = p.audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].feedback.as_deref(), Some("Add a price"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_recorded_as_error() {
        let p = pipeline(
            ScriptedBackend::new(vec![RunState::Pending], vec![]),
            MockNotifier::reachable(),
        );

        p.process_message(&message("hello")).await;

        let records = records(&p);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, Outcome::Error);
        assert_eq!(records[0].action, ActionTaken::None);
        assert_eq!(records[0].feedback, None);
        assert_eq!(records[0].processing_time, Duration::from_secs(60));
        assert!(p.audit.entries.lock().unwrap().is_empty());
        assert!(p.notifier.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_error_recorded_with_zero_time() {
        let p = pipeline(ScriptedBackend::failing_submission(), MockNotifier::reachable());

        p.process_message(&message("hello")).await;

        let records = records(&p);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, Outcome::Error);
        assert_eq!(records[0].processing_time, Duration::ZERO);
        assert!(p.audit.entries.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_status_treated_as_not_approved() {
        let p = pipeline(
            ScriptedBackend::replying(r#"{"status": "escalate", "feedback": "Ask a mod"}"#),
            MockNotifier::reachable(),
        );

        p.process_message(&message("hmm")).await;

        let records = records(&p);
        assert_eq!(records[0].outcome.as_str(), "escalate");
        assert_eq!(records[0].action, ActionTaken::DmSent);
        let stats = p.store.stats_for_user(7, 30).await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.approved + stats.rejected + stats.needs_edit + stats.error, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_does_not_panic() {
        let p = ModerationPipeline::new(
            ReviewService::new(
                ScriptedBackend::replying(r#"{"status": "approve"}"#),
                ReviewConfig::new("asst_test"),
            ),
            Arc::new(MockStore {
                fail_appends: true,
                ..Default::default()
            }),
            RecordingAudit::default(),
            MockNotifier::reachable(),
        );

        p.process_message(&message("hello")).await;

        assert_eq!(p.audit.entries.lock().unwrap().len(), 1);
    }
}
