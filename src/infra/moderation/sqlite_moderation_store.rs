// SQLite-backed moderation log.
//
// Tables:
// - message_logs: one append-only row per processed message
//
// Timestamps are stored as RFC 3339 UTC text with fixed microsecond precision
// so string comparison orders them chronologically.

use crate::core::moderation::{
    preview_content, ModerationRecord, ModerationStore, RecentRecord, StoreError, UserStats,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::time::Duration;

pub struct SqliteModerationStore {
    pool: Pool<Sqlite>,
}

impl SqliteModerationStore {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::StorageError(e.to_string()))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::StorageError(e.to_string()))?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(path = %path.display(), "Moderation database initialized");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS message_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                username TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                server_id TEXT NOT NULL,
                original_content TEXT,
                attachment_urls TEXT,
                timestamp TEXT NOT NULL,
                ai_status TEXT,
                ai_feedback TEXT,
                action_taken TEXT,
                processing_time REAL
            );
            CREATE INDEX IF NOT EXISTS idx_message_logs_user_time
                ON message_logs(user_id, timestamp);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        Ok(())
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Lower bound of a look-back window of `days`. Windows reaching past the
/// epoch (or past chrono's range) cover every stored record.
fn window_start(now: DateTime<Utc>, days: u32) -> String {
    let start = now
        .checked_sub_signed(chrono::Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .max(DateTime::<Utc>::UNIX_EPOCH);
    format_timestamp(start)
}

#[async_trait]
impl ModerationStore for SqliteModerationStore {
    async fn append(&self, record: &ModerationRecord) -> Result<(), StoreError> {
        let attachments_json = serde_json::to_string(&record.attachment_urls)
            .map_err(|e| StoreError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO message_logs (
                message_id, user_id, username, channel_id, server_id,
                original_content, attachment_urls, timestamp, ai_status,
                ai_feedback, action_taken, processing_time
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.message_id.to_string())
        .bind(record.user_id.to_string())
        .bind(&record.username)
        .bind(record.channel_id.to_string())
        .bind(record.server_id.to_string())
        .bind(&record.content)
        .bind(attachments_json)
        .bind(format_timestamp(record.timestamp))
        .bind(record.outcome.as_str())
        .bind(record.feedback.as_deref())
        .bind(record.action.as_str())
        .bind(record.processing_time.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn purge_older_than(&self, cutoff_days: u32) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM message_logs WHERE timestamp < ?")
            .bind(window_start(Utc::now(), cutoff_days))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::StorageError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn stats_for_user(
        &self,
        user_id: u64,
        window_days: u32,
    ) -> Result<UserStats, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT ai_status, COUNT(*) AS count
            FROM message_logs
            WHERE user_id = ? AND timestamp >= ?
            GROUP BY ai_status
            "#,
        )
        .bind(user_id.to_string())
        .bind(window_start(Utc::now(), window_days))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        let mut stats = UserStats::default();
        for row in rows {
            let status: Option<String> = row.get("ai_status");
            let count: i64 = row.get("count");
            stats.tally(status.as_deref().unwrap_or_default(), count as u64);
        }
        Ok(stats)
    }

    async fn recent_records(&self, limit: u32) -> Result<Vec<RecentRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT username, ai_status, timestamp, original_content
            FROM message_logs
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp_str: String = row.get("timestamp");
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::StorageError(e.to_string()))?;
            let content: Option<String> = row.get("original_content");

            records.push(RecentRecord {
                username: row.get("username"),
                status: row
                    .get::<Option<String>, _>("ai_status")
                    .unwrap_or_default(),
                timestamp,
                preview: preview_content(content.as_deref().unwrap_or_default()),
            });
        }
        Ok(records)
    }
}
