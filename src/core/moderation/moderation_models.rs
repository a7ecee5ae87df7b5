// Moderation domain models - inbound messages and the records kept about them.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts serenity messages into `InboundMessage`.

use crate::core::review::VerdictStatus;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Max characters of content shown in recent-log listings.
pub const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

/// A channel message, stripped down to what the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub channel_id: u64,
    /// `None` for messages outside a server.
    pub guild_id: Option<u64>,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

/// Final classification of a processed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reviewed(VerdictStatus),
    /// The reviewer produced no verdict (any `ReviewFailure`).
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Reviewed(status) => status.as_str(),
            Self::Error => "error",
        }
    }

    pub fn from_stored(raw: &str) -> Self {
        match raw {
            "error" => Self::Error,
            other => Self::Reviewed(VerdictStatus::parse(other)),
        }
    }
}

/// What the pipeline did about a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTaken {
    Approved,
    DmSent,
    DmFailed,
    None,
}

impl ActionTaken {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::DmSent => "DM:sent",
            Self::DmFailed => "DM:failed",
            Self::None => "none",
        }
    }
}

/// One row of the moderation log. Written once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationRecord {
    pub message_id: u64,
    pub user_id: u64,
    pub username: String,
    pub channel_id: u64,
    pub server_id: u64,
    pub content: String,
    pub attachment_urls: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    pub feedback: Option<String>,
    pub action: ActionTaken,
    pub processing_time: Duration,
}

impl ModerationRecord {
    /// Record for `msg`, stamped with the current time.
    pub fn for_message(
        msg: &InboundMessage,
        outcome: Outcome,
        feedback: Option<String>,
        action: ActionTaken,
        processing_time: Duration,
    ) -> Self {
        Self {
            message_id: msg.message_id,
            user_id: msg.author_id,
            username: msg.author_name.clone(),
            channel_id: msg.channel_id,
            server_id: msg.guild_id.unwrap_or(0),
            content: msg.content.clone(),
            attachment_urls: msg.attachments.iter().map(|a| a.url.clone()).collect(),
            timestamp: Utc::now(),
            outcome,
            feedback: feedback.filter(|f| !f.is_empty()),
            action,
            processing_time,
        }
    }
}

/// Per-status counts for one user over a time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total: u64,
    pub approved: u64,
    pub rejected: u64,
    pub needs_edit: u64,
    pub error: u64,
}

impl UserStats {
    /// Add `count` records with the given stored status.
    ///
    /// Unrecognized statuses only count towards `total`.
    pub fn tally(&mut self, status: &str, count: u64) {
        match Outcome::from_stored(status) {
            Outcome::Reviewed(VerdictStatus::Approved) => self.approved += count,
            Outcome::Reviewed(VerdictStatus::Rejected) => self.rejected += count,
            Outcome::Reviewed(VerdictStatus::NeedsEdit) => self.needs_edit += count,
            Outcome::Error => self.error += count,
            Outcome::Reviewed(VerdictStatus::Unrecognized(_)) => {}
        }
        self.total += count;
    }

    /// Approved share in percent, `None` when there is nothing to rate.
    pub fn approval_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.approved as f64 / self.total as f64 * 100.0)
        }
    }
}

/// A row of the recent-activity listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentRecord {
    pub username: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Content cut to `PREVIEW_CHARS` characters, "..." appended when cut.
    pub preview: String,
}

pub fn preview_content(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let mut cut: String = content.chars().take(PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        content.to_string()
    }
}
