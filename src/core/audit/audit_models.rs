// Audit domain models - what gets broadcast for each reviewed message,
// and how each outcome is presented.

use crate::core::moderation::Outcome;

/// Field values above this size are split into chunks.
pub const FEEDBACK_FIELD_LIMIT: usize = 1024;
pub const FEEDBACK_CHUNK_CHARS: usize = 1000;
/// Chunks past this count are dropped.
pub const MAX_FEEDBACK_CHUNKS: usize = 3;

pub const FEEDBACK_FIELD_NAME: &str = "💬 AI Feedback";
pub const FEEDBACK_CONTINUED_NAME: &str = "💬 AI Feedback (continued)";

/// One audit notification.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub message_id: u64,
    pub channel_id: u64,
    pub author_name: String,
    pub outcome: Outcome,
    pub feedback: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusStyle {
    pub emoji: &'static str,
    pub color: u32,
    pub title: &'static str,
}

const STATUS_STYLES: &[(&str, StatusStyle)] = &[
    (
        "approve",
        StatusStyle {
            emoji: "✅",
            color: 0x00ff00,
            title: "Approved",
        },
    ),
    (
        "reject",
        StatusStyle {
            emoji: "❌",
            color: 0xff0000,
            title: "Rejected",
        },
    ),
    (
        "needs_edit",
        StatusStyle {
            emoji: "⚠️",
            color: 0xffaa00,
            title: "Needs edit",
        },
    ),
    (
        "error",
        StatusStyle {
            emoji: "🔴",
            color: 0x800080,
            title: "Error",
        },
    ),
];

const UNKNOWN_STYLE: StatusStyle = StatusStyle {
    emoji: "❓",
    color: 0x808080,
    title: "Unknown",
};

/// Presentation for a persisted status string; unknown statuses get the grey style.
pub fn style_for(status: &str) -> StatusStyle {
    STATUS_STYLES
        .iter()
        .find(|(key, _)| *key == status)
        .map(|(_, style)| *style)
        .unwrap_or(UNKNOWN_STYLE)
}

/// A named block of feedback text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackField {
    pub name: &'static str,
    pub value: String,
}

/// Split feedback into embed-sized fields.
///
/// Feedback up to `FEEDBACK_FIELD_LIMIT` characters stays in one field.
/// Longer feedback is cut into `FEEDBACK_CHUNK_CHARS` pieces, at most
/// `MAX_FEEDBACK_CHUNKS` of them; the rest is dropped.
pub fn chunk_feedback(feedback: &str) -> Vec<FeedbackField> {
    if feedback.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = feedback.chars().collect();
    if chars.len() <= FEEDBACK_FIELD_LIMIT {
        return vec![FeedbackField {
            name: FEEDBACK_FIELD_NAME,
            value: feedback.to_string(),
        }];
    }

    chars
        .chunks(FEEDBACK_CHUNK_CHARS)
        .take(MAX_FEEDBACK_CHUNKS)
        .enumerate()
        .map(|(i, chunk)| FeedbackField {
            name: if i == 0 {
                FEEDBACK_FIELD_NAME
            } else {
                FEEDBACK_CONTINUED_NAME
            },
            value: chunk.iter().collect(),
        })
        .collect()
}
