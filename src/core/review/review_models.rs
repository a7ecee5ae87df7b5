// Review domain models - the assistant run protocol and its verdicts.
//
// Pure data, no HTTP here. The infra layer maps wire responses onto these.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Tuning for one review: sampling parameters plus the polling ceiling.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub assistant_id: String,
    pub temperature: f64,
    pub top_p: f64,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl ReviewConfig {
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            temperature: 0.4,
            top_p: 0.8,
            poll_interval: Duration::from_secs(2),
            max_polls: 30,
        }
    }
}

/// Identifiers of one in-flight review (assistant thread + run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewJob {
    pub thread_id: String,
    pub run_id: String,
}

/// Where a run stands after one status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// queued, in_progress, cancelling, requires_action, or anything new.
    Pending,
    Completed,
    /// Terminal failure; carries the raw status for the logs.
    Failed(String),
}

impl RunState {
    pub fn from_api_status(status: &str) -> Self {
        match status {
            "completed" => Self::Completed,
            "failed" | "cancelled" | "expired" | "incomplete" => Self::Failed(status.to_string()),
            _ => Self::Pending,
        }
    }
}

/// A message on the review thread, flattened to its text.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadMessage {
    pub role: String,
    pub created_at: i64,
    pub text: String,
}

impl ThreadMessage {
    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictStatus {
    Approved,
    Rejected,
    NeedsEdit,
    /// Anything the assistant made up. Kept verbatim.
    Unrecognized(String),
}

/// Stored form of an assistant verdict that literally says "error". The bare
/// word is reserved for reviews that produced no verdict at all.
pub const ASSISTANT_ERROR_STATUS: &str = "assistant_error";

impl VerdictStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "approve" | "approved" => Self::Approved,
            "reject" | "rejected" => Self::Rejected,
            "needs_edit" => Self::NeedsEdit,
            "error" => Self::Unrecognized(ASSISTANT_ERROR_STATUS.to_string()),
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    /// The string persisted in `ai_status`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Approved => "approve",
            Self::Rejected => "reject",
            Self::NeedsEdit => "needs_edit",
            Self::Unrecognized(raw) => raw,
        }
    }
}

/// The assistant's judgment of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub feedback: String,
}

#[derive(Deserialize)]
struct RawVerdict {
    status: String,
    #[serde(default)]
    feedback: Option<String>,
}

impl Verdict {
    /// Parse an assistant reply body of the form `{"status": ..., "feedback": ...}`.
    ///
    /// A surrounding Markdown code fence is tolerated.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let raw: RawVerdict = serde_json::from_str(strip_code_fence(body))?;
        Ok(Self {
            status: VerdictStatus::parse(&raw.status),
            feedback: raw.feedback.unwrap_or_default(),
        })
    }
}

fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Optional language tag, on its own line or glued to the object.
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.trim()
}

/// Why a review produced no verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewFailure {
    #[error("submission_error")]
    SubmissionError,
    #[error("run_failed")]
    RunFailed,
    #[error("timeout")]
    Timeout,
    #[error("unparseable")]
    Unparseable,
    /// Network or decode error after the run was created.
    #[error("transport_error")]
    Transport,
}

/// Result of `ReviewService::submit_for_review`, with the wall-clock time it took.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub result: Result<Verdict, ReviewFailure>,
    pub elapsed: Duration,
}

/// Errors raised by a review backend. The service turns these into `ReviewFailure`s.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Reviewer returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Reviewer request failed: {0}")]
    Transport(String),

    #[error("Unexpected reviewer response: {0}")]
    Protocol(String),
}
