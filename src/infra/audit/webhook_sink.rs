use crate::core::audit::{chunk_feedback, style_for, AuditEntry, AuditSink};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;

const WEBHOOK_USERNAME: &str = "Moderation Bot";
const WEBHOOK_AVATAR_URL: &str = "https://cdn.discordapp.com/embed/avatars/0.png";
// Discord rejects webhook content above this many characters.
const MAX_CONTENT_CHARS: usize = 2000;

/// Posts audit entries to a Discord webhook.
pub struct WebhookAuditSink {
    client: Client,
    url: Option<String>,
}

impl WebhookAuditSink {
    /// With `url == None` every `emit` is a no-op.
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl AuditSink for WebhookAuditSink {
    async fn emit(&self, entry: AuditEntry) {
        let Some(url) = self.url.as_deref() else {
            return;
        };

        let payload = build_payload(&entry, Utc::now());

        match self.client.post(url).json(&payload).send().await {
            Ok(resp) if resp.status() == StatusCode::NO_CONTENT => {
                tracing::debug!(
                    message_id = entry.message_id,
                    "Webhook log sent successfully"
                );
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::error!(
                    message_id = entry.message_id,
                    status = %status,
                    body = %body,
                    "Webhook delivery failed"
                );
            }
            Err(e) => {
                tracing::error!(
                    message_id = entry.message_id,
                    error = %e,
                    "Error sending webhook log"
                );
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    content: Option<String>,
    embeds: Vec<WebhookEmbed>,
    username: &'static str,
    avatar_url: &'static str,
}

#[derive(Debug, Serialize)]
struct WebhookEmbed {
    title: String,
    color: u32,
    fields: Vec<EmbedField>,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

fn build_payload(entry: &AuditEntry, now: DateTime<Utc>) -> WebhookPayload {
    let style = style_for(entry.outcome.as_str());

    let mut fields = vec![
        EmbedField {
            name: "👤 User".to_string(),
            value: entry.author_name.clone(),
            inline: true,
        },
        EmbedField {
            name: "📍 Message ID".to_string(),
            value: format!("`{}`", entry.message_id),
            inline: true,
        },
        EmbedField {
            name: "📺 Channel".to_string(),
            value: format!("<#{}>", entry.channel_id),
            inline: true,
        },
    ];

    if let Some(feedback) = entry.feedback.as_deref() {
        fields.extend(chunk_feedback(feedback).into_iter().map(|chunk| EmbedField {
            name: chunk.name.to_string(),
            value: chunk.value,
            inline: false,
        }));
    }

    WebhookPayload {
        content: entry
            .content
            .as_deref()
            .map(|c| c.chars().take(MAX_CONTENT_CHARS).collect()),
        embeds: vec![WebhookEmbed {
            title: format!("{} {}", style.emoji, style.title),
            color: style.color,
            fields,
            timestamp: now.to_rfc3339(),
        }],
        username: WEBHOOK_USERNAME,
        avatar_url: WEBHOOK_AVATAR_URL,
    }
}
