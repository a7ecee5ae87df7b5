// Private-message notifier - tells authors why their message was flagged.

use crate::core::moderation::{AuthorNotifier, InboundMessage, NotifyError};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use ::serenity::http::Http;
use reqwest::{Client, StatusCode};
use std::sync::Arc;

const WARNING_TITLE: &str = "⚠️ Your message does not meet the channel guidelines";
const WARNING_COLOR: u32 = 0xFF0000;
// Discord rejects message content above this many characters.
const MAX_CONTENT_CHARS: usize = 2000;

pub struct DmNotifier {
    http: Arc<Http>,
    downloader: Client,
}

impl DmNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            downloader: Client::new(),
        }
    }

    /// Download every attachment we can; failures are logged and skipped.
    async fn fetch_attachments(&self, msg: &InboundMessage) -> Vec<serenity::CreateAttachment> {
        let mut files = Vec::new();
        for attachment in &msg.attachments {
            let response = match self.downloader.get(&attachment.url).send().await {
                Ok(resp) if resp.status() == StatusCode::OK => resp,
                Ok(resp) => {
                    tracing::warn!(
                        filename = %attachment.filename,
                        status = %resp.status(),
                        "Attachment download refused"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        filename = %attachment.filename,
                        error = %e,
                        "Error downloading attachment"
                    );
                    continue;
                }
            };

            match response.bytes().await {
                Ok(bytes) => {
                    tracing::debug!(filename = %attachment.filename, "Attachment downloaded");
                    files.push(serenity::CreateAttachment::bytes(
                        bytes.to_vec(),
                        attachment.filename.clone(),
                    ));
                }
                Err(e) => tracing::error!(
                    filename = %attachment.filename,
                    error = %e,
                    "Error reading attachment body"
                ),
            }
        }
        files
    }
}

#[async_trait]
impl AuthorNotifier for DmNotifier {
    async fn notify_author(
        &self,
        msg: &InboundMessage,
        feedback: &str,
    ) -> Result<(), NotifyError> {
        let embed = serenity::CreateEmbed::new()
            .title(WARNING_TITLE)
            .description(feedback)
            .color(WARNING_COLOR);

        let files = self.fetch_attachments(msg).await;
        let file_count = files.len();

        let content: String = msg.content.chars().take(MAX_CONTENT_CHARS).collect();
        let builder = serenity::CreateMessage::new()
            .content(content)
            .embed(embed)
            .add_files(files);

        let channel = serenity::UserId::new(msg.author_id)
            .create_dm_channel(&self.http)
            .await
            .map_err(classify)?;

        channel
            .send_message(&self.http, builder)
            .await
            .map_err(classify)?;

        tracing::info!(
            author = %msg.author_name,
            attachments = file_count,
            "DM sent successfully"
        );
        Ok(())
    }
}

fn classify(err: ::serenity::Error) -> NotifyError {
    let status = match &err {
        ::serenity::Error::Http(::serenity::http::HttpError::UnsuccessfulRequest(resp)) => {
            Some(resp.status_code.as_u16())
        }
        _ => None,
    };
    classify_status(status, err.to_string())
}

/// Discord answers 403 when the author has closed their DMs to us.
fn classify_status(status: Option<u16>, detail: String) -> NotifyError {
    match status {
        Some(403) => NotifyError::Unreachable(detail),
        _ => NotifyError::Delivery(detail),
    }
}
