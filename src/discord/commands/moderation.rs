// Admin commands for the moderation log.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call the core store
// 3. Format the response
//
// This layer is THIN - no business logic, just translation.

use crate::config::Config;
use crate::core::audit::style_for;
use crate::core::moderation::{ModerationPipeline, ModerationStore};
use crate::discord::moderation::DmNotifier;
use crate::infra::ai::OpenAiAssistantsClient;
use crate::infra::audit::WebhookAuditSink;
use crate::infra::moderation::SqliteModerationStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

const DEFAULT_STATS_DAYS: u32 = 30;
const MAX_STATS_DAYS: u32 = 3650;
const DEFAULT_LOG_LIMIT: u32 = 10;
// One embed holds at most 25 fields.
const MAX_LOG_LIMIT: u32 = 25;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub type Pipeline =
    ModerationPipeline<OpenAiAssistantsClient, SqliteModerationStore, WebhookAuditSink, DmNotifier>;

/// Data that's shared across all commands and the event handler.
pub struct Data {
    pub config: Arc<Config>,
    pub store: Arc<SqliteModerationStore>,
    pub pipeline: Arc<Pipeline>,
}

/// Show a user's moderation statistics.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn stats(
    ctx: Context<'_>,
    #[description = "User to check (defaults to you)"] user: Option<serenity::User>,
    #[description = "Number of days to look back (default 30, max 3650)"] days: Option<u32>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let days = clamp_stats_days(days);

    let stats = ctx
        .data()
        .store
        .stats_for_user(target.id.get(), days)
        .await?;

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("📊 Stats for {}", target.name))
        .description(format!("Last {} days", days))
        .color(0x00ff00)
        .field("📝 Total messages", stats.total.to_string(), true)
        .field("✅ Approved", stats.approved.to_string(), true)
        .field("❌ Rejected", stats.rejected.to_string(), true)
        .field("⚠️ Needs edit", stats.needs_edit.to_string(), true)
        .field("🔴 Errors", stats.error.to_string(), true);

    if let Some(rate) = stats.approval_rate() {
        embed = embed.field("📈 Approval rate", format!("{:.1}%", rate), true);
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Show the most recent moderation log entries.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn logs(
    ctx: Context<'_>,
    #[description = "Number of entries (default 10, max 25)"] limit: Option<u32>,
) -> Result<(), Error> {
    let limit = clamp_log_limit(limit);
    let records = ctx.data().store.recent_records(limit).await?;

    if records.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("📋 No logs yet")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("📋 Recent activity")
        .color(0x0099ff);

    for record in records {
        let style = style_for(&record.status);
        let value = if record.preview.is_empty() {
            format!("{}\n*No content*", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))
        } else {
            format!(
                "{}\n{}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                record.preview
            )
        };
        embed = embed.field(format!("{} {}", style.emoji, record.username), value, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

fn clamp_stats_days(days: Option<u32>) -> u32 {
    days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, MAX_STATS_DAYS)
}

fn clamp_log_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
}
