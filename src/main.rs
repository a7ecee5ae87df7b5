// This is the entry point of the moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (database, HTTP APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

mod config;
mod telemetry;

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::config::Config;
use crate::core::moderation::ModerationPipeline;
use crate::core::review::{ReviewConfig, ReviewService};
use crate::discord::moderation::events as moderation_events;
use crate::discord::moderation::DmNotifier;
use crate::discord::{Data, Error};
use crate::infra::ai::OpenAiAssistantsClient;
use crate::infra::audit::WebhookAuditSink;
use crate::infra::moderation::SqliteModerationStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        moderation_events::handle_new_message(data, new_message).await;
    }

    Ok(())
}

/// Framework error hook: refuse non-admins politely, log everything else.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::MissingUserPermissions { ctx, .. } => {
            let reply = poise::CreateReply::default()
                .content("❌ Only administrators can use this command.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                tracing::warn!("Failed to send permission refusal: {}", e);
            }
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(command = %ctx.command().name, "Slash command error: {}", error);
            let reply = poise::CreateReply::default()
                .content("❌ Something went wrong while running this command.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                tracing::warn!("Failed to send command error reply: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling framework error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Missing or malformed settings abort startup here.
    let config = Arc::new(Config::from_env().context("Invalid configuration")?);

    // Initialize logging so we can see what's happening
    telemetry::init(&config)?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let store = Arc::new(
        SqliteModerationStore::connect(&config.db_file)
            .await
            .context("Failed to initialize moderation database")?,
    );

    let review_client =
        OpenAiAssistantsClient::new(&config.openai_api_key, config.openai_base_url.clone())
            .context("Failed to create OpenAI client")?;
    let reviewer = ReviewService::new(review_client, ReviewConfig::new(config.assistant_id.clone()));

    if config.webhook_url.is_none() {
        tracing::info!("WEBHOOK_URL not set, audit logging disabled");
    }
    let audit = WebhookAuditSink::new(config.webhook_url.clone());

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS;

    let setup_config = Arc::clone(&config);
    let setup_store = Arc::clone(&store);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::moderation::stats(),
                discord::commands::moderation::logs(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(
                    user = %ready.user.name,
                    channel_id = setup_config.channel_id,
                    "Bot is ready, watching channel"
                );

                // The notifier needs the gateway's HTTP client, so the pipeline is built here.
                let pipeline = Arc::new(ModerationPipeline::new(
                    reviewer,
                    Arc::clone(&setup_store),
                    audit,
                    DmNotifier::new(ctx.http.clone()),
                ));

                match pipeline.purge_older_than(setup_config.retention_days).await {
                    Ok(deleted) => tracing::info!(deleted, "Startup log cleanup finished"),
                    Err(e) => tracing::error!("Startup log cleanup failed: {}", e),
                }

                match poise::builtins::register_globally(ctx, &framework.options().commands).await
                {
                    Ok(()) => tracing::info!(
                        count = framework.options().commands.len(),
                        "Synced slash commands"
                    ),
                    Err(e) => tracing::error!("Failed to sync commands: {}", e),
                }

                Ok(Data {
                    config: setup_config,
                    store: setup_store,
                    pipeline,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
