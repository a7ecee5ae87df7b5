// Message listener glue - filters channel traffic and feeds the pipeline.

use crate::core::moderation::{Attachment, InboundMessage};
use crate::discord::Data;
use poise::serenity_prelude as serenity;

/// Run the moderation pipeline for a freshly posted message.
///
/// Bot messages and anything outside the watched channel are ignored.
pub async fn handle_new_message(data: &Data, msg: &serenity::Message) {
    if !should_review(msg.author.bot, msg.channel_id.get(), data.config.channel_id) {
        return;
    }

    let inbound = to_inbound(msg);
    data.pipeline.process_message(&inbound).await;
}

fn should_review(author_is_bot: bool, channel_id: u64, watched_channel: u64) -> bool {
    !author_is_bot && channel_id == watched_channel
}

pub fn to_inbound(msg: &serenity::Message) -> InboundMessage {
    InboundMessage {
        message_id: msg.id.get(),
        author_id: msg.author.id.get(),
        author_name: msg.author.name.clone(),
        channel_id: msg.channel_id.get(),
        guild_id: msg.guild_id.map(|id| id.get()),
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                filename: a.filename.clone(),
                url: a.url.clone(),
            })
            .collect(),
    }
}
