use crate::discord_text::split_text;
use crate::error::UserFacingError;
use crate::llm::agent::Agent;
use crate::llm::transcript::{ConversationState, Message};
use crate::safety::SafetyGate;
use crate::tools::builtin::{ImageAskTool, LuauEvalTool, ScrapeTool, SearchTool};
use crate::tools::ToolRegistry;
use crate::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use serenity::{CreateAllowedMentions, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const TEXT_ATTACHMENT_PREFIX: &str = "\n\nText Attachments:\n\n";
const IMAGE_ATTACHMENT_PREFIX: &str =
    "\n\nImage attachments (please use your imageask tool call to describe it):\n\n";
const UNSAFE_CHAT_MESSAGE: &str = "The messages in this chat seem to be inappropriate. \
    Please try a different prompt or execute /chatreset";

/// Chat with RoTunes.
#[poise::command(slash_command)]
pub async fn chat(
    ctx: Context<'_>,
    #[description = "The message to send to RoTunes."] message: String,
    #[description = "An attachment to send to RoTunes."] attachment1: Option<serenity::Attachment>,
    #[description = "An attachment to send to RoTunes."] attachment2: Option<serenity::Attachment>,
    #[description = "An attachment to send to RoTunes."] attachment3: Option<serenity::Attachment>,
    #[description = "An attachment to send to RoTunes."] attachment4: Option<serenity::Attachment>,
    #[description = "An attachment to send to RoTunes."] attachment5: Option<serenity::Attachment>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let user_id = ctx.author().id.to_string();
    info!("Handling /chat from user {}", user_id);

    let attachments: Vec<serenity::Attachment> =
        [attachment1, attachment2, attachment3, attachment4, attachment5]
            .into_iter()
            .flatten()
            .collect();
    let (text_attachments, image_attachments) =
        download_attachments(&data.http_client, &attachments).await;

    let mut state = data
        .db
        .load_chat_state(&user_id)?
        .unwrap_or_else(|| ConversationState::new(&user_id, &data.config.system_prompt));

    let mut new_message = message;
    if !text_attachments.is_empty() {
        new_message.push_str(TEXT_ATTACHMENT_PREFIX);
        new_message.push_str(&text_attachments.join("\n\n"));
    }
    if !image_attachments.is_empty() {
        let names = state.register_images(image_attachments);
        new_message.push_str(IMAGE_ATTACHMENT_PREFIX);
        new_message.push_str(&names.join(", "));
    }
    state.transcript.push(Message::user(new_message));

    let gate = SafetyGate::new(
        data.guard_client.clone(),
        data.config.safety_exempt_codes.clone(),
    );

    // Screen the request before any model round runs.
    if gate.screen_transcript(&state.transcript).await? {
        return Err(UserFacingError::new(UNSAFE_CHAT_MESSAGE).into());
    }

    let registry = Arc::new(build_registry(data, &state));
    let agent = Agent::new(
        data.llm_client.clone(),
        registry,
        data.config.agent_max_rounds,
    );
    let outcome = agent.run(state.transcript).await?;
    state.transcript = outcome.transcript;

    // Screen again after the exchange: tool output (web content, executed
    // code) is untrusted until the guard has seen it.
    if gate.screen_transcript(&state.transcript).await? {
        return Err(UserFacingError::new(UNSAFE_CHAT_MESSAGE).into());
    }

    data.db.save_chat_state(&state)?;

    send_chunked_embeds(&ctx, &outcome.answer.content).await?;
    Ok(())
}

/// Reset the chat with RoTunes.
#[poise::command(slash_command)]
pub async fn chatreset(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();
    let removed = ctx.data().db.reset_chat_state(&user_id)?;

    let content = if removed {
        "Your chat data has been reset."
    } else {
        "You already had no chat data."
    };
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Download attachments, sorting them into text contents and raw image
/// bytes. Failures are logged and skipped; one bad attachment should not
/// sink the exchange.
async fn download_attachments(
    http: &reqwest::Client,
    attachments: &[serenity::Attachment],
) -> (Vec<String>, Vec<Vec<u8>>) {
    let mut texts = Vec::new();
    let mut images = Vec::new();

    for attachment in attachments {
        let response = match http.get(&attachment.url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(
                    "Failed to fetch attachment {}: status {}",
                    attachment.filename,
                    response.status()
                );
                continue;
            }
            Err(error) => {
                warn!("Error fetching attachment {}: {}", attachment.filename, error);
                continue;
            }
        };

        let content_type = attachment.content_type.as_deref().unwrap_or_default();
        if content_type.contains("text") || content_type.contains("; charset=utf-8") {
            match response.text().await {
                Ok(text) => texts.push(text.trim().to_string()),
                Err(error) => warn!("Error reading attachment {}: {}", attachment.filename, error),
            }
        } else if content_type.contains("image") {
            match response.bytes().await {
                Ok(bytes) => images.push(bytes.to_vec()),
                Err(error) => warn!("Error reading attachment {}: {}", attachment.filename, error),
            }
        }
    }

    (texts, images)
}

/// Assemble the capability registry for one exchange. The imageask tool is
/// bound to this conversation's image set; eval is only offered when Roblox
/// Open Cloud credentials are configured.
fn build_registry(data: &Data, state: &ConversationState) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(SearchTool {
        http: data.http_client.clone(),
        searx_url: data.config.searx_url.clone(),
        result_count: data.config.search_results_amount,
    }));
    registry.register(Arc::new(ScrapeTool {
        http: data.http_client.clone(),
        timeout: Duration::from_secs(data.config.scrape_timeout_secs),
    }));
    registry.register(Arc::new(ImageAskTool {
        llm: data.vision_client.clone(),
        images: state.images.clone(),
    }));

    if let (Some(api_key), Some(universe_id), Some(place_id)) = (
        &data.config.roblox_api_key,
        data.config.roblox_universe_id,
        data.config.roblox_place_id,
    ) {
        registry.register(Arc::new(LuauEvalTool {
            http: data.http_client.clone(),
            api_key: api_key.clone(),
            universe_id,
            place_id,
            poll_interval: Duration::from_secs(data.config.luau_poll_interval_secs),
        }));
    } else {
        warn!("Roblox Open Cloud credentials not configured; eval tool disabled");
    }

    registry
}

/// Deliver a long answer as a sequence of embeds, one per chunk.
async fn send_chunked_embeds(ctx: &Context<'_>, content: &str) -> Result<(), Error> {
    let chunks = split_text(content, ctx.data().config.response_chunk_limit);
    if chunks.is_empty() {
        ctx.say("...").await?;
        return Ok(());
    }

    let bot = ctx.serenity_context().cache.current_user().clone();
    let author = ctx.author();

    for chunk in chunks {
        let embed = CreateEmbed::new()
            .author(CreateEmbedAuthor::new(bot.name.clone()).icon_url(bot.face()))
            .title("Response")
            .description(chunk)
            .timestamp(serenity::Timestamp::now())
            .footer(
                CreateEmbedFooter::new(
                    author.global_name.clone().unwrap_or_else(|| author.name.clone()),
                )
                .icon_url(author.face()),
            )
            .color(0x9A2D7D);

        ctx.send(
            poise::CreateReply::default()
                .embed(embed)
                .allowed_mentions(CreateAllowedMentions::new()),
        )
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_points_at_the_reset_command() {
        assert!(UNSAFE_CHAT_MESSAGE.contains("execute /chatreset"));
    }
}
