use poise::serenity_prelude as serenity;
use rotunes::commands::chat;
use rotunes::config::Config;
use rotunes::error::UserFacingError;
use rotunes::{Data, Error};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![chat::chat(), chat::chatreset()],
            on_error: |err| Box::pin(handle_error(err)),
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready!");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                // Set bot status
                ctx.set_activity(Some(serenity::ActivityData::custom(&config.status_message)));

                let llm_client = Arc::new(rotunes::llm::LlmClient::new(
                    &config.llama_url,
                    config.llama_api_key.as_deref(),
                    &config.chat_model,
                ));
                let guard_client = Arc::new(rotunes::llm::LlmClient::new(
                    &config.llama_url,
                    config.llama_api_key.as_deref(),
                    &config.guard_model,
                ));
                let vision_client = Arc::new(rotunes::llm::LlmClient::new(
                    &config.llama_url,
                    config.llama_api_key.as_deref(),
                    &config.vision_model,
                ));

                let db = rotunes::db::Database::new(&config)?;
                db.execute_init()?;

                Ok(Data {
                    config,
                    http_client: reqwest::Client::new(),
                    llm_client,
                    guard_client,
                    vision_client,
                    db,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

/// Safety rejections carry a message that is shown to the user verbatim;
/// everything else is reported generically.
async fn handle_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            if let Some(user_error) = error.downcast_ref::<UserFacingError>() {
                let _ = ctx
                    .send(
                        poise::CreateReply::default()
                            .content(user_error.to_string())
                            .ephemeral(true),
                    )
                    .await;
            } else {
                error!("Command error in {}: {}", ctx.command().name, error);
                let _ = ctx.say("Something went wrong. Please try again later.").await;
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}
