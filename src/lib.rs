pub mod commands;
pub mod config;
pub mod db;
pub mod discord_text;
pub mod error;
pub mod llm;
pub mod safety;
pub mod tools;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub http_client: reqwest::Client,
    /// Primary chat model (tool calling).
    pub llm_client: std::sync::Arc<llm::LlmClient>,
    /// Guard model backing the safety gate.
    pub guard_client: std::sync::Arc<llm::LlmClient>,
    /// Vision model backing the imageask tool.
    pub vision_client: std::sync::Arc<llm::LlmClient>,
    pub db: db::Database,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
