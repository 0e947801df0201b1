use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub discord_token: String,
    pub llama_url: String,
    pub llama_api_key: Option<String>,
    pub chat_model: String,
    pub guard_model: String,
    pub vision_model: String,
    pub database_url: String,
    pub system_prompt: String,
    pub status_message: String,

    // Agent settings
    pub agent_max_rounds: usize,
    pub response_chunk_limit: usize,

    // Safety gate
    pub safety_exempt_codes: Vec<String>,

    // Tool backends
    pub roblox_api_key: Option<String>,
    pub roblox_universe_id: Option<u64>,
    pub roblox_place_id: Option<u64>,
    pub luau_poll_interval_secs: u64,
    pub searx_url: String,
    pub search_results_amount: usize,
    pub scrape_timeout_secs: u64,
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are RoTunes, a helpful AI powered discord bot made by the Rodevs. \
You are here to help people with their problems (more specifically roblox issues). \
Your own website is https://www.rodevs.com/. \
Please make sure to use your tools and function calls whenever useful. \
You can search the internet, scrape websites, and execute luau (Roblox) code.";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            llama_url: env::var("LLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
            llama_api_key: env::var("LLAMA_API_KEY").ok(),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "qwen2.5:14b".to_string()),
            guard_model: env::var("GUARD_MODEL")
                .unwrap_or_else(|_| "llama-guard3:8b".to_string()),
            vision_model: env::var("VISION_MODEL")
                .unwrap_or_else(|_| "llama3.2-vision:11b".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/rotunes.db".to_string()),
            system_prompt: env::var("SYSTEM_PROMPT")
                .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string()),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Ready to assist!".to_string()),
            agent_max_rounds: env::var("AGENT_MAX_ROUNDS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            response_chunk_limit: env::var("RESPONSE_CHUNK_LIMIT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .unwrap_or(4000)
                .min(DISCORD_EMBED_LIMIT),
            safety_exempt_codes: env::var("SAFETY_EXEMPT_CODES")
                .unwrap_or_else(|_| "S14".to_string())
                .split(',')
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect(),
            roblox_api_key: env::var("ROBLOX_API_KEY").ok(),
            roblox_universe_id: env::var("ROBLOX_UNIVERSE_ID")
                .ok()
                .and_then(|id| id.parse().ok()),
            roblox_place_id: env::var("ROBLOX_PLACE_ID")
                .ok()
                .and_then(|id| id.parse().ok()),
            luau_poll_interval_secs: env::var("LUAU_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            searx_url: env::var("SEARX_URL")
                .unwrap_or_else(|_| "https://searx.clowdertech.com".to_string()),
            search_results_amount: env::var("SEARCH_RESULTS_AMOUNT")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            scrape_timeout_secs: env::var("SCRAPE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("llama_url", &self.llama_url)
            .field(
                "llama_api_key",
                &self.llama_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("chat_model", &self.chat_model)
            .field("guard_model", &self.guard_model)
            .field("vision_model", &self.vision_model)
            .field("database_url", &self.database_url)
            .field("system_prompt", &self.system_prompt)
            .field("status_message", &self.status_message)
            .field("agent_max_rounds", &self.agent_max_rounds)
            .field("response_chunk_limit", &self.response_chunk_limit)
            .field("safety_exempt_codes", &self.safety_exempt_codes)
            .field(
                "roblox_api_key",
                &self.roblox_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("roblox_universe_id", &self.roblox_universe_id)
            .field("roblox_place_id", &self.roblox_place_id)
            .field("luau_poll_interval_secs", &self.luau_poll_interval_secs)
            .field("searx_url", &self.searx_url)
            .field("search_results_amount", &self.search_results_amount)
            .field("scrape_timeout_secs", &self.scrape_timeout_secs)
            .finish()
    }
}

/// Embed description limit is 4096 characters
pub const DISCORD_EMBED_LIMIT: usize = 4096;
