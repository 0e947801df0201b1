use async_trait::async_trait;
use serde_json::Value;

pub mod agent;
pub mod client;
pub mod transcript;

pub use client::LlmClient;
pub use transcript::{ConversationState, Message, Role, ToolCall};

/// Seam between the engine and the inference endpoint: one non-streaming
/// exchange producing a single new assistant message.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, transcript: &[Message], tools: &[Value]) -> anyhow::Result<Message>;
}
