use crate::llm::transcript::{Message, Role, ToolCall};
use crate::llm::ChatModel;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
        ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;

/// Thin client over one OpenAI-compatible model endpoint. One instance per
/// model role (chat, guard, vision).
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: &str, api_key: Option<&str>, model: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key.unwrap_or("unused"));

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    /// Answer a question about an image by shipping it inline as a base64
    /// data URL. Used by the imageask tool against a vision-capable model.
    pub async fn ask_about_image(&self, question: &str, image: &[u8]) -> anyhow::Result<String> {
        let data_url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(image)
        );

        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(question)
            .build()?;
        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(ImageUrlArgs::default().url(data_url).build()?)
            .build()?;

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(vec![text_part.into(), image_part.into()])
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![user_message.into()])
            .build()?;

        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, transcript: &[Message], tools: &[Value]) -> anyhow::Result<Message> {
        let messages = to_wire(transcript)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages);
        if !tools.is_empty() {
            let definitions: Vec<ChatCompletionTool> = tools
                .iter()
                .map(|def| serde_json::from_value(def.clone()))
                .collect::<Result<_, _>>()?;
            builder.tools(definitions);
        }
        let request = builder.build()?;

        let response = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?;

        let content = choice.message.content.unwrap_or_default();
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments: Value = if call.function.arguments.trim().is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(&call.function.arguments)?
                };
                Ok(ToolCall::new(call.id, call.function.name, arguments))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if tool_calls.is_empty() {
            Ok(Message::assistant(content))
        } else {
            Ok(Message::assistant_with_calls(content, tool_calls))
        }
    }
}

/// Convert an engine transcript to the OpenAI request message shape.
pub fn to_wire(transcript: &[Message]) -> anyhow::Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages = Vec::with_capacity(transcript.len());

    for entry in transcript {
        let message: ChatCompletionRequestMessage = match entry.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(entry.content.clone())
                .build()?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(entry.content.clone())
                .build()?
                .into(),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if entry.has_tool_calls() {
                    let calls: Vec<ChatCompletionMessageToolCall> = entry
                        .tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.to_string(),
                            },
                        })
                        .collect();
                    builder.tool_calls(calls);
                }
                if !entry.content.is_empty() {
                    builder.content(entry.content.clone());
                }
                builder.build()?.into()
            }
            Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                .content(entry.content.clone())
                .tool_call_id(entry.tool_call_id.clone().unwrap_or_default())
                .build()?
                .into(),
        };
        messages.push(message);
    }

    Ok(messages)
}
