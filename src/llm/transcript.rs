use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of one transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw argument object as emitted by the model. Argument values are
    /// positional; `argument_values` yields them in insertion order.
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// The call's argument values as strings, in the order the model emitted
    /// them. Non-string values are coerced via their JSON rendering.
    pub fn argument_values(&self) -> Vec<String> {
        match &self.arguments {
            Value::Object(map) => map.values().map(coerce_to_string).collect(),
            Value::Null => Vec::new(),
            other => vec![coerce_to_string(other)],
        }
    }
}

fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One transcript entry. Only assistant messages carry tool calls and only
/// tool messages carry a `tool_call_id`; the constructors enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Per-user conversation aggregate: the transcript plus the binary images
/// attached over its lifetime. Image names are positional (`image0`,
/// `image1`, ...) and never reused within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: String,
    pub transcript: Vec<Message>,
    #[serde(default)]
    pub images: Vec<Vec<u8>>,
}

impl ConversationState {
    /// Fresh conversation seeded with the system prompt.
    pub fn new(user_id: impl Into<String>, system_prompt: &str) -> Self {
        Self {
            user_id: user_id.into(),
            transcript: vec![Message::system(system_prompt)],
            images: Vec::new(),
        }
    }

    pub fn image_name(position: usize) -> String {
        format!("image{}", position)
    }

    /// Look up an attached image by its positional name.
    pub fn image_by_name(&self, name: &str) -> Option<&[u8]> {
        let position: usize = name.strip_prefix("image")?.parse().ok()?;
        self.images.get(position).map(|data| data.as_slice())
    }

    /// Append newly attached images, returning the names assigned to them.
    pub fn register_images(&mut self, new_images: Vec<Vec<u8>>) -> Vec<String> {
        let start = self.images.len();
        let names = (start..start + new_images.len())
            .map(Self::image_name)
            .collect();
        self.images.extend(new_images);
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = Message::user("hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "user");
        assert!(value.get("tool_calls").is_none());
        assert!(value.get("tool_call_id").is_none());
    }

    #[test]
    fn only_assistant_messages_carry_tool_calls() {
        let call = ToolCall::new("call_1", "search", json!({"query": "rust"}));
        let assistant = Message::assistant_with_calls("", vec![call]);
        assert!(assistant.has_tool_calls());

        for msg in [Message::system("s"), Message::user("u"), Message::tool("t", "call_1")] {
            assert!(!msg.has_tool_calls());
        }
    }

    #[test]
    fn argument_values_preserve_order_and_coerce() {
        let call = ToolCall::new(
            "call_1",
            "imageask",
            json!({"image": "image0", "question": "what is this?", "count": 3}),
        );
        assert_eq!(
            call.argument_values(),
            vec!["image0".to_string(), "what is this?".to_string(), "3".to_string()]
        );

        let no_args = ToolCall::new("call_2", "ping", Value::Null);
        assert!(no_args.argument_values().is_empty());
    }

    #[test]
    fn transcript_survives_serde_round_trip() {
        let call = ToolCall::new("call_1", "eval", json!({"code": "print(1)"}));
        let transcript = vec![
            Message::system("sys"),
            Message::user("run it"),
            Message::assistant_with_calls("", vec![call]),
            Message::tool("Function \"eval\" executed and returned: \"1\"\n", "call_1"),
            Message::assistant("done"),
        ];

        let encoded = serde_json::to_string(&transcript).unwrap();
        let decoded: Vec<Message> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, transcript);
    }

    #[test]
    fn image_names_are_positional_and_never_reused() {
        let mut state = ConversationState::new("42", "sys");
        let first = state.register_images(vec![vec![1], vec![2]]);
        assert_eq!(first, vec!["image0", "image1"]);

        let second = state.register_images(vec![vec![3]]);
        assert_eq!(second, vec!["image2"]);

        assert_eq!(state.image_by_name("image1"), Some(&[2u8][..]));
        assert_eq!(state.image_by_name("image9"), None);
        assert_eq!(state.image_by_name("bogus"), None);
    }
}
