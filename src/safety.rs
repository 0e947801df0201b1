use crate::llm::transcript::{Message, Role};
use crate::llm::ChatModel;
use std::sync::Arc;

/// Screens a transcript through a classification-tuned guard model before and
/// after each exchange. Returns `true` when the content should be rejected.
pub struct SafetyGate {
    model: Arc<dyn ChatModel>,
    exempt_codes: Vec<String>,
}

impl SafetyGate {
    pub fn new(model: Arc<dyn ChatModel>, exempt_codes: Vec<String>) -> Self {
        Self {
            model,
            exempt_codes,
        }
    }

    /// Screen a whole transcript. System prompts are ours and skipped; user
    /// turns, assistant turns and tool output (untrusted web/code content)
    /// are all included.
    pub async fn screen_transcript(&self, transcript: &[Message]) -> anyhow::Result<bool> {
        let rendered = render_for_guard(transcript);
        self.screen_text(&rendered).await
    }

    /// Single-round, tool-free exchange against the guard model. A verdict
    /// containing the literal `unsafe` marker rejects unless the trailing
    /// category code is on the exemption list.
    pub async fn screen_text(&self, input: &str) -> anyhow::Result<bool> {
        let request = vec![Message::user(input.trim())];
        let verdict = self.model.complete(&request, &[]).await?;
        let response = verdict.content.trim().to_string();

        if response.contains("unsafe") {
            let category = response.replace("unsafe", "").trim().to_string();

            if self.exempt_codes.iter().any(|code| code == &category) {
                tracing::info!("Guard flagged exempt category {}", category);
                return Ok(false);
            }

            tracing::warn!("Guard rejected content, category {}", category);
            return Ok(true);
        }

        Ok(false)
    }
}

fn render_for_guard(transcript: &[Message]) -> String {
    transcript
        .iter()
        .filter(|msg| msg.role != Role::System && !msg.content.trim().is_empty())
        .map(|msg| {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
                Role::System => unreachable!(),
            };
            format!("{}: {}", role, msg.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    struct CannedGuard {
        verdict: &'static str,
        last_input: Mutex<String>,
    }

    impl CannedGuard {
        fn new(verdict: &'static str) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                last_input: Mutex::new(String::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for CannedGuard {
        async fn complete(
            &self,
            transcript: &[Message],
            _tools: &[Value],
        ) -> anyhow::Result<Message> {
            *self.last_input.lock().unwrap() = transcript[0].content.clone();
            Ok(Message::assistant(self.verdict))
        }
    }

    fn default_gate(verdict: &'static str) -> (SafetyGate, Arc<CannedGuard>) {
        let guard = CannedGuard::new(verdict);
        (
            SafetyGate::new(guard.clone(), vec!["S14".to_string()]),
            guard,
        )
    }

    #[tokio::test]
    async fn safe_verdict_does_not_reject() {
        let (gate, _) = default_gate("safe");
        assert!(!gate.screen_text("hello there").await.unwrap());
    }

    #[tokio::test]
    async fn unsafe_verdict_rejects() {
        let (gate, _) = default_gate("unsafe\nS1");
        assert!(gate.screen_text("bad content").await.unwrap());
    }

    #[tokio::test]
    async fn exempt_category_is_not_rejected() {
        let (gate, _) = default_gate("unsafe\nS14");
        assert!(!gate.screen_text("borderline content").await.unwrap());
    }

    #[tokio::test]
    async fn exemption_list_is_configurable() {
        let guard = CannedGuard::new("unsafe\nS3");
        let gate = SafetyGate::new(guard, vec!["S3".to_string()]);
        assert!(!gate.screen_text("content").await.unwrap());

        let guard = CannedGuard::new("unsafe\nS3");
        let gate = SafetyGate::new(guard, vec![]);
        assert!(gate.screen_text("content").await.unwrap());
    }

    #[tokio::test]
    async fn transcript_rendering_includes_tool_output_but_not_system() {
        let (gate, guard) = default_gate("safe");
        let transcript = vec![
            Message::system("secret system prompt"),
            Message::user("scrape that page"),
            Message::tool("Function \"scrape\" executed and returned: \"page text\"\n", "c1"),
            Message::assistant("here you go"),
        ];

        gate.screen_transcript(&transcript).await.unwrap();

        let seen = guard.last_input.lock().unwrap().clone();
        assert!(!seen.contains("secret system prompt"));
        assert!(seen.contains("user: scrape that page"));
        assert!(seen.contains("page text"));
        assert!(seen.contains("assistant: here you go"));
    }
}
