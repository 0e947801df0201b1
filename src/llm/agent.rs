use crate::llm::transcript::Message;
use crate::llm::ChatModel;
use crate::tools::ToolRegistry;
use std::sync::Arc;

/// Result of one completed exchange: the enriched transcript and the final,
/// tool-free assistant message.
#[derive(Debug)]
pub struct ChatOutcome {
    pub transcript: Vec<Message>,
    pub answer: Message,
}

/// Drives the multi-round exchange with the model: send transcript, execute
/// any requested tool calls strictly in order, fold the results back in, and
/// repeat until the model answers without tool calls.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    max_rounds: usize,
}

impl Agent {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>, max_rounds: usize) -> Self {
        Self {
            model,
            tools,
            max_rounds,
        }
    }

    pub async fn run(&self, mut transcript: Vec<Message>) -> anyhow::Result<ChatOutcome> {
        let definitions = self.tools.definitions();

        for round in 0..self.max_rounds {
            tracing::info!("Agent round {}/{}", round + 1, self.max_rounds);

            let assistant = self.model.complete(&transcript, &definitions).await?;
            transcript.push(assistant.clone());

            if !assistant.has_tool_calls() {
                tracing::info!("Agent completed after {} rounds", round + 1);
                return Ok(ChatOutcome {
                    transcript,
                    answer: assistant,
                });
            }

            tracing::info!("LLM requested {} tool calls", assistant.tool_calls.len());

            // Calls run sequentially, in the order the model emitted them:
            // later calls may rely on side effects of earlier ones.
            let mut results = String::new();
            for call in &assistant.tool_calls {
                match self.tools.get(&call.name) {
                    Some(tool) => {
                        let args = call.argument_values();
                        tracing::info!("Executing tool {} with {} argument(s)", call.name, args.len());
                        let output = tool.execute(&args).await?;
                        tracing::debug!("Tool {} returned: {}", call.name, output);
                        results.push_str(&format!(
                            "Function \"{}\" executed and returned: \"{}\"\n",
                            call.name, output
                        ));
                    }
                    None => {
                        tracing::warn!("Tool not found: {}", call.name);
                        results.push_str(&format!("Function \"{}\" not found.\n", call.name));
                    }
                }
            }

            let first_call_id = assistant.tool_calls[0].id.clone();
            transcript.push(Message::tool(results, first_call_id));
        }

        tracing::warn!(
            "Agent exceeded max rounds ({}) - potential runaway tool-call loop",
            self.max_rounds
        );
        Err(anyhow::anyhow!(
            "I've reached my reasoning limit for this task ({} steps). \
             Try breaking your request into smaller, more specific steps.",
            self.max_rounds
        ))
    }
}
