use crate::llm::LlmClient;
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Answers a question about one of the conversation's attached images by
/// forwarding it to a vision-capable model. Bound per exchange to that
/// conversation's image set.
pub struct ImageAskTool {
    pub llm: Arc<LlmClient>,
    pub images: Vec<Vec<u8>>,
}

impl ImageAskTool {
    fn image_by_name(&self, name: &str) -> Option<&[u8]> {
        let position: usize = name.strip_prefix("image")?.parse().ok()?;
        self.images.get(position).map(|data| data.as_slice())
    }
}

#[async_trait]
impl Tool for ImageAskTool {
    fn name(&self) -> &str {
        "imageask"
    }

    fn description(&self) -> &str {
        "Answers a question about an image provided to you."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "image": {
                    "type": "string",
                    "description": "The name of the image."
                },
                "question": {
                    "type": "string",
                    "description": "The question you want to ask."
                }
            },
            "required": ["image", "question"]
        })
    }

    async fn execute(&self, args: &[String]) -> anyhow::Result<String> {
        let name = args
            .first()
            .ok_or_else(|| anyhow::anyhow!("imageask requires an image name"))?;
        let question = args
            .get(1)
            .ok_or_else(|| anyhow::anyhow!("imageask requires a question"))?;

        let Some(image) = self.image_by_name(name) else {
            // Reported in-band: a hallucinated image name should not abort
            // the whole exchange.
            return Ok(format!("Image \"{}\" not found in this conversation.", name));
        };

        self.llm.ask_about_image(question, image).await
    }
}
