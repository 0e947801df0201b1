use crate::tools::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Web search through a SearXNG instance's JSON API.
pub struct SearchTool {
    pub http: reqwest::Client,
    pub searx_url: String,
    pub result_count: usize,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search on Google."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: &[String]) -> anyhow::Result<String> {
        let query = args
            .first()
            .ok_or_else(|| anyhow::anyhow!("search requires a query argument"))?;

        let url = format!("{}/search", self.searx_url.trim_end_matches('/'));
        let request = self.http.get(&url).query(&[
            ("q", query.as_str()),
            ("language", "auto"),
            ("time_range", ""),
            ("safesearch", "0"),
            ("categories", "general"),
            ("format", "json"),
        ]);
        let response = match request.send().await {
            Ok(response) => response,
            // Reported in-band so the model can react instead of aborting
            // the whole exchange.
            Err(error) => return Ok(format!("An error occurred: {}", error)),
        };

        if !response.status().is_success() {
            return Ok(format!("Response not ok. Status {}.", response.status().as_u16()));
        }

        let page: SearchPage = response.json().await?;
        Ok(format_results(&page.results, self.result_count))
    }
}

fn format_results(results: &[SearchResult], count: usize) -> String {
    let mut lines = String::new();
    for (index, result) in results.iter().take(count).enumerate() {
        lines.push_str(&format!("[{}] {} || {}\n", index + 1, result.url, result.content));
    }
    lines
}
