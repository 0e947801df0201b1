use crate::tools::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const CLOUD_BASE: &str = "https://apis.roblox.com/cloud/v2";

/// Executes Luau code in a Roblox place through the Open Cloud
/// Luau-execution API: create a session task, poll it to a terminal state,
/// then collect its output and logs.
pub struct LuauEvalTool {
    pub http: reqwest::Client,
    pub api_key: String,
    pub universe_id: u64,
    pub place_id: u64,
    pub poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct LuauTask {
    path: String,
    state: String,
    #[serde(default)]
    output: Option<LuauOutput>,
    #[serde(default)]
    error: Option<LuauError>,
}

#[derive(Debug, Deserialize)]
struct LuauOutput {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct LuauError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuauLogPage {
    #[serde(default)]
    luau_execution_session_task_logs: Vec<LuauLog>,
}

#[derive(Debug, Deserialize)]
struct LuauLog {
    #[serde(default)]
    messages: Vec<String>,
}

impl LuauEvalTool {
    async fn create_task(&self, script: &str) -> anyhow::Result<LuauTask> {
        let url = format!(
            "{}/universes/{}/places/{}/luau-execution-session-tasks",
            CLOUD_BASE, self.universe_id, self.place_id
        );
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&json!({ "script": script }))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    async fn poll_task(&self, path: &str) -> anyhow::Result<LuauTask> {
        let url = format!("{}/{}", CLOUD_BASE, path);
        loop {
            let task: LuauTask = self
                .http
                .get(&url)
                .header("x-api-key", &self.api_key)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if task.state == "COMPLETE" || task.state == "FAILED" {
                return Ok(task);
            }

            tracing::debug!("Luau task {} still {}", path, task.state);
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_logs(&self, path: &str) -> anyhow::Result<Vec<String>> {
        let url = format!("{}/{}/logs", CLOUD_BASE, path);
        let page: LuauLogPage = self
            .http
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(page
            .luau_execution_session_task_logs
            .into_iter()
            .next()
            .map(|log| log.messages)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Tool for LuauEvalTool {
    fn name(&self) -> &str {
        "eval"
    }

    fn description(&self) -> &str {
        "Execute luau (Roblox) code."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The code to execute. Make sure to use print() or return to output data."
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, args: &[String]) -> anyhow::Result<String> {
        let code = args
            .first()
            .ok_or_else(|| anyhow::anyhow!("eval requires a code argument"))?;

        let task = self.create_task(code).await?;
        let finished = self.poll_task(&task.path).await?;
        let logs = self.fetch_logs(&task.path).await?;

        Ok(format_outcome(&finished, &logs))
    }
}

fn format_outcome(task: &LuauTask, logs: &[String]) -> String {
    let (verdict, results_block) = match &task.error {
        Some(error) => {
            let message: String = error.message.chars().take(1004).collect();
            (
                "Execution Errored!",
                format!("```{}: {}```", error.code, message),
            )
        }
        None => {
            let results = task
                .output
                .as_ref()
                .map(|output| {
                    output
                        .results
                        .iter()
                        .map(|value| match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default();
            let results = if results.is_empty() {
                "No Output".to_string()
            } else {
                results
            };
            ("Execution Successful!", format!("```{}```", results))
        }
    };

    let log_block = if logs.is_empty() {
        "No Output".to_string()
    } else {
        logs.join("\n")
    };

    format!(
        "{}\n\nResults:\n{}\n\nLogs:\n{}",
        verdict, results_block, log_block
    )
}
