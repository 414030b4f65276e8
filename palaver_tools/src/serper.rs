use async_trait::async_trait;
use palaver_config::{AgentConfig, resolve_credential};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{Tool, ToolDefinition, ToolResult};

pub const API_KEY_ENV: &str = "SERPER_API_KEY";
const DEFAULT_ENDPOINT: &str = "https://google.serper.dev/search";
const NO_RESULT: &str = "No good search result found";

/// Serper search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerperConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Interface language
    #[serde(default = "SerperConfig::default_hl")]
    pub hl: String,

    /// Country of the search
    #[serde(default = "SerperConfig::default_gl")]
    pub gl: String,
}

impl SerperConfig {
    fn default_hl() -> String {
        "en".to_string()
    }

    fn default_gl() -> String {
        "us".to_string()
    }
}

impl Default for SerperConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            hl: Self::default_hl(),
            gl: Self::default_gl(),
        }
    }
}

/// Google search through serper.dev
pub struct SerperTool {
    client: Client,
    api_key: String,
    endpoint: String,
    config: SerperConfig,
}

impl SerperTool {
    /// `type` of the agents entry that enables this tool.
    pub const AGENT_TYPE: &'static str = "serper";

    pub fn new(client: Client, api_key: String, config: SerperConfig) -> Self {
        Self {
            client,
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            config,
        }
    }

    pub fn from_config(config: &AgentConfig, client: Client) -> palaver_config::Result<Self> {
        let parsed: SerperConfig = config.provider_config()?;
        let api_key = resolve_credential(
            &format!("agent:{}", config.kind),
            "apiKey",
            parsed.api_key.as_deref(),
            API_KEY_ENV,
        )?;
        Ok(Self::new(client, api_key, parsed))
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

/// Pick the most direct answer out of a Serper response.
fn extract_answer(response: &serde_json::Value) -> String {
    let answer_box = &response["answerBox"];
    let candidates = [
        answer_box["answer"].as_str(),
        answer_box["snippet"].as_str(),
        answer_box["snippet_highlighted_words"][0].as_str(),
        response["sportsResults"]["game_spotlight"].as_str(),
        response["knowledgeGraph"]["description"].as_str(),
        response["organic"][0]["snippet"].as_str(),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or(NO_RESULT)
        .to_string()
}

#[async_trait]
impl Tool for SerperTool {
    fn name(&self) -> &'static str {
        "search"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "a search engine. useful for when you need to answer questions \
                about current events. input should be a search query."
                .to_string(),
        }
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let query = input.trim();
        if query.is_empty() {
            return ToolResult::error("Search query is empty").with_error_type("invalid_input");
        }
        debug!("Serper search: {query}");

        let body = json!({ "q": query, "hl": self.config.hl, "gl": self.config.gl });
        let response = match self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return ToolResult::error(format!("HTTP request failed: {e}"))
                    .with_error_type("http_error");
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ToolResult::error(format!("Got {} error from serper", status.as_u16()))
                .with_error_type("http_error");
        }

        match response.json::<serde_json::Value>().await {
            Ok(json) => ToolResult::success(extract_answer(&json)),
            Err(e) => ToolResult::error(format!("Failed to read response: {e}"))
                .with_error_type("read_error"),
        }
    }
}
