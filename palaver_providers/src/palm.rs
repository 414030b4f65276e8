use async_trait::async_trait;
use palaver_config::{ModelConfig, resolve_credential};
use palaver_core::{ChatModel, ChatRequest, DEFAULT_TEMPERATURE, LLMResponse, Role};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::util::{alternating_turns, apply_stop, check_status};

pub const API_KEY_ENV: &str = "GOOGLE_PALM_API_KEY";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta2";
const DEFAULT_MODEL: &str = "models/chat-bison-001";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PalmConfig {
    api_key: Option<String>,
    #[serde(alias = "model")]
    model_name: Option<String>,
    temperature: Option<f32>,
}

/// Google PaLM `generateMessage` API.
pub struct PalmProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl PalmProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        info!("Creating PalmProvider");
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn from_config(config: &ModelConfig, client: Client) -> palaver_config::Result<Self> {
        let parsed: PalmConfig = config.provider_config()?;
        let api_key =
            resolve_credential(&config.id, "apiKey", parsed.api_key.as_deref(), API_KEY_ENV)?;

        let mut provider = Self::new(client, api_key);
        if let Some(model) = parsed.model_name {
            provider.model = if model.starts_with("models/") {
                model
            } else {
                format!("models/{model}")
            };
        }
        provider.temperature = parsed.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        Ok(provider)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = alternating_turns(&request.messages)
            .into_iter()
            .map(|(role, content)| {
                let author = if role == Role::Assistant { "1" } else { "0" };
                json!({ "author": author, "content": content })
            })
            .collect();

        let mut prompt = json!({ "messages": messages });
        if let Some(context) = request.system_text() {
            prompt["context"] = json!(context);
        }
        json!({
            "prompt": prompt,
            "temperature": request.temperature.unwrap_or(self.temperature),
            "candidateCount": 1,
        })
    }

    fn parse_response(response: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        if let Some(filters) = response["filters"].as_array().filter(|f| !f.is_empty()) {
            anyhow::bail!("PaLM blocked the response: {}", json!(filters));
        }
        let content = response["candidates"][0]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing candidates"))?;
        Ok(LLMResponse::text(content))
    }
}

#[async_trait]
impl ChatModel for PalmProvider {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<LLMResponse> {
        let body = self.build_request_body(request);
        let url = url::Url::parse_with_params(
            &format!("{}/{}:generateMessage", self.base_url, self.model),
            &[("key", self.api_key.as_str())],
        )?;
        info!("Sending request to PaLM API: model={}", self.model);

        let response = self.client.post(url).json(&body).send().await?;
        let response = check_status(response, "PaLM")
            .await?
            .json::<serde_json::Value>()
            .await?;

        let mut parsed = Self::parse_response(&response)?;
        parsed.content = apply_stop(parsed.content, &request.stop);
        Ok(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
