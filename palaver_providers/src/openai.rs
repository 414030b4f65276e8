use async_trait::async_trait;
use palaver_config::{ModelConfig, resolve_credential};
use palaver_core::{ChatModel, ChatRequest, DEFAULT_TEMPERATURE, LLMResponse, Role, Usage};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::sse;
use crate::util::{check_status, parse_base_url};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenAIConfig {
    api_key: Option<String>,
    #[serde(alias = "model")]
    model_name: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
}

/// OpenAI chat completions, also usable with compatible endpoints via
/// `baseUrl`.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAIProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        info!("Creating OpenAIProvider");
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn from_config(config: &ModelConfig, client: Client) -> palaver_config::Result<Self> {
        let parsed: OpenAIConfig = config.provider_config()?;
        let api_key =
            resolve_credential(&config.id, "apiKey", parsed.api_key.as_deref(), API_KEY_ENV)?;

        let mut provider = Self::new(client, api_key)
            .with_temperature(parsed.temperature.unwrap_or(DEFAULT_TEMPERATURE));
        if let Some(base_url) = parsed.base_url.as_deref() {
            provider.base_url = parse_base_url(&config.id, base_url)?;
        }
        if let Some(model) = parsed.model_name {
            provider.model = model;
        }
        Ok(provider)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request_body(&self, request: &ChatRequest, stream: bool) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::User | Role::Tool => "user",
                    Role::Assistant => "assistant",
                };
                json!({ "role": role, "content": m.content })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature.unwrap_or(self.temperature),
        });
        if !request.stop.is_empty() {
            body["stop"] = json!(request.stop);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    fn parse_response(response: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content"))?
            .to_string();

        let usage = response["usage"].as_object().map(|u| Usage {
            prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
            completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0))
                .unwrap_or(0),
            total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        });

        Ok(LLMResponse { content, usage })
    }

    async fn send(&self, body: &serde_json::Value) -> anyhow::Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        check_status(response, "OpenAI").await
    }
}

#[async_trait]
impl ChatModel for OpenAIProvider {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<LLMResponse> {
        let body = self.build_request_body(request, false);
        info!("Sending request to OpenAI API: model={}", self.model);

        let response = self.send(&body).await?.json::<serde_json::Value>().await?;
        let response = Self::parse_response(&response)?;

        info!("Received response from OpenAI API");
        Ok(response)
    }

    async fn chat_streaming(
        &self,
        request: &ChatRequest,
        on_chunk: &(dyn for<'c> Fn(&'c str) + Send + Sync),
    ) -> anyhow::Result<LLMResponse> {
        let body = self.build_request_body(request, true);
        info!("Streaming request to OpenAI API: model={}", self.model);

        let response = self.send(&body).await?;
        let mut content = String::new();
        sse::for_each_data(response, |data| {
            let event: serde_json::Value = serde_json::from_str(data)?;
            if let Some(delta) = event["choices"][0]["delta"]["content"]
                .as_str()
                .filter(|d| !d.is_empty())
            {
                on_chunk(delta);
                content.push_str(delta);
            }
            Ok(())
        })
        .await?;

        debug!("OpenAI stream finished: {} chars", content.len());
        Ok(LLMResponse::text(content))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
