use async_trait::async_trait;
use palaver_config::{ModelConfig, resolve_credential};
use palaver_core::{ChatModel, ChatRequest, DEFAULT_TEMPERATURE, LLMResponse, Role, Usage};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::util::{alternating_turns, check_status, parse_base_url};

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const DEFAULT_API_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnthropicConfig {
    api_key: Option<String>,
    api_url: Option<String>,
    #[serde(alias = "model")]
    model_name: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

/// Anthropic messages API.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        info!("Creating AnthropicProvider");
        Self {
            client,
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn from_config(config: &ModelConfig, client: Client) -> palaver_config::Result<Self> {
        let parsed: AnthropicConfig = config.provider_config()?;
        let api_key =
            resolve_credential(&config.id, "apiKey", parsed.api_key.as_deref(), API_KEY_ENV)?;

        let mut provider = Self::new(client, api_key);
        if let Some(api_url) = parsed.api_url.as_deref() {
            provider.api_url = parse_base_url(&config.id, api_url)?;
        }
        if let Some(model) = parsed.model_name {
            provider.model = model;
        }
        provider.max_tokens = parsed.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        provider.temperature = parsed.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        Ok(provider)
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = alternating_turns(&request.messages)
            .into_iter()
            .map(|(role, content)| {
                let role = if role == Role::Assistant { "assistant" } else { "user" };
                json!({ "role": role, "content": content })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": request.temperature.unwrap_or(self.temperature),
            "messages": messages,
        });
        if let Some(system) = request.system_text() {
            body["system"] = json!(system);
        }
        if !request.stop.is_empty() {
            body["stop_sequences"] = json!(request.stop);
        }
        body
    }

    fn parse_response(response: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        let blocks = response["content"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content"))?;
        let content: String = blocks
            .iter()
            .filter(|b| b["type"] == "text")
            .filter_map(|b| b["text"].as_str())
            .collect();

        let usage = response["usage"].as_object().map(|u| {
            let input = u32::try_from(u["input_tokens"].as_u64().unwrap_or(0)).unwrap_or(0);
            let output = u32::try_from(u["output_tokens"].as_u64().unwrap_or(0)).unwrap_or(0);
            Usage {
                prompt_tokens: input,
                completion_tokens: output,
                total_tokens: input.saturating_add(output),
            }
        });

        Ok(LLMResponse { content, usage })
    }
}

#[async_trait]
impl ChatModel for AnthropicProvider {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<LLMResponse> {
        let body = self.build_request_body(request);
        info!("Sending request to Anthropic API: model={}", self.model);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, "Anthropic")
            .await?
            .json::<serde_json::Value>()
            .await?;

        info!("Received response from Anthropic API");
        Self::parse_response(&response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use palaver_core::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn system_goes_out_of_band() {
        let provider = AnthropicProvider::new(Client::new(), "k".to_string());
        let request = ChatRequest::new(vec![
            ChatMessage::system("Be terse."),
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello"),
            ChatMessage::user("Bye"),
        ]);
        let body = provider.build_request_body(&request);

        assert_eq!(body["system"], "Be terse.");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn parse_response_concatenates_text_blocks() {
        let response = json!({
            "content": [{"type": "text", "text": "Hel"}, {"type": "text", "text": "lo"}],
            "usage": {"input_tokens": 5, "output_tokens": 2}
        });
        let parsed = AnthropicProvider::parse_response(&response).unwrap();
        assert_eq!(parsed.content, "Hello");
        assert_eq!(parsed.usage.map(|u| u.total_tokens), Some(7));
    }

    #[tokio::test]
    async fn chat_sends_version_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "k"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Hello"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new(Client::new(), "k".to_string()).with_api_url(server.uri());
        let response = provider
            .chat(&ChatRequest::new(vec![ChatMessage::user("Hi")]))
            .await
            .unwrap();
        assert_eq!(response.content, "Hello");
    }
}
