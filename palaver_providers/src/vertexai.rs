use async_trait::async_trait;
use palaver_config::{ConfigError, ModelConfig, resolve_credential};
use palaver_core::{ChatModel, ChatRequest, DEFAULT_TEMPERATURE, LLMResponse, Role};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::util::{alternating_turns, check_status};

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_VERTEX_AI_ACCESS_TOKEN";
const DEFAULT_LOCATION: &str = "us-central1";
const DEFAULT_MODEL: &str = "chat-bison";
const MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VertexAIConfig {
    access_token: Option<String>,
    project_id: Option<String>,
    location: Option<String>,
    #[serde(alias = "modelName")]
    model: Option<String>,
    temperature: Option<f32>,
}

/// Vertex AI chat models through the `predict` endpoint.
///
/// Authentication uses a bearer access token, e.g. from
/// `gcloud auth print-access-token`.
pub struct VertexAIProvider {
    client: Client,
    access_token: String,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl VertexAIProvider {
    pub fn new(client: Client, access_token: String, project_id: &str, location: &str) -> Self {
        info!("Creating VertexAIProvider");
        let mut provider = Self {
            client,
            access_token,
            endpoint: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        };
        provider.endpoint = Self::endpoint_for(project_id, location, &provider.model);
        provider
    }

    fn endpoint_for(project_id: &str, location: &str, model: &str) -> String {
        format!(
            "https://{location}-aiplatform.googleapis.com/v1/projects/{project_id}/locations/{location}/publishers/google/models/{model}:predict"
        )
    }

    pub fn from_config(config: &ModelConfig, client: Client) -> palaver_config::Result<Self> {
        let parsed: VertexAIConfig = config.provider_config()?;
        let access_token = resolve_credential(
            &config.id,
            "accessToken",
            parsed.access_token.as_deref(),
            ACCESS_TOKEN_ENV,
        )?;
        let project_id = parsed
            .project_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                model: config.id.clone(),
                field: "projectId".to_string(),
                env: "(none)".to_string(),
            })?;
        let location = parsed.location.as_deref().unwrap_or(DEFAULT_LOCATION);
        let model = parsed.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let mut provider = Self::new(client, access_token, &project_id, location);
        provider.endpoint = Self::endpoint_for(&project_id, location, &model);
        provider.model = model;
        provider.temperature = parsed.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        Ok(provider)
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = alternating_turns(&request.messages)
            .into_iter()
            .map(|(role, content)| {
                let author = if role == Role::Assistant { "bot" } else { "user" };
                json!({ "author": author, "content": content })
            })
            .collect();

        let mut instance = json!({ "messages": messages });
        if let Some(context) = request.system_text() {
            instance["context"] = json!(context);
        }

        let mut parameters = json!({
            "temperature": request.temperature.unwrap_or(self.temperature),
            "maxOutputTokens": MAX_OUTPUT_TOKENS,
        });
        if !request.stop.is_empty() {
            parameters["stopSequences"] = json!(request.stop);
        }
        json!({ "instances": [instance], "parameters": parameters })
    }

    fn parse_response(response: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        let content = response["predictions"][0]["candidates"][0]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing predictions"))?;
        Ok(LLMResponse::text(content))
    }
}

#[async_trait]
impl ChatModel for VertexAIProvider {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<LLMResponse> {
        let body = self.build_request_body(request);
        info!("Sending request to Vertex AI: model={}", self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, "Vertex AI")
            .await?
            .json::<serde_json::Value>()
            .await?;

        Self::parse_response(&response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
