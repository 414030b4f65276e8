use async_trait::async_trait;
use palaver_config::{ModelConfig, resolve_credential};
use palaver_core::{ChatModel, ChatRequest, DEFAULT_TEMPERATURE, LLMResponse, Role, Usage};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::util::{alternating_turns, check_status, parse_base_url};

pub const API_KEY_ENV: &str = "BAIDU_API_KEY";
pub const SECRET_KEY_ENV: &str = "BAIDU_SECRET_KEY";
const DEFAULT_BASE_URL: &str = "https://aip.baidubce.com";
const DEFAULT_MODEL: &str = "ERNIE-Bot-turbo";

// 110: invalid access token, 111: access token expired.
const TOKEN_ERROR_CODES: [i64; 2] = [110, 111];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WenxinConfig {
    api_key: Option<String>,
    secret_key: Option<String>,
    #[serde(alias = "model")]
    model_name: Option<String>,
    user_id: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
}

/// Endpoint path segment for a Wenxin model name.
fn endpoint_for(model: &str) -> &str {
    match model {
        "ERNIE-Bot-turbo" => "eb-instant",
        "ERNIE-Bot" => "completions",
        "ERNIE-Bot-4" => "completions_pro",
        other => other,
    }
}

/// Baidu Wenxin (ERNIE) chat.
///
/// An OAuth access token is fetched with the API key and secret on first
/// use and cached until the service reports it invalid or expired.
pub struct WenxinProvider {
    client: Client,
    api_key: String,
    secret_key: String,
    base_url: String,
    model: String,
    user_id: Option<String>,
    temperature: f32,
    access_token: Mutex<Option<String>>,
}

impl WenxinProvider {
    pub fn new(client: Client, api_key: String, secret_key: String) -> Self {
        info!("Creating WenxinProvider");
        Self {
            client,
            api_key,
            secret_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            user_id: None,
            temperature: DEFAULT_TEMPERATURE,
            access_token: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ModelConfig, client: Client) -> palaver_config::Result<Self> {
        let parsed: WenxinConfig = config.provider_config()?;
        let api_key =
            resolve_credential(&config.id, "apiKey", parsed.api_key.as_deref(), API_KEY_ENV)?;
        let secret_key = resolve_credential(
            &config.id,
            "secretKey",
            parsed.secret_key.as_deref(),
            SECRET_KEY_ENV,
        )?;

        let mut provider = Self::new(client, api_key, secret_key);
        if let Some(base_url) = parsed.base_url.as_deref() {
            provider.base_url = parse_base_url(&config.id, base_url)?;
        }
        if let Some(model) = parsed.model_name {
            provider.model = model;
        }
        provider.user_id = parsed.user_id;
        provider.temperature = parsed.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        Ok(provider)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn access_token(&self) -> anyhow::Result<String> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        debug!("Requesting Wenxin access token");
        let url = url::Url::parse_with_params(
            &format!("{}/oauth/2.0/token", self.base_url),
            &[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.secret_key.as_str()),
            ],
        )?;
        let response = self.client.post(url).send().await?;
        let response = check_status(response, "Wenxin")
            .await?
            .json::<serde_json::Value>()
            .await?;

        let token = response["access_token"].as_str().ok_or_else(|| {
            anyhow::anyhow!(
                "Wenxin token request failed: {}",
                response["error_description"].as_str().unwrap_or("no access_token")
            )
        })?;
        *cached = Some(token.to_string());
        Ok(token.to_string())
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
            "messages": messages,
            "temperature": request.temperature.unwrap_or(self.temperature),
        });
        if let Some(user_id) = &self.user_id {
            body["user_id"] = json!(user_id);
        }
        if let Some(system) = request.system_text() {
            body["system"] = json!(system);
        }
        if !request.stop.is_empty() {
            body["stop"] = json!(request.stop);
        }
        body
    }

    fn parse_response(response: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        if let Some(code) = response["error_code"].as_i64() {
            anyhow::bail!(
                "Wenxin API error {code}: {}",
                response["error_msg"].as_str().unwrap_or("unknown error")
            );
        }
        let content = response["result"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing result"))?
            .to_string();

        let usage = response["usage"].as_object().map(|u| Usage {
            prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
            completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0))
                .unwrap_or(0),
            total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        });

        Ok(LLMResponse { content, usage })
    }
}

#[async_trait]
impl ChatModel for WenxinProvider {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<LLMResponse> {
        let token = self.access_token().await?;
        let url = url::Url::parse_with_params(
            &format!(
                "{}/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/{}",
                self.base_url,
                endpoint_for(&self.model)
            ),
            &[("access_token", token.as_str())],
        )?;
        let body = self.build_request_body(request);
        info!("Sending request to Wenxin API: model={}", self.model);

        let response = self.client.post(url).json(&body).send().await?;
        let response = check_status(response, "Wenxin")
            .await?
            .json::<serde_json::Value>()
            .await?;

        if response["error_code"]
            .as_i64()
            .is_some_and(|code| TOKEN_ERROR_CODES.contains(&code))
        {
            warn!("Wenxin access token rejected, clearing cache");
            *self.access_token.lock().await = None;
        }
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
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> WenxinProvider {
        WenxinProvider::new(Client::new(), "ak".to_string(), "sk".to_string())
            .with_base_url(base_url.to_string())
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth/2.0/token"))
            .and(query_param("grant_type", "client_credentials"))
            .and(query_param("client_id", "ak"))
            .and(query_param("client_secret", "sk"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn model_endpoints() {
        assert_eq!(endpoint_for("ERNIE-Bot-turbo"), "eb-instant");
        assert_eq!(endpoint_for("ERNIE-Bot"), "completions");
        assert_eq!(endpoint_for("ERNIE-Bot-4"), "completions_pro");
        assert_eq!(endpoint_for("custom"), "custom");
    }

    #[test]
    fn request_body_carries_system_and_user() {
        let mut provider = provider(DEFAULT_BASE_URL);
        provider.user_id = Some("u1".to_string());
        let request = ChatRequest::new(vec![ChatMessage::system("sys"), ChatMessage::user("q")]);
        let body = provider.build_request_body(&request);
        assert_eq!(body["system"], "sys");
        assert_eq!(body["user_id"], "u1");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn error_payload_is_an_error() {
        let err = WenxinProvider::parse_response(
            &json!({"error_code": 17, "error_msg": "Open api daily request limit reached"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("17"));
    }

    #[tokio::test]
    async fn token_is_fetched_once_and_reused() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/eb-instant"))
            .and(query_param("access_token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "你好"})))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server.uri());
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert_eq!(provider.chat(&request).await.unwrap().content, "你好");
        assert_eq!(provider.chat(&request).await.unwrap().content, "你好");
    }

    #[tokio::test]
    async fn expired_token_clears_cache() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/eb-instant"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"error_code": 111, "error_msg": "Access token expired"}),
            ))
            .mount(&server)
            .await;

        let provider = provider(&server.uri());
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert!(provider.chat(&request).await.is_err());
        assert!(provider.access_token.lock().await.is_none());
    }
}
