use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "PALAVER_CONFIG";

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub models: Vec<ModelConfig>,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

/// One chat model declaration. `config` stays opaque until the matching
/// provider parses it.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// Left empty when absent so the registry can skip the entry.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "ProxyConfig::default_protocol")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<ProxyAuth>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

impl ModelConfig {
    /// Parse the provider-specific section into its typed form.
    pub fn provider_config<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.config.clone()).map_err(|source| {
            ConfigError::InvalidProviderConfig {
                model: self.id.clone(),
                source,
            }
        })
    }

    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.config
            .get("systemPrompt")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    #[must_use]
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind)
    }
}

impl AgentConfig {
    pub fn provider_config<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.config.clone()).map_err(|source| {
            ConfigError::InvalidProviderConfig {
                model: format!("agent:{}", self.kind),
                source,
            }
        })
    }
}

impl ProxyConfig {
    fn default_protocol() -> String {
        "http".to_string()
    }

    /// Proxy URL, or `None` when no host is configured.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        let host = self.host.trim();
        if host.is_empty() {
            return None;
        }
        if host.contains("://") {
            return Some(host.to_string());
        }
        Some(self.port.map_or_else(
            || format!("{}://{host}", self.protocol),
            |port| format!("{}://{host}:{port}", self.protocol),
        ))
    }
}

impl Config {
    /// Locate and load the config file.
    ///
    /// Lookup order: `explicit`, `$PALAVER_CONFIG`, `./config.json`,
    /// `~/palaver/config.json`. A missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "No config file at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            "Loaded config from {} ({} models, {} agents)",
            path.display(),
            config.models.len(),
            config.agents.len()
        );
        Ok(config)
    }

    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            debug!("Using config path from {CONFIG_ENV}");
            return Ok(PathBuf::from(path));
        }
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Ok(local);
        }
        Self::default_path()
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join("palaver")
            .join(CONFIG_FILE))
    }

    #[must_use]
    pub fn model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn agent(&self, kind: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.kind.eq_ignore_ascii_case(kind))
    }

    /// Write the starter config. Never overwrites an existing file.
    pub fn create_config(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let config_template = r#"{
  "models": [
    {
      "id": "gpt",
      "type": "openAI",
      "config": {
        "apiKey": "your-openai-api-key-here",
        "temperature": 0.8,
        "systemPrompt": "You are a helpful assistant."
      }
    },
    {
      "id": "claude",
      "type": "anthropic",
      "config": {
        "apiKey": "your-anthropic-api-key-here"
      }
    },
    {
      "id": "ernie",
      "type": "baiduWenxin",
      "config": {
        "apiKey": "your-baidu-api-key-here",
        "secretKey": "your-baidu-secret-key-here",
        "modelName": "ERNIE-Bot-turbo"
      }
    }
  ],
  "agents": [
    {
      "type": "serper",
      "config": {
        "apiKey": "your-serper-api-key-here",
        "hl": "en",
        "gl": "us"
      }
    }
  ],
  "proxy": null
}
"#;

        std::fs::write(path, config_template).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Created config file at {}", path.display());
        Ok(())
    }
}
