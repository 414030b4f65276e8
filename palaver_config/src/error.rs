use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration problems. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Model {model}: missing {field} (set it in config or export {env})")]
    MissingCredential {
        model: String,
        field: String,
        env: String,
    },

    #[error("Model {model}: invalid provider config: {source}")]
    InvalidProviderConfig {
        model: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Model {model}: invalid URL {url:?}: {reason}")]
    InvalidUrl {
        model: String,
        url: String,
        reason: String,
    },

    #[error("Cannot find home directory")]
    NoHomeDir,

    #[error("Config file already exists at: {}. Please edit it directly.", .0.display())]
    AlreadyExists(PathBuf),
}
