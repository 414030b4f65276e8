//! Static strategy pattern for CLI commands.
//!
//! Each subcommand is a separate strategy type with its own input struct,
//! dispatched statically from `main`.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use palaver_config::Config;
use palaver_conversation::{ModelRegistry, RegisteredModel};
use palaver_core::{HistoryEntry, RawHistoryEntry};
use palaver_providers::http;
use tracing::info;

mod agent;
mod ask;
mod chat;
mod init;
mod models;
mod version;

pub use agent::{AgentInput, AgentStrategy};
pub use ask::{AskInput, AskStrategy, DEFAULT_QUESTION};
pub use chat::{ChatInput, ChatStrategy};
pub use init::{InitInput, InitStrategy};
pub use models::{ModelsInput, ModelsStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// Each strategy defines its own input type via the associated type, so
/// adding a command only requires implementing this trait.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Components every model-backed command needs.
struct Runtime {
    config: Config,
    registry: ModelRegistry,
}

/// Load config, install the proxy, and build the model registry.
///
/// The proxy must be applied before the registry so providers pick up the
/// configured client.
fn init_runtime(config_path: Option<&Path>) -> anyhow::Result<Runtime> {
    let config = Config::load(config_path)?;
    http::apply(config.proxy.as_ref())?;
    let registry = ModelRegistry::build(&config.models)?;
    info!("{} models registered", registry.len());
    Ok(Runtime { config, registry })
}

fn select_model<'a>(
    registry: &'a ModelRegistry,
    id: Option<&str>,
) -> anyhow::Result<&'a RegisteredModel> {
    if registry.is_empty() {
        anyhow::bail!("No usable models configured; run `palaver init` to create a config");
    }
    let model = registry
        .select(id)
        .with_context(|| format!("Model not found: {}", id.unwrap_or_default()))?;
    info!("Using model {} ({})", model.id, model.kind);
    Ok(model)
}

fn load_history(path: &Path) -> anyhow::Result<Vec<RawHistoryEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid history file {}", path.display()))
}

fn save_history(path: &Path, history: &[HistoryEntry]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(history)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write history file {}", path.display()))?;
    info!("Saved {} history entries to {}", history.len(), path.display());
    Ok(())
}

/// Prompt on stdout and read one trimmed line. `None` on end of input or
/// an exit command.
fn read_input(prompt: &str) -> anyhow::Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    let input = input.trim();
    if matches!(input, "exit" | "quit" | "q") {
        return Ok(None);
    }
    Ok(Some(input.to_string()))
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}
