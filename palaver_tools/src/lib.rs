#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub mod calculator;
pub mod serper;

pub use calculator::CalculatorTool;
pub use serper::{SerperConfig, SerperTool};

use std::time::Instant;

use async_trait::async_trait;
use palaver_config::AgentConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Tool description shown to the model in the agent prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
}

/// Result of tool execution
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
    pub duration_ms: Option<u128>,
    pub error_type: Option<String>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            duration_ms: None,
            error_type: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            duration_ms: None,
            error_type: Some("tool_error".to_string()),
        }
    }

    #[must_use]
    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }
}

/// A capability the agent can invoke with a single text input.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn definition(&self) -> ToolDefinition;
    async fn execute(&self, input: &str) -> ToolResult;
}

/// Tool registry
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Build the agent toolset from the `agents` config section.
    ///
    /// The calculator is always available. Unrecognized agent types are
    /// skipped with a warning; a recognized tool missing its credential is
    /// a configuration error.
    pub fn from_agent_configs(
        configs: &[AgentConfig],
        client: reqwest::Client,
    ) -> palaver_config::Result<Self> {
        let mut registry = Self::new();
        for config in configs {
            if config.kind.eq_ignore_ascii_case(SerperTool::AGENT_TYPE) {
                registry.add_tool(Box::new(SerperTool::from_config(config, client.clone())?));
            } else {
                warn!("Skipping unknown agent type: {}", config.kind);
            }
        }
        registry.add_tool(Box::new(CalculatorTool));
        info!("Tool registry ready: {:?}", registry.names());
        Ok(registry)
    }

    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute(&self, name: &str, input: &str) -> ToolResult {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return ToolResult::error(format!("Unknown tool: {name}"))
                .with_error_type("unknown_tool");
        };

        let started = Instant::now();
        let mut result = tool.execute(input).await;
        result.duration_ms = Some(started.elapsed().as_millis());
        if result.is_error && result.error_type.is_none() {
            result.error_type = Some("tool_error".to_string());
        }
        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
