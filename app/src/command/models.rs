use std::path::PathBuf;

use super::{init_runtime, mask_key};

#[derive(Debug, Clone)]
pub struct ModelsInput {
    pub config: Option<PathBuf>,
}

/// Strategy for listing the registered models.
///
/// Keys are masked; entries with an unrecognized type are listed
/// separately.
#[derive(Debug, Clone, Copy)]
pub struct ModelsStrategy;

impl super::CommandStrategy for ModelsStrategy {
    type Input = ModelsInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = init_runtime(input.config.as_deref())?;

        println!("=== palaver models ===\n");
        for model in runtime.registry.iter() {
            let key = model.config.config["apiKey"]
                .as_str()
                .filter(|k| !k.is_empty())
                .map_or_else(|| "(from environment)".to_string(), mask_key);
            println!("  {:<12} {:<12} key: {key}", model.id, model.kind.as_str());
            if let Some(prompt) = model.factory.system_prompt() {
                println!("  {:<12} system prompt: {prompt}", "");
            }
        }
        if runtime.registry.is_empty() {
            println!("  (none)");
        }

        if !runtime.registry.skipped().is_empty() {
            println!("\nSkipped (unknown type):");
            for skipped in runtime.registry.skipped() {
                println!("  {:<12} {}", skipped.id, skipped.kind);
            }
        }

        if !runtime.config.agents.is_empty() {
            println!("\nAgents:");
            for agent in &runtime.config.agents {
                println!("  {}", agent.kind);
            }
        }
        Ok(())
    }
}
