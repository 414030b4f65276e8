use std::path::PathBuf;
use std::sync::Arc;

use palaver_conversation::{AgentEvent, AgentFactory, AgentSession, AgentSettings};
use palaver_providers::http;
use palaver_tools::ToolRegistry;
use tracing::info;

use super::{init_runtime, read_input, select_model};

/// Input parameters for the Agent command strategy.
#[derive(Debug, Clone)]
pub struct AgentInput {
    pub config: Option<PathBuf>,
    /// Optional model override
    pub model: Option<String>,
    /// Messages to send in order (interactive mode when empty)
    pub messages: Vec<String>,
}

/// Strategy for executing the Agent command.
///
/// Runs the tool-using agent with the configured search tool and the
/// calculator, over the given messages or interactively.
#[derive(Debug, Clone, Copy)]
pub struct AgentStrategy;

impl super::CommandStrategy for AgentStrategy {
    type Input = AgentInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = init_runtime(input.config.as_deref())?;
        let model = select_model(&runtime.registry, input.model.as_deref())?;

        let tools = ToolRegistry::from_agent_configs(&runtime.config.agents, http::shared_client())?;
        let settings = AgentSettings::default()
            .with_system_prompt(model.factory.system_prompt().map(str::to_string));
        let factory = AgentFactory::new(Arc::clone(model.factory.provider()), Arc::new(tools), settings);
        let mut session = factory.start(Vec::new());
        info!("Loaded agent with tools: {:?}", session.tools().names());

        if input.messages.is_empty() {
            while let Some(line) = read_input("> ")? {
                if !line.is_empty() {
                    run_turn(&mut session, &line).await;
                }
            }
        } else {
            for message in &input.messages {
                println!("ASK: {message}");
                run_turn(&mut session, message).await;
            }
        }
        Ok(())
    }
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::Action { tool, input } => println!("Action: {tool}({input})"),
        AgentEvent::Observation { observation, .. } => println!("Observation: {observation}"),
        AgentEvent::Finish { output } => println!("{output}\n"),
    }
}

/// A failed turn is reported and the session carries on.
async fn run_turn(session: &mut AgentSession, message: &str) {
    match session.ask_streaming(message, &print_event).await {
        Ok(outcome) => info!("Answered after {} tool calls", outcome.steps.len()),
        Err(e) => eprintln!("Error: {e}"),
    }
}
