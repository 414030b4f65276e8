//! Multi-turn conversation command.
//!
//! Unlike `ask`, this keeps one session open across turns and can save the
//! history when the conversation ends.

use std::path::PathBuf;

use tracing::{debug, info};

use super::{init_runtime, load_history, read_input, save_history, select_model};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    pub config: Option<PathBuf>,
    /// Optional model override
    pub model: Option<String>,
    /// History file to resume from
    pub history: Option<PathBuf>,
    /// Where to write the history on exit
    pub save: Option<PathBuf>,
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = init_runtime(input.config.as_deref())?;
        let model = select_model(&runtime.registry, input.model.as_deref())?;

        let mut session = match &input.history {
            Some(path) => model.factory.resume(load_history(path)?)?,
            None => model.factory.start(Vec::new()),
        };

        println!("=== Conversation with {} ({}) ===", model.id, session.model_name());
        println!("Type 'exit', 'quit' or 'q' to end the session.\n");

        while let Some(line) = read_input("> ")? {
            if line.is_empty() {
                continue;
            }
            match session.ask(&line).await {
                Ok(answer) => println!("\n{answer}\n"),
                Err(e) => eprintln!("Error: {e}"),
            }
            debug!("Session {} now has {} messages", session.id(), session.len());
        }

        println!("\nSession ended. Total turns: {}", session.len() / 2);
        info!("Conversation {} ended", session.id());

        if let Some(path) = &input.save {
            save_history(path, &session.history())?;
        }
        Ok(())
    }
}
