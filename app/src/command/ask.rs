//! One-shot question against a configured model.

use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use super::{init_runtime, load_history, select_model};

pub const DEFAULT_QUESTION: &str = "Hello, world!";

#[derive(Debug, Clone)]
pub struct AskInput {
    pub config: Option<PathBuf>,
    pub model: Option<String>,
    pub question: String,
    /// Seed history file to resume from
    pub history: Option<PathBuf>,
    /// Print the answer as it arrives
    pub stream: bool,
}

/// Strategy for the Ask command.
///
/// Starts one session, asks once, then prints the answer followed by the
/// resulting history as JSON.
#[derive(Debug, Clone, Copy)]
pub struct AskStrategy;

impl super::CommandStrategy for AskStrategy {
    type Input = AskInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = init_runtime(input.config.as_deref())?;
        let model = select_model(&runtime.registry, input.model.as_deref())?;

        let mut session = match &input.history {
            Some(path) => model.factory.resume(load_history(path)?)?,
            None => model.factory.start(Vec::new()),
        };
        info!("Asking {}: {}", model.id, input.question);

        if input.stream {
            session
                .ask_streaming(&input.question, &|chunk: &str| {
                    print!("{chunk}");
                    let _ = std::io::stdout().flush();
                })
                .await?;
            println!();
        } else {
            let answer = session.ask(&input.question).await?;
            println!("{answer}");
        }

        println!("{}", serde_json::to_string_pretty(&session.history())?);
        Ok(())
    }
}
