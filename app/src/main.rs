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

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;

use command::{
    AgentInput, AgentStrategy, AskInput, AskStrategy, ChatInput, ChatStrategy, CommandStrategy,
    InitInput, InitStrategy, ModelsInput, ModelsStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "palaver")]
#[command(about = "Chat with configured language models", long_about = None)]
struct Cli {
    /// Config file (defaults to $PALAVER_CONFIG, then ~/palaver/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer and history
    Ask {
        /// Model id to use
        #[arg(short = 'M', long)]
        model: Option<String>,

        /// Question to ask
        #[arg(short, long, default_value = command::DEFAULT_QUESTION)]
        question: String,

        /// JSON history file to resume from
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,
    },
    /// Interactive conversation
    Chat {
        /// Model id to use
        #[arg(short = 'M', long)]
        model: Option<String>,

        /// JSON history file to resume from
        #[arg(long)]
        history: Option<PathBuf>,

        /// Save the history here on exit
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Run the tool-using agent
    Agent {
        /// Model id to use
        #[arg(short = 'M', long)]
        model: Option<String>,

        /// Message to send (repeatable, interactive when absent)
        #[arg(short = 'm', long = "message")]
        messages: Vec<String>,
    },
    /// List configured models
    Models,
    /// Write a starter configuration
    Init {
        /// Where to write the config
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show version
    Version,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {e}");
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config;
    match cli.command {
        Commands::Ask {
            model,
            question,
            history,
            stream,
        } => {
            AskStrategy
                .execute(AskInput {
                    config,
                    model,
                    question,
                    history,
                    stream,
                })
                .await
        }
        Commands::Chat {
            model,
            history,
            save,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    config,
                    model,
                    history,
                    save,
                })
                .await
        }
        Commands::Agent { model, messages } => {
            AgentStrategy
                .execute(AgentInput {
                    config,
                    model,
                    messages,
                })
                .await
        }
        Commands::Models => ModelsStrategy.execute(ModelsInput { config }).await,
        Commands::Init { path } => InitStrategy.execute(InitInput { path }).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
