#![warn(
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

//! Conversational sessions over any configured model.
//!
//! # Key Features
//! - One `SessionFactory` per configured model, built by `ModelRegistry`
//! - Sessions seeded from caller-owned history and read back with `history()`
//! - Atomic turns: a failed `ask` never leaves half a turn behind
//! - Tool-using agent sessions with a bounded ReAct loop

pub mod agent;
mod error;
mod factory;
mod registry;
mod session;

pub use agent::{AgentEvent, AgentFactory, AgentOutcome, AgentSession, AgentSettings, AgentStep};
pub use error::SessionError;
pub use factory::{SessionFactory, SessionSettings};
pub use registry::{ModelRegistry, RegisteredModel, SkippedModel};
pub use session::{ChatSession, SharedSession};
