use thiserror::Error;

/// Errors returned by session construction and `ask`.
///
/// Everything except `UnknownRole` is per-call: the session that returned
/// it is unchanged and stays usable.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("history entry {index} has unknown role {role:?}")]
    UnknownRole { index: usize, role: String },

    #[error("LLM provider error: {0}")]
    Provider(#[from] anyhow::Error),

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error("session is busy with another request")]
    Busy,

    #[error("Could not parse LLM output: {0}")]
    OutputParse(String),

    #[error("agent stopped after {0} iterations without a final answer")]
    StepBudgetExceeded(usize),
}
