use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SessionError;

/// What the model asked for on one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentAction {
    /// Run `tool` with `input`. `log` is the raw model output.
    Tool {
        tool: String,
        input: String,
        log: String,
    },
    Finish {
        output: String,
        log: String,
    },
}

const FINAL_ANSWER: &str = "Final Answer:";

#[allow(clippy::unwrap_used)]
static ACTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Action: (.*)\nAction Input: (.*)").unwrap());

/// Parse one completion in the Thought/Action/Final Answer format.
pub fn parse(text: &str) -> Result<AgentAction, SessionError> {
    if let Some(idx) = text.rfind(FINAL_ANSWER) {
        return Ok(AgentAction::Finish {
            output: text[idx + FINAL_ANSWER.len()..].trim().to_string(),
            log: text.to_string(),
        });
    }

    let captures = ACTION_PATTERN
        .captures(text)
        .ok_or_else(|| SessionError::OutputParse(text.to_string()))?;
    let tool = captures[1].trim().to_string();
    let input = captures[2].trim().trim_matches('"').to_string();
    Ok(AgentAction::Tool {
        tool,
        input,
        log: text.to_string(),
    })
}
