//! Tool-using sessions driven by a ReAct loop.
//!
//! Each `ask` alternates model calls and tool runs until the model produces
//! a final answer or the iteration budget runs out. Only the question and
//! the final answer enter the conversation history; intermediate steps live
//! in the scratchpad of that one call.

mod parser;
mod prompt;

pub use parser::{AgentAction, parse};
pub use prompt::{AgentStep, OBSERVATION_STOP};

use std::sync::Arc;

use palaver_core::{ChatModel, ChatRequest, HistoryEntry, PromptTemplate, RawHistoryEntry};
use palaver_tools::ToolRegistry;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SessionError;
use crate::factory::validate_history;
use crate::session::ChatSession;

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub system_prompt: Option<String>,
    /// Tool calls allowed per `ask` before giving up.
    pub max_iterations: usize,
    pub temperature: f32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: 15,
            temperature: 0.0,
        }
    }
}

impl AgentSettings {
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Progress reported by [`AgentSession::ask_streaming`] while the loop runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// The model asked for a tool call.
    Action { tool: String, input: String },
    /// The tool (or the unknown-tool notice) answered.
    Observation { tool: String, observation: String },
    /// Sent once, after the answer is committed to the history.
    Finish { output: String },
}

/// Final answer of one agent `ask` together with the tool calls made.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub output: String,
    pub steps: Vec<AgentStep>,
}

#[derive(Clone)]
pub struct AgentFactory {
    provider: Arc<dyn ChatModel>,
    template: Arc<PromptTemplate>,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
}

impl AgentFactory {
    #[must_use]
    pub fn new(
        provider: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            provider,
            template: Arc::new(PromptTemplate::new(settings.system_prompt.clone())),
            tools,
            settings,
        }
    }

    #[must_use]
    pub fn start(&self, seed: Vec<HistoryEntry>) -> AgentSession {
        AgentSession {
            session: ChatSession::new(
                Arc::clone(&self.provider),
                Arc::clone(&self.template),
                seed,
            ),
            tools: Arc::clone(&self.tools),
            settings: self.settings.clone(),
        }
    }

    pub fn resume(&self, seed: Vec<RawHistoryEntry>) -> Result<AgentSession, SessionError> {
        Ok(self.start(validate_history(seed)?))
    }
}

pub struct AgentSession {
    session: ChatSession,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
}

impl AgentSession {
    pub async fn ask(&mut self, input: &str) -> Result<String, SessionError> {
        self.ask_with_steps(input).await.map(|outcome| outcome.output)
    }

    /// Run the loop and also return the intermediate tool calls.
    pub async fn ask_with_steps(&mut self, input: &str) -> Result<AgentOutcome, SessionError> {
        self.run(input, &|_: &AgentEvent| {}).await
    }

    /// Like [`AgentSession::ask_with_steps`], reporting each action,
    /// observation and the final answer to `on_event` as they happen.
    pub async fn ask_streaming(
        &mut self,
        input: &str,
        on_event: &(dyn Fn(&AgentEvent) + Send + Sync),
    ) -> Result<AgentOutcome, SessionError> {
        self.run(input, on_event).await
    }

    async fn run(
        &mut self,
        input: &str,
        on_event: &(dyn Fn(&AgentEvent) + Send + Sync),
    ) -> Result<AgentOutcome, SessionError> {
        let definitions = self.tools.definitions();
        let mut steps: Vec<AgentStep> = Vec::new();

        for iteration in 1..=self.settings.max_iterations {
            let prompt = prompt::render(&definitions, input, &steps);
            let messages = self
                .session
                .template()
                .format_messages(self.session.messages(), &prompt);
            let request = ChatRequest::new(messages)
                .with_stop(OBSERVATION_STOP)
                .with_temperature(self.settings.temperature);

            let response = match self.session.provider().chat(&request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Agent session {} step {iteration} failed: {e:#}", self.id());
                    return Err(SessionError::Provider(e));
                }
            };
            let text = clip_at_observation(&response.content);
            debug!("Agent step {iteration} output: {text}");

            match parse(text) {
                Ok(AgentAction::Finish { output, .. }) => {
                    let output = self.session.commit(input, output)?;
                    on_event(&AgentEvent::Finish {
                        output: output.clone(),
                    });
                    info!(
                        "Agent session {} finished after {} tool calls",
                        self.id(),
                        steps.len()
                    );
                    return Ok(AgentOutcome { output, steps });
                }
                Ok(AgentAction::Tool { tool, input: tool_input, log }) => {
                    info!("Agent step {iteration}: {tool}({tool_input})");
                    on_event(&AgentEvent::Action {
                        tool: tool.clone(),
                        input: tool_input.clone(),
                    });
                    let observation = self.observe(&tool, &tool_input).await;
                    on_event(&AgentEvent::Observation {
                        tool: tool.clone(),
                        observation: observation.clone(),
                    });
                    steps.push(AgentStep {
                        tool,
                        input: tool_input,
                        log,
                        observation,
                    });
                }
                Err(e) => {
                    warn!("Agent session {} step {iteration}: {e}", self.id());
                    return Err(e);
                }
            }
        }

        warn!(
            "Agent session {} hit the limit of {} iterations",
            self.id(),
            self.settings.max_iterations
        );
        Err(SessionError::StepBudgetExceeded(
            self.settings.max_iterations,
        ))
    }

    async fn observe(&self, tool: &str, input: &str) -> String {
        if !self.tools.contains(tool) {
            return format!("{tool} is not a valid tool, try another one.");
        }
        let result = self.tools.execute(tool, input).await;
        if result.is_error {
            debug!(
                "Tool {tool} failed ({}): {}",
                result.error_type.as_deref().unwrap_or("tool_error"),
                result.content
            );
        }
        result.content
    }

    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.session.history()
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.session.id()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.session.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.session.is_empty()
    }

    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

/// Drop anything the model wrote past the observation marker, for
/// providers that ignore stop sequences.
fn clip_at_observation(text: &str) -> &str {
    text.find(OBSERVATION_STOP).map_or(text, |idx| &text[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_at_observation() {
        assert_eq!(
            clip_at_observation("Action: search\nAction Input: x\nObservation: made up"),
            "Action: search\nAction Input: x"
        );
        assert_eq!(clip_at_observation("Final Answer: 4"), "Final Answer: 4");
    }

    #[test]
    fn test_settings_default() {
        let settings = AgentSettings::default();
        assert_eq!(settings.max_iterations, 15);
        assert!(settings.temperature.abs() < f32::EPSILON);
    }
}
