use palaver_tools::ToolDefinition;

const PREFIX: &str =
    "Answer the following questions as best you can. You have access to the following tools:";

/// Marker the model must not write itself; observations come from tools.
pub const OBSERVATION_STOP: &str = "\nObservation";

fn format_instructions(tool_names: &str) -> String {
    format!(
        "Use the following format in your response:\n\n\
         Question: the input question you must answer\n\
         Thought: you should always think about what to do\n\
         Action: the action to take, should be one of [{tool_names}]\n\
         Action Input: the input to the action\n\
         Observation: the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         Thought: I now know the final answer\n\
         Final Answer: the final answer to the original input question"
    )
}

/// One completed tool call, as fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStep {
    pub tool: String,
    pub input: String,
    pub log: String,
    pub observation: String,
}

/// Render the running Thought/Action/Observation transcript.
#[must_use]
pub fn scratchpad(steps: &[AgentStep]) -> String {
    steps.iter().fold(String::new(), |mut pad, step| {
        pad.push_str(&step.log);
        pad.push_str("\nObservation: ");
        pad.push_str(&step.observation);
        pad.push_str("\nThought:");
        pad
    })
}

/// Render the user message for one agent step.
#[must_use]
pub fn render(tools: &[ToolDefinition], input: &str, steps: &[AgentStep]) -> String {
    let tool_strings = tools
        .iter()
        .map(|t| format!("{}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");
    let tool_names = tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let suffix = format!("Begin!\n\nQuestion: {input}\nThought:{}", scratchpad(steps));

    [
        PREFIX.to_string(),
        tool_strings,
        format_instructions(&tool_names),
        suffix,
    ]
    .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "search".to_string(),
                description: "a search engine.".to_string(),
            },
            ToolDefinition {
                name: "calculator".to_string(),
                description: "does math.".to_string(),
            },
        ]
    }

    #[test]
    fn test_render_lists_tools_and_question() {
        let prompt = render(&tools(), "What is 2+2?", &[]);
        assert!(prompt.starts_with(PREFIX));
        assert!(prompt.contains("search: a search engine.\ncalculator: does math."));
        assert!(prompt.contains("should be one of [search, calculator]"));
        assert!(prompt.ends_with("Question: What is 2+2?\nThought:"));
    }

    #[test]
    fn test_scratchpad_feeds_back_observations() {
        let steps = vec![AgentStep {
            tool: "calculator".to_string(),
            input: "2+2".to_string(),
            log: " I need math.\nAction: calculator\nAction Input: 2+2".to_string(),
            observation: "4".to_string(),
        }];
        let prompt = render(&tools(), "q", &steps);
        assert!(prompt.ends_with(
            "Thought: I need math.\nAction: calculator\nAction Input: 2+2\nObservation: 4\nThought:"
        ));
    }

    #[test]
    fn test_placeholder_text_in_question_is_literal() {
        let steps = vec![AgentStep {
            tool: "search".to_string(),
            input: "x".to_string(),
            log: " look it up\nAction: search\nAction Input: x".to_string(),
            observation: "found".to_string(),
        }];
        let prompt = render(&tools(), "what is {agent_scratchpad}?", &steps);
        assert!(prompt.contains("Question: what is {agent_scratchpad}?\nThought: look it up"));
        assert_eq!(prompt.matches("Observation: found").count(), 1);
    }
}
