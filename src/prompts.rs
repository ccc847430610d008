//! Centralized prompt definitions
//!
//! All text sent to the completion service lives here so the step protocol
//! and the parser in [`crate::agent`] can be kept in sync.

/// Instructions for the tool-using reasoning loop.
///
/// `{tools}` is replaced with one `name: description` line per tool and
/// `{tool_names}` with the comma-separated names.
pub const REACT_INSTRUCTIONS: &str = r#"Answer the following questions as best you can. You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

When a tool result contains a URL you rely on, include that URL in the final answer.
Never write an Observation yourself; it is provided after each Action.

Begin!"#;

/// System prompt for the direct, tool-less fallback answer.
pub const DIRECT_ANSWER_PROMPT: &str = r#"You are a knowledgeable research assistant. Answer the user's question directly and concisely from your own knowledge. If you mention specific papers, articles, or websites, include their URLs when you know them."#;

/// Stop sequence that ends a step before the model invents an observation.
pub const OBSERVATION_STOP: &str = "\nObservation:";

/// Greeting shown when a session starts.
pub const GREETING: &str = "Hello! I'm your research assistant. I can search the web, find academic papers, and browse Wikipedia. What would you like to explore today?";

/// Greeting shown after the session is reset.
pub const RESET_GREETING: &str = "Chat cleared! How can I assist you with your research today?";

/// Canned queries offered as REPL shortcuts: command, label, query.
pub const QUICK_ACTIONS: &[(&str, &str, &str)] = &[
    (
        "/papers",
        "Latest AI Research",
        "Find the latest research papers about artificial intelligence from arXiv",
    ),
    (
        "/wiki",
        "Search Wikipedia",
        "Search Wikipedia for current events in technology",
    ),
    (
        "/web",
        "Web Search",
        "Search the web for recent developments in machine learning",
    ),
];

/// Query behind a quick-action command, if `command` names one.
pub fn quick_action(command: &str) -> Option<&'static str> {
    QUICK_ACTIONS
        .iter()
        .find(|(name, _, _)| *name == command)
        .map(|(_, _, query)| *query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_react_instructions_placeholders() {
        assert!(REACT_INSTRUCTIONS.contains("{tools}"));
        assert!(REACT_INSTRUCTIONS.contains("{tool_names}"));
    }

    #[test]
    fn test_react_instructions_name_step_markers() {
        for marker in ["Thought:", "Action:", "Action Input:", "Observation:", "Final Answer:"] {
            assert!(REACT_INSTRUCTIONS.contains(marker), "missing {}", marker);
        }
    }

    #[test]
    fn test_observation_stop_matches_marker() {
        assert!(REACT_INSTRUCTIONS.contains(OBSERVATION_STOP.trim_start()));
    }

    #[test]
    fn test_quick_action_lookup() {
        assert_eq!(
            quick_action("/wiki"),
            Some("Search Wikipedia for current events in technology")
        );
        assert!(quick_action("/papers").unwrap().contains("arXiv"));
        assert_eq!(quick_action("/reset"), None);
    }
}
