//! The think-act-observe step protocol.
//!
//! The synthesizer answers each step in free text. [`parse_step`] is the only
//! place that text is interpreted: it maps a raw completion to a
//! [`StepAction`] or a single [`ParseError`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::ParseError;
use crate::prompts::OBSERVATION_STOP;

static ACTION_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:\s*(.*?)\s*Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)").ok()
});

const FINAL_ANSWER_MARKER: &str = "Final Answer:";
const ACTION_MARKER: &str = "Action:";

/// What the synthesizer decided to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Invoke a tool with the given input
    ToolCall {
        thought: String,
        tool: String,
        input: String,
    },
    /// Stop and answer
    FinalAnswer { thought: String, text: String },
}

/// One completed think-act-observe iteration.
///
/// Lives only for the duration of a single resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub thought: String,
    /// Tool that was invoked; `None` when the step output could not be used.
    pub tool: Option<String>,
    pub tool_input: String,
    pub observation: String,
    /// Synthesizer output for this step, replayed in later prompts.
    pub log: String,
}

impl ReasoningStep {
    /// Render the step the way the next prompt expects to see it.
    pub fn scratchpad(&self) -> String {
        format!("{}\nObservation: {}\nThought: ", self.log, self.observation)
    }
}

/// Parse one synthesizer step.
pub fn parse_step(raw: &str) -> Result<StepAction, ParseError> {
    // The model sometimes keeps going and invents its own observation.
    let text = match raw.find(OBSERVATION_STOP) {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let final_answer = text.find(FINAL_ANSWER_MARKER);
    let action = ACTION_PATTERN
        .as_ref()
        .and_then(|pattern| pattern.captures(text));

    match (action, final_answer) {
        (Some(_), Some(_)) => Err(ParseError::AmbiguousOutput),
        (Some(captures), None) => {
            let whole = captures.get(0).map(|m| m.start()).unwrap_or(0);
            let tool = captures
                .get(1)
                .and_then(|m| m.as_str().lines().next())
                .map(|name| name.trim().trim_matches('`').trim().to_string())
                .unwrap_or_default();
            if tool.is_empty() {
                return Err(ParseError::MissingAction);
            }
            let input = captures
                .get(2)
                .map(|m| m.as_str().trim().trim_matches(' ').trim_matches('"').to_string())
                .unwrap_or_default();

            Ok(StepAction::ToolCall {
                thought: clean_thought(&text[..whole]),
                tool,
                input,
            })
        }
        (None, Some(idx)) => {
            let answer = text[idx + FINAL_ANSWER_MARKER.len()..].trim();
            if answer.is_empty() {
                return Err(ParseError::Empty);
            }
            Ok(StepAction::FinalAnswer {
                thought: clean_thought(&text[..idx]),
                text: answer.to_string(),
            })
        }
        (None, None) if text.contains(ACTION_MARKER) => Err(ParseError::MissingActionInput),
        (None, None) => Err(ParseError::MissingAction),
    }
}

/// Observation fed back after an unusable step.
pub fn corrective_observation(error: &ParseError) -> String {
    match error {
        ParseError::UnknownTool { .. } => error.to_string(),
        other => format!(
            "Invalid format: {}. Reply with 'Action:' and 'Action Input:' lines to use a tool, \
             or with 'Final Answer:' to answer.",
            other
        ),
    }
}

fn clean_thought(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix("Thought:").unwrap_or(text).trim().to_string()
}
