//! Conversation history owned by the caller.
//!
//! The orchestrator only reads history; the caller appends the user turn
//! before submitting a query and the assistant turn after it resolves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provenance::{AnswerResult, Source};
use crate::synth::Message;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Sources attributed to an assistant turn; empty for user turns.
    #[serde(default)]
    pub sources: Vec<Source>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create an assistant turn from an attributed answer
    pub fn assistant(answer: AnswerResult) -> Self {
        Self {
            role: Role::Assistant,
            content: answer.text,
            sources: answer.sources,
            created_at: Utc::now(),
        }
    }

    /// Render as a chat message for the completion service
    pub fn to_message(&self) -> Message {
        match self.role {
            Role::User => Message::user(&self.content),
            Role::Assistant => Message::assistant(&self.content),
        }
    }
}

/// Ordered, append-only log of turns for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    id: String,
    turns: Vec<Turn>,
}

impl SessionHistory {
    /// Start an empty session
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            turns: Vec::new(),
        }
    }

    /// Session identifier, used to correlate log lines
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append a turn
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Turn::user(content));
    }

    /// Append an assistant turn
    pub fn push_assistant(&mut self, answer: AnswerResult) {
        self.push(Turn::assistant(answer));
    }

    /// Record a failed resolution as an assistant turn without sources,
    /// so user and assistant turns keep alternating.
    pub fn push_failure(&mut self, message: impl Into<String>) {
        self.push_assistant(AnswerResult::unattributed(message));
    }

    /// Turns in insertion order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Most recent turn
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the session has no turns
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn and start a fresh session id.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.id = Uuid::new_v4().to_string();
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}
