//! # Research Agent
//!
//! A research assistant that answers natural-language questions by deciding,
//! per query, whether to consult web search, arXiv or Wikipedia, and returns
//! a single answer annotated with the sources it relied on.
//!
//! ## Features
//!
//! - **Bounded reasoning loop**: Thought/Action/Observation steps over a
//!   catalog of knowledge sources, capped by a step budget
//! - **Failure shield**: tool failures become observations; an unusable
//!   reasoning run falls back to a direct completion
//! - **Provenance**: URLs in the answer are extracted and classified
//! - **Streaming**: incremental answers as a cancellable stream of events
//!
//! ## Architecture
//!
//! ```text
//! Caller → Assistant → FailureShield → ReasoningLoop → SourceCatalog (HTTP)
//!                            ↓                ↓
//!                      direct answer     Synthesizer (HTTP)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use research_agent::{Assistant, Config, SessionHistory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let assistant = Assistant::new(&config)?;
//!     let mut history = SessionHistory::new();
//!
//!     history.push_user("What is retrieval-augmented generation?");
//!     let answer = assistant
//!         .submit_query("What is retrieval-augmented generation?", &history)
//!         .await?;
//!     history.push_assistant(answer.clone());
//!
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```

/// Query resolution: reasoning loop and failure shield.
pub mod agent;
/// Caller-facing API.
pub mod assistant;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Centralized prompt text.
pub mod prompts;
/// Source attribution for answers.
pub mod provenance;
/// Conversation history.
pub mod session;
/// Completion service contract and client.
pub mod synth;
/// Knowledge-source adapters and the source catalog.
pub mod tools;

pub use assistant::{AnswerEvent, AnswerStream, Assistant};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use provenance::{AnswerResult, Source, SourceKind};
pub use session::{SessionHistory, Turn};
