//! Caller-facing API.
//!
//! An [`Assistant`] is built once per process and shared by every session.
//! It never touches the caller's [`SessionHistory`]; the caller appends the
//! user turn before submitting and the assistant turn after the answer
//! arrives.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::agent::{AnswerPath, FailureShield, ReasoningLoop, ReasoningStep, ResolutionObserver};
use crate::config::{AgentConfig, Config};
use crate::error::{AgentError, AppError, AppResult};
use crate::provenance::AnswerResult;
use crate::session::{SessionHistory, Turn};
use crate::synth::{SynthClient, Synthesizer};
use crate::tools::SourceCatalog;

/// One item of an incremental answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerEvent {
    /// A reasoning step finished; carries a one-line description.
    Step(String),
    /// A piece of the answer text.
    Chunk(String),
    /// The attributed answer. Terminal.
    Done(AnswerResult),
    /// Resolution failed; carries a user-facing message. Terminal.
    Failed(String),
}

impl AnswerEvent {
    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnswerEvent::Done(_) | AnswerEvent::Failed(_))
    }
}

/// Research assistant orchestrating the source catalog and the synthesizer.
#[derive(Clone)]
pub struct Assistant {
    catalog: Arc<SourceCatalog>,
    shield: FailureShield,
}

impl Assistant {
    /// Build the catalog and completion client from configuration.
    pub fn new(config: &Config) -> AppResult<Self> {
        let catalog = SourceCatalog::from_config(&config.sources).map_err(|e| AppError::Config {
            message: format!("Failed to build source catalog: {}", e),
        })?;
        let client = SynthClient::new(&config.synth, config.request.clone()).map_err(|e| {
            AppError::Config {
                message: format!("Failed to create completion client: {}", e),
            }
        })?;

        info!(
            model = %client.model(),
            base_url = %client.base_url(),
            streaming = config.synth.streaming,
            max_steps = config.agent.max_steps,
            "Assistant initialized"
        );

        Ok(Self::with_components(
            Arc::new(catalog),
            Arc::new(client),
            &config.agent,
            config.synth.streaming,
        ))
    }

    /// Assemble an assistant from already-built parts.
    pub fn with_components(
        catalog: Arc<SourceCatalog>,
        synthesizer: Arc<dyn Synthesizer>,
        agent: &AgentConfig,
        streaming: bool,
    ) -> Self {
        let reasoning = ReasoningLoop::new(catalog.clone(), synthesizer.clone(), agent);
        let shield = FailureShield::new(
            reasoning,
            synthesizer,
            streaming,
            Duration::from_millis(agent.synth_timeout_ms),
        );
        Self { catalog, shield }
    }

    /// Override the step budget
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        let reasoning = self.shield.reasoning().clone().with_max_steps(max_steps);
        self.shield = self.shield.with_reasoning(reasoning);
        self
    }

    /// The registered tools
    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    /// Answer a query.
    pub async fn submit_query(
        &self,
        query: &str,
        history: &SessionHistory,
    ) -> AppResult<AnswerResult> {
        self.submit_query_with(query, history, &CancellationToken::new())
            .await
    }

    /// Answer a query, stopping before the next step once `cancel` fires.
    pub async fn submit_query_with(
        &self,
        query: &str,
        history: &SessionHistory,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResult> {
        let query = validate_query(query)?;
        let (text, path) = self
            .shield
            .resolve(query, history.turns(), cancel, &mut ())
            .await?;
        Ok(attribute(text, path))
    }

    /// Answer a query incrementally.
    ///
    /// Resolution runs on a spawned task. The stream ends after exactly one
    /// [`AnswerEvent::Done`] or [`AnswerEvent::Failed`]; dropping it cancels
    /// the resolution before its next step.
    pub fn submit_query_stream(&self, query: &str, history: &SessionHistory) -> AnswerStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let stream = AnswerStream {
            inner: UnboundedReceiverStream::new(rx),
            cancel: cancel.clone(),
            _guard: cancel.clone().drop_guard(),
        };

        let query = match validate_query(query) {
            Ok(query) => query.to_string(),
            Err(e) => {
                let _ = tx.send(AnswerEvent::Failed(e.user_message()));
                return stream;
            }
        };

        let shield = self.shield.clone();
        let turns: Vec<Turn> = history.turns().to_vec();
        tokio::spawn(async move {
            let mut observer = ChannelObserver {
                tx: tx.clone(),
                cancel: cancel.clone(),
                chunked: false,
            };
            let outcome = shield.resolve(&query, &turns, &cancel, &mut observer).await;

            let event = match outcome {
                Ok((text, path)) => {
                    if !observer.chunked {
                        let _ = tx.send(AnswerEvent::Chunk(text.clone()));
                    }
                    AnswerEvent::Done(attribute(text, path))
                }
                Err(AppError::Cancelled) => {
                    debug!("Streamed resolution cancelled");
                    AnswerEvent::Failed(AppError::Cancelled.user_message())
                }
                Err(e) => {
                    warn!(error = %e, "Streamed resolution failed");
                    AnswerEvent::Failed(e.user_message())
                }
            };
            let _ = tx.send(event);
        });

        stream
    }
}

/// Incremental answer returned by [`Assistant::submit_query_stream`].
///
/// Finite and not restartable.
pub struct AnswerStream {
    inner: UnboundedReceiverStream<AnswerEvent>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl AnswerStream {
    /// Token that cancels the underlying resolution
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the resolution before its next step.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Stream for AnswerStream {
    type Item = AnswerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Forwards progress into the event channel.
struct ChannelObserver {
    tx: mpsc::UnboundedSender<AnswerEvent>,
    cancel: CancellationToken,
    chunked: bool,
}

impl ChannelObserver {
    fn send(&self, event: AnswerEvent) {
        // Nobody is listening any more.
        if self.tx.send(event).is_err() {
            self.cancel.cancel();
        }
    }
}

impl ResolutionObserver for ChannelObserver {
    fn on_step(&mut self, step: &ReasoningStep) {
        self.send(AnswerEvent::Step(describe_step(step)));
    }

    fn on_fallback(&mut self, reason: &AgentError) {
        debug!(reason = %reason, "Streaming direct answer");
    }

    fn on_chunk(&mut self, chunk: &str) {
        self.chunked = true;
        self.send(AnswerEvent::Chunk(chunk.to_string()));
    }
}

fn describe_step(step: &ReasoningStep) -> String {
    match &step.tool {
        Some(tool) => format!("Consulted {} for \"{}\"", tool, step.tool_input),
        None => "Reformatting the previous step".to_string(),
    }
}

fn validate_query(query: &str) -> AppResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::Validation {
            field: "query".to_string(),
            reason: "cannot be empty".to_string(),
        });
    }
    Ok(query)
}

fn attribute(text: String, path: AnswerPath) -> AnswerResult {
    let answer = AnswerResult::from_text(text);
    info!(
        path = ?path,
        sources = answer.sources.len(),
        "Answer attributed"
    );
    answer
}
