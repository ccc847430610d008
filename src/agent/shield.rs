use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{prior_turns, ReasoningLoop, ResolutionObserver};
use crate::error::{
    AgentError, AppError, AppResult, SynthError, SynthResult, SERVICE_UNAVAILABLE_MESSAGE,
};
use crate::prompts::DIRECT_ANSWER_PROMPT;
use crate::session::Turn;
use crate::synth::{CompletionRequest, Message, Synthesizer};

/// Which tier produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerPath {
    /// The tool-using reasoning loop
    Agent,
    /// The direct, tool-less completion
    Direct,
}

/// Two-tier resolution: reasoning loop first, direct completion second.
///
/// When both tiers fail the caller receives a single
/// [`AppError::ServiceUnavailable`].
#[derive(Clone)]
pub struct FailureShield {
    reasoning: ReasoningLoop,
    synthesizer: Arc<dyn Synthesizer>,
    streaming: bool,
    call_timeout: Duration,
}

impl FailureShield {
    /// Wrap a reasoning loop. `synthesizer` serves the direct fallback.
    pub fn new(
        reasoning: ReasoningLoop,
        synthesizer: Arc<dyn Synthesizer>,
        streaming: bool,
        call_timeout: Duration,
    ) -> Self {
        Self {
            reasoning,
            synthesizer,
            streaming,
            call_timeout,
        }
    }

    /// The wrapped reasoning loop
    pub fn reasoning(&self) -> &ReasoningLoop {
        &self.reasoning
    }

    /// Swap the wrapped reasoning loop
    pub fn with_reasoning(mut self, reasoning: ReasoningLoop) -> Self {
        self.reasoning = reasoning;
        self
    }

    /// Resolve a query through whichever tier succeeds first.
    pub async fn resolve(
        &self,
        query: &str,
        history: &[Turn],
        cancel: &CancellationToken,
        observer: &mut dyn ResolutionObserver,
    ) -> AppResult<(String, AnswerPath)> {
        let agent_error = match self
            .reasoning
            .resolve_with(query, history, cancel, observer)
            .await
        {
            Ok(text) => return Ok((text, AnswerPath::Agent)),
            Err(AgentError::Cancelled) => return Err(AppError::Cancelled),
            Err(e) => e,
        };

        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        warn!(error = %agent_error, "Reasoning loop failed, falling back to direct completion");
        observer.on_fallback(&agent_error);

        match self.direct(query, history, observer).await {
            Ok(text) => {
                info!("Direct completion fallback succeeded");
                Ok((text, AnswerPath::Direct))
            }
            Err(fallback_error) => {
                error!(
                    agent_error = %agent_error,
                    fallback_error = %fallback_error,
                    "Both resolution tiers failed"
                );
                Err(AppError::ServiceUnavailable {
                    message: SERVICE_UNAVAILABLE_MESSAGE.to_string(),
                    cause: format!("agent: {}; fallback: {}", agent_error, fallback_error),
                })
            }
        }
    }

    /// Single-shot completion without tools.
    async fn direct(
        &self,
        query: &str,
        history: &[Turn],
        observer: &mut dyn ResolutionObserver,
    ) -> SynthResult<String> {
        let mut messages = vec![Message::system(DIRECT_ANSWER_PROMPT)];
        messages.extend(prior_turns(history, query).iter().map(Turn::to_message));
        messages.push(Message::user(query));
        let request = CompletionRequest::new(messages);

        let text = if self.streaming {
            self.direct_streamed(request, observer).await?
        } else {
            match timeout(self.call_timeout, self.synthesizer.complete(request)).await {
                Ok(result) => result?,
                Err(_) => return Err(self.timeout_error()),
            }
        };

        if text.trim().is_empty() {
            return Err(SynthError::InvalidResponse {
                message: "Direct completion was empty".to_string(),
            });
        }
        Ok(text)
    }

    async fn direct_streamed(
        &self,
        request: CompletionRequest,
        observer: &mut dyn ResolutionObserver,
    ) -> SynthResult<String> {
        let mut stream = match timeout(self.call_timeout, self.synthesizer.complete_stream(request))
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(self.timeout_error()),
        };

        let mut text = String::new();
        // Bounded wait between chunks rather than for the whole answer.
        loop {
            match timeout(self.call_timeout, stream.next()).await {
                Ok(Some(chunk)) => {
                    let chunk = chunk?;
                    observer.on_chunk(&chunk);
                    text.push_str(&chunk);
                }
                Ok(None) => break,
                Err(_) => return Err(self.timeout_error()),
            }
        }
        Ok(text)
    }

    fn timeout_error(&self) -> SynthError {
        SynthError::Timeout {
            timeout_ms: self.call_timeout.as_millis() as u64,
        }
    }
}
