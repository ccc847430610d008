//! Query resolution: the bounded reasoning loop and the failure shield
//! around it.

mod reasoning;
mod shield;
mod step;

pub use reasoning::*;
pub use shield::*;
pub use step::*;

use crate::error::AgentError;
use crate::session::{Role, Turn};

/// Progress callbacks for a single resolution.
///
/// All methods default to doing nothing.
pub trait ResolutionObserver: Send {
    /// A think-act-observe step completed.
    fn on_step(&mut self, _step: &ReasoningStep) {}

    /// The reasoning loop failed and the direct fallback is starting.
    fn on_fallback(&mut self, _reason: &AgentError) {}

    /// A chunk of the direct fallback answer arrived.
    fn on_chunk(&mut self, _chunk: &str) {}
}

impl ResolutionObserver for () {}

/// History preceding the query.
///
/// Callers append the user turn before submitting, so a trailing user turn
/// with the same text is dropped to keep the question from appearing twice.
pub(crate) fn prior_turns<'a>(history: &'a [Turn], query: &str) -> &'a [Turn] {
    match history.split_last() {
        Some((last, rest)) if last.role == Role::User && last.content.trim() == query.trim() => {
            rest
        }
        _ => history,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::{ReasoningStep, ResolutionObserver};
    use crate::error::{AgentError, SynthError, SynthResult, ToolError, ToolResult};
    use crate::synth::{CompletionRequest, Synthesizer};
    use crate::tools::{KnowledgeSource, SourceCatalog, ToolSpec};

    /// Synthesizer replaying a fixed script of completions.
    #[derive(Default)]
    pub struct ScriptedSynthesizer {
        script: Mutex<VecDeque<SynthResult<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedSynthesizer {
        pub fn new(script: Vec<SynthResult<String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        /// Answer every request only after `delay`.
        pub fn with_delay(script: Vec<SynthResult<String>>, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(script)
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn request(&self, index: usize) -> Option<CompletionRequest> {
            self.requests.lock().unwrap().get(index).cloned()
        }
    }

    #[async_trait]
    impl Synthesizer for ScriptedSynthesizer {
        async fn complete(&self, request: CompletionRequest) -> SynthResult<String> {
            self.requests.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(SynthError::Unavailable {
                        message: "script exhausted".to_string(),
                        retries: 0,
                    })
                })
        }
    }

    pub struct StaticSource {
        name: String,
        reply: String,
        delay: Option<Duration>,
    }

    impl StaticSource {
        pub fn boxed(name: &str, reply: &str) -> Arc<dyn KnowledgeSource> {
            Arc::new(Self {
                name: name.to_string(),
                reply: reply.to_string(),
                delay: None,
            })
        }

        pub fn slow(name: &str, delay: Duration) -> Arc<dyn KnowledgeSource> {
            Arc::new(Self {
                name: name.to_string(),
                reply: "late".to_string(),
                delay: Some(delay),
            })
        }
    }

    #[async_trait]
    impl KnowledgeSource for StaticSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "static test source"
        }

        async fn invoke(&self, _input: &str) -> ToolResult<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.reply.clone())
        }
    }

    pub struct FailingSource {
        name: String,
    }

    impl FailingSource {
        pub fn boxed(name: &str) -> Arc<dyn KnowledgeSource> {
            Arc::new(Self {
                name: name.to_string(),
            })
        }
    }

    #[async_trait]
    impl KnowledgeSource for FailingSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn invoke(&self, _input: &str) -> ToolResult<String> {
            Err(ToolError::Http {
                tool: self.name.clone(),
                message: "connection refused".to_string(),
            })
        }
    }

    pub fn catalog_with(sources: Vec<Arc<dyn KnowledgeSource>>) -> SourceCatalog {
        let mut catalog = SourceCatalog::new();
        for source in sources {
            catalog.register(ToolSpec::new(source, 10_000));
        }
        catalog
    }

    /// Observer that records everything it is told.
    #[derive(Default)]
    pub struct StepRecorder {
        pub steps: Vec<ReasoningStep>,
        pub chunks: Vec<String>,
        pub fell_back: bool,
        cancel_on_step: Option<CancellationToken>,
    }

    impl StepRecorder {
        /// Cancel `token` as soon as the first step is reported.
        pub fn cancelling(token: CancellationToken) -> Self {
            Self {
                cancel_on_step: Some(token),
                ..Self::default()
            }
        }
    }

    impl ResolutionObserver for StepRecorder {
        fn on_step(&mut self, step: &ReasoningStep) {
            self.steps.push(step.clone());
            if let Some(token) = &self.cancel_on_step {
                token.cancel();
            }
        }

        fn on_fallback(&mut self, _reason: &AgentError) {
            self.fell_back = true;
        }

        fn on_chunk(&mut self, chunk: &str) {
            self.chunks.push(chunk.to_string());
        }
    }
}
