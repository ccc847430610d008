use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::step::{corrective_observation, parse_step, ReasoningStep, StepAction};
use super::{prior_turns, ResolutionObserver};
use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult, ParseError, SynthError, ToolError};
use crate::prompts::{OBSERVATION_STOP, REACT_INSTRUCTIONS};
use crate::session::Turn;
use crate::synth::{CompletionRequest, Message, Synthesizer};
use crate::tools::{SourceCatalog, ToolSpec};

/// Bounded think-act-observe loop over the source catalog.
///
/// Steps run strictly in sequence: each prompt includes every earlier
/// observation. Tool failures and malformed steps become observations;
/// only an unreachable synthesizer, cancellation, or an exhausted step
/// budget end the loop without an answer.
#[derive(Clone)]
pub struct ReasoningLoop {
    catalog: Arc<SourceCatalog>,
    synthesizer: Arc<dyn Synthesizer>,
    max_steps: usize,
    tool_timeout: Duration,
    synth_timeout: Duration,
}

impl ReasoningLoop {
    /// Create a loop over a catalog and synthesizer
    pub fn new(
        catalog: Arc<SourceCatalog>,
        synthesizer: Arc<dyn Synthesizer>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            catalog,
            synthesizer,
            max_steps: config.max_steps.max(1),
            tool_timeout: Duration::from_millis(config.tool_timeout_ms),
            synth_timeout: Duration::from_millis(config.synth_timeout_ms),
        }
    }

    /// Override the step budget (at least one step)
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Step budget
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Resolve a query to final answer text.
    pub async fn resolve(
        &self,
        query: &str,
        history: &[Turn],
        cancel: &CancellationToken,
    ) -> AgentResult<String> {
        self.resolve_with(query, history, cancel, &mut ()).await
    }

    /// Resolve a query, reporting each completed step to `observer`.
    pub async fn resolve_with(
        &self,
        query: &str,
        history: &[Turn],
        cancel: &CancellationToken,
        observer: &mut dyn ResolutionObserver,
    ) -> AgentResult<String> {
        let start = Instant::now();
        let history = prior_turns(history, query);
        let instructions = self.render_instructions();
        let mut steps: Vec<ReasoningStep> = Vec::new();

        for step_index in 0..self.max_steps {
            if cancel.is_cancelled() {
                info!(step = step_index, "Resolution cancelled");
                return Err(AgentError::Cancelled);
            }

            let request = CompletionRequest::new(self.build_messages(
                &instructions,
                query,
                history,
                &steps,
            ))
            .with_stop(OBSERVATION_STOP);

            let output = self.call_synthesizer(request).await?;
            debug!(step = step_index, output = %output, "Synthesizer step output");

            let step = match parse_step(&output) {
                Ok(StepAction::FinalAnswer { text, .. }) => {
                    info!(
                        steps = step_index + 1,
                        latency_ms = start.elapsed().as_millis(),
                        "Reasoning loop produced a final answer"
                    );
                    return Ok(text);
                }
                Ok(StepAction::ToolCall {
                    thought,
                    tool,
                    input,
                }) => match self.catalog.get(&tool) {
                    Some(spec) => ReasoningStep {
                        thought,
                        tool: Some(spec.name().to_string()),
                        observation: self.invoke_tool(spec, &input).await,
                        tool_input: input,
                        log: output.trim().to_string(),
                    },
                    None => {
                        let error = ParseError::UnknownTool {
                            name: tool,
                            available: self.catalog.names().join(", "),
                        };
                        self.rejected_step(step_index, &output, thought, input, &error)
                    }
                },
                Err(error) => {
                    self.rejected_step(step_index, &output, String::new(), String::new(), &error)
                }
            };

            observer.on_step(&step);
            steps.push(step);
        }

        warn!(
            max_steps = self.max_steps,
            latency_ms = start.elapsed().as_millis(),
            "Step budget exhausted without a final answer"
        );
        Err(AgentError::Exhaustion {
            max_steps: self.max_steps,
        })
    }

    /// Record an unusable step with a corrective observation.
    fn rejected_step(
        &self,
        step_index: usize,
        output: &str,
        thought: String,
        tool_input: String,
        error: &ParseError,
    ) -> ReasoningStep {
        warn!(step = step_index, error = %error, "Unusable synthesizer step");
        ReasoningStep {
            thought,
            tool: None,
            tool_input,
            observation: corrective_observation(error),
            log: output.trim().to_string(),
        }
    }

    async fn call_synthesizer(&self, request: CompletionRequest) -> AgentResult<String> {
        match timeout(self.synth_timeout, self.synthesizer.complete(request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SynthError::Timeout {
                timeout_ms: self.synth_timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    /// Invoke a tool, turning any failure into observation text.
    async fn invoke_tool(&self, spec: &ToolSpec, input: &str) -> String {
        let start = Instant::now();
        let result = match timeout(self.tool_timeout, spec.invoke(input)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool: spec.name().to_string(),
                timeout_ms: self.tool_timeout.as_millis() as u64,
            }),
        };
        let latency = start.elapsed().as_millis();

        match result {
            Ok(text) => {
                info!(
                    tool = %spec.name(),
                    latency_ms = latency,
                    chars = text.chars().count(),
                    "Tool invocation succeeded"
                );
                text
            }
            Err(e) => {
                warn!(
                    tool = %spec.name(),
                    error = %e,
                    latency_ms = latency,
                    "Tool invocation failed"
                );
                format!("Tool error: {}. Try a different tool or input.", e)
            }
        }
    }

    fn render_instructions(&self) -> String {
        let tools = self
            .catalog
            .list()
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");

        REACT_INSTRUCTIONS
            .replace("{tools}", &tools)
            .replace("{tool_names}", &self.catalog.names().join(", "))
    }

    fn build_messages(
        &self,
        instructions: &str,
        query: &str,
        history: &[Turn],
        steps: &[ReasoningStep],
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(instructions));
        messages.extend(history.iter().map(Turn::to_message));

        let scratchpad: String = steps.iter().map(ReasoningStep::scratchpad).collect();
        messages.push(Message::user(format!(
            "Question: {}\nThought:{}",
            query, scratchpad
        )));

        messages
    }
}
