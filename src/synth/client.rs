use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{ChatRequest, ChatResponse, ChatStreamChunk, CompletionRequest};
use super::{ChunkStream, Synthesizer};
use crate::config::{RequestConfig, SynthConfig};
use crate::error::{SynthError, SynthResult};

/// Client for an OpenAI-compatible chat completions API
#[derive(Clone)]
pub struct SynthClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    request_config: RequestConfig,
}

impl SynthClient {
    /// Create a new completion client
    pub fn new(config: &SynthConfig, request_config: RequestConfig) -> SynthResult<Self> {
        // Per-request timeouts are applied in execute_request; a client-wide
        // timeout would also cut off long-running streams.
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(SynthError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// Call the completion endpoint, retrying transient failures with backoff
    async fn call_with_retry(&self, request: ChatRequest) -> SynthResult<ChatResponse> {
        let url = self.completions_url();

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    model = %self.model,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying completion request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(response) => {
                    info!(
                        model = %self.model,
                        latency_ms = start.elapsed().as_millis(),
                        "Completion request succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    error!(
                        model = %self.model,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Completion request failed"
                    );
                    let retryable = is_retryable(&e);
                    last_error = Some(e);
                    retries += 1;
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(SynthError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Execute a single request (internal)
    async fn execute_request(&self, url: &str, request: &ChatRequest) -> SynthResult<ChatResponse> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Calling completion service"
        );

        let response = self
            .client
            .post(url)
            .timeout(Duration::from_millis(self.request_config.timeout_ms))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SynthError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| SynthError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }

    fn map_send_error(&self, e: reqwest::Error) -> SynthError {
        if e.is_timeout() {
            SynthError::Timeout {
                timeout_ms: self.request_config.timeout_ms,
            }
        } else {
            SynthError::Http(e)
        }
    }
}

/// Client errors other than rate limiting will not improve on retry.
fn is_retryable(error: &SynthError) -> bool {
    match error {
        SynthError::Api { status, .. } => *status == 429 || *status >= 500,
        _ => true,
    }
}

#[async_trait]
impl Synthesizer for SynthClient {
    async fn complete(&self, request: CompletionRequest) -> SynthResult<String> {
        let request = ChatRequest::new(&self.model, self.temperature, request);
        let response = self.call_with_retry(request).await?;

        response.into_text().ok_or_else(|| SynthError::InvalidResponse {
            message: "Completion contained no choices".to_string(),
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> SynthResult<ChunkStream> {
        let request = ChatRequest::new(&self.model, self.temperature, request).with_stream(true);

        debug!(model = %self.model, "Opening completion stream");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SynthError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let stream = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                let done = matches!(event, Ok(sse) if sse.data.trim() == "[DONE]");
                futures::future::ready(!done)
            })
            .filter_map(|event| async move {
                match event {
                    Ok(sse) => match serde_json::from_str::<ChatStreamChunk>(&sse.data) {
                        Ok(chunk) => chunk.delta_text().map(Ok),
                        Err(e) => Some(Err(SynthError::InvalidResponse {
                            message: format!("SSE parsing error: {}, data: {}", e, sse.data),
                        })),
                    },
                    Err(e) => Some(Err(SynthError::InvalidResponse {
                        message: format!("SSE stream error: {}", e),
                    })),
                }
            });

        Ok(Box::pin(stream))
    }
}
