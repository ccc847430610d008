//! Completion service contract and client.
//!
//! The orchestrator only depends on [`Synthesizer`]; [`SynthClient`] is the
//! production implementation for OpenAI-compatible chat-completion endpoints.

mod client;
mod types;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use client::*;
pub use types::*;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::SynthResult;

/// Incremental completion output
pub type ChunkStream = Pin<Box<dyn Stream<Item = SynthResult<String>> + Send>>;

/// A large-language-model completion service, treated as a black box.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Return the full completion text for the request.
    async fn complete(&self, request: CompletionRequest) -> SynthResult<String>;

    /// Return the completion as a stream of text chunks.
    ///
    /// The default implementation yields the full completion as one chunk.
    async fn complete_stream(&self, request: CompletionRequest) -> SynthResult<ChunkStream> {
        let text = self.complete(request).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }
}
