use crate::error::Result;
use crate::llm::models::LlmMessage;
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Incrementally produced reply text.
///
/// Each item is one chunk as the provider emitted it. The stream owns its network
/// handle, so dropping it releases the upstream connection.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Configuration for LLM completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionConfig {
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

/// Abstract interface for LLM providers
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Submit a conversation and open a stream over the reply.
    ///
    /// Errors that happen before the provider starts answering (connection
    /// failures, non-success status codes) are returned directly. Errors after
    /// that arrive as items of the stream.
    async fn complete_stream(
        &self,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<TextStream>;
}
