//! LlmProvider trait definition.
//!
//! The single abstraction the turn coordinator talks to. Uses RPITIT for
//! `complete` and `Pin<Box<dyn Stream>>` for `stream` (the stream has to be
//! a concrete nameable type so it can be moved into spawned tasks).

use std::pin::Pin;

use futures_util::Stream;

use vigora_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// Trait for LLM provider backends (Gemini, etc.).
///
/// Implementations live in vigora-infra (e.g., `GeminiProvider`). The
/// provider is treated as unreliable (network) and stateless: the full
/// conversation context travels on every request.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// The model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events
    /// terminated by [`StreamEvent::Done`]; a stream that ends without
    /// `Done` was truncated and must be treated as failed.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
