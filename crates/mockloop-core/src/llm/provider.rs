//! LlmProvider trait definition.
//!
//! This is the core abstraction that every generation backend implements.
//! Uses RPITIT for `complete`, and `Pin<Box<dyn Stream>>` for `stream`
//! (streams need to be object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use mockloop_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// Trait for generation backends (OpenAI-compatible APIs, scripted replay).
///
/// Implementations live in mockloop-infra (e.g., `OpenAiCompatibleProvider`)
/// and in this crate (`ScriptedProvider`).
pub trait LlmProvider: Send + Sync {
    /// Registry name of this provider (e.g., "deepseek").
    fn name(&self) -> &str;

    /// Model identifier requests are sent with.
    fn model(&self) -> &str;

    /// Default output token limit for this provider.
    fn max_tokens(&self) -> u32;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}

/// Shared providers delegate to the inner provider, so a caller can keep a
/// handle to a provider it has registered.
impl<T: LlmProvider> LlmProvider for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    fn max_tokens(&self) -> u32 {
        (**self).max_tokens()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        (**self).complete(request).await
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        (**self).stream(request)
    }
}
