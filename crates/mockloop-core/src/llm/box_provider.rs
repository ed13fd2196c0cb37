//! Type-erased generation backend with deadline-bounded calls.
//!
//! `LlmProvider` uses RPITIT and cannot be a trait object, so providers are
//! erased behind a private object-safe trait with boxed futures. The wrapper
//! also owns the generation deadline: both the buffered and the streamed call
//! fail with `LlmError::Timeout` once the limit passes.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};

use mockloop_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

use super::provider::LlmProvider;

type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

trait ErasedProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    fn max_tokens(&self) -> u32;
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
    fn stream(&self, request: CompletionRequest) -> EventStream;
}

impl<T: LlmProvider> ErasedProvider for T {
    fn name(&self) -> &str {
        LlmProvider::name(self)
    }

    fn model(&self) -> &str {
        LlmProvider::model(self)
    }

    fn max_tokens(&self) -> u32 {
        LlmProvider::max_tokens(self)
    }

    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(LlmProvider::complete(self, request))
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        LlmProvider::stream(self, request)
    }
}

/// A generation backend selected at runtime by name.
pub struct BoxLlmProvider {
    inner: Box<dyn ErasedProvider>,
}

impl BoxLlmProvider {
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn model(&self) -> &str {
        self.inner.model()
    }

    pub fn max_tokens(&self) -> u32 {
        self.inner.max_tokens()
    }

    /// Run a buffered completion, giving up after `limit`.
    pub async fn complete_within(
        &self,
        request: &CompletionRequest,
        limit: Duration,
    ) -> Result<CompletionResponse, LlmError> {
        tokio::time::timeout(limit, self.inner.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(limit.as_secs()))?
    }

    /// Stream a completion that must finish within `limit` of this call.
    ///
    /// On expiry the stream yields one `Err(LlmError::Timeout)` and ends.
    /// A backend error also ends the stream after it is yielded.
    pub fn stream_within(&self, request: CompletionRequest, limit: Duration) -> EventStream {
        let mut events = self.inner.stream(request);
        let deadline = tokio::time::Instant::now() + limit;
        Box::pin(async_stream::stream! {
            loop {
                match tokio::time::timeout_at(deadline, events.next()).await {
                    Err(_) => {
                        yield Err(LlmError::Timeout(limit.as_secs()));
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        yield Err(e);
                        break;
                    }
                    Ok(Some(Ok(event))) => {
                        let done = matches!(event, StreamEvent::Done);
                        yield Ok(event);
                        if done {
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedProvider;
    use mockloop_types::llm::Message;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "scripted".to_string(),
            messages: vec![Message::user("Tell me about yourself")],
            system: None,
            max_tokens: 64,
            temperature: None,
            stream: false,
        }
    }

    #[tokio::test]
    async fn test_complete_within_passes_through() {
        let provider = BoxLlmProvider::new(ScriptedProvider::new("dry").with_responses(["ok"]));
        assert_eq!(provider.name(), "dry");
        let response = provider
            .complete_within(&request(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.content, "ok");
    }

    #[tokio::test]
    async fn test_complete_within_times_out() {
        let provider = BoxLlmProvider::new(
            ScriptedProvider::new("slow").with_delay(Duration::from_secs(3)),
        );
        let err = provider
            .complete_within(&request(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_stream_within_ends_at_done() {
        let provider =
            BoxLlmProvider::new(ScriptedProvider::new("dry").with_responses(["two words"]));
        let events: Vec<_> = provider
            .stream_within(request(), Duration::from_secs(5))
            .collect()
            .await;

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                Ok(StreamEvent::TextDelta { text }) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "two words");
        assert!(matches!(events.last(), Some(Ok(StreamEvent::Done))));
    }

    #[tokio::test]
    async fn test_stream_within_times_out_once() {
        let provider = BoxLlmProvider::new(
            ScriptedProvider::new("slow").with_delay(Duration::from_secs(3)),
        );
        let events: Vec<_> = provider
            .stream_within(request(), Duration::from_secs(1))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(LlmError::Timeout(1))));
    }
}
