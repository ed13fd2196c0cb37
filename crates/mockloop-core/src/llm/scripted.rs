//! Scripted generation backend.
//!
//! Replays queued responses in order. When the queue is empty it answers
//! with a well-formed decision payload carrying a numbered question, which
//! makes the `scripted` provider usable for dry runs without network access.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::Stream;

use mockloop_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};

use super::provider::LlmProvider;

enum Scripted {
    Text(String),
    Fail(String),
}

/// Deterministic provider that replays canned responses.
pub struct ScriptedProvider {
    name: String,
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Queue responses, returned in order before falling back to the default.
    pub fn with_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock_responses()
            .extend(responses.into_iter().map(|r| Scripted::Text(r.into())));
        self
    }

    /// Wait this long before every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.lock_responses().push_back(Scripted::Text(response.into()));
    }

    /// Make the next call fail with a provider error.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_responses().push_back(Scripted::Fail(message.into()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_response(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        match self.lock_responses().pop_front() {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Fail(message)) => Err(LlmError::Provider { message }),
            None => Ok(default_response(n)),
        }
    }
}

/// A payload that satisfies both the turn decision and the final assessment.
fn default_response(n: usize) -> String {
    serde_json::json!({
        "evaluation": "The answer covers the fundamentals of the topic.",
        "next_question": format!(
            "Question {n}: walk me through a problem you solved recently and the trade-offs you weighed."
        ),
        "need_followup": false,
        "need_end": false,
        "final_score": 80,
        "feedback_summary": "Clear communication and solid fundamentals.",
    })
    .to_string()
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn max_tokens(&self) -> u32 {
        1024
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let content = self.next_response(request)?;
        Ok(CompletionResponse {
            id: format!("scripted-{}", self.call_count()),
            usage: Usage {
                input_tokens: 0,
                output_tokens: content.split_whitespace().count() as u32,
            },
            content,
            model: "scripted".to_string(),
            stop_reason: StopReason::EndTurn,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let next = self.next_response(&request);
        let delay = self.delay;
        Box::pin(async_stream::try_stream! {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let content = next?;
            for chunk in content.split_inclusive(' ') {
                yield StreamEvent::TextDelta { text: chunk.to_string() };
            }
            yield StreamEvent::MessageDelta { stop_reason: StopReason::EndTurn };
            yield StreamEvent::Done;
        })
    }
}
