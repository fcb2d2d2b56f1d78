//! Mock generation client for testing.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::ports::{GenerationClient, GenerationError, GenerationRequest, GenerationResponse};

/// Scripted reply for a generation call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(GenerationError),
    /// Never returns; for timeout and cancellation tests
    Hang,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(GenerationError::ApiError {
            status: 500,
            message: message.into(),
        })
    }
}

impl Default for MockReply {
    fn default() -> Self {
        Self::text("Mock generation completed successfully.")
    }
}

/// Observable call boundary, keyed by agent step id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Started(Option<String>),
    Finished(Option<String>),
}

/// Mock client with per-step and queued replies.
///
/// Reply precedence: queued replies first, then the reply registered for the
/// request's step id, then the default.
#[derive(Debug, Default)]
pub struct MockGenerationClient {
    default_reply: MockReply,
    step_replies: RwLock<HashMap<String, MockReply>>,
    queued: Mutex<VecDeque<MockReply>>,
    delay: Duration,
    calls: RwLock<Vec<GenerationRequest>>,
    events: RwLock<Vec<CallEvent>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    pub fn with_step_reply(mut self, step_id: impl Into<String>, reply: MockReply) -> Self {
        self.step_replies.get_mut().insert(step_id.into(), reply);
        self
    }

    /// Delay every call by `delay` before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn set_step_reply(&self, step_id: impl Into<String>, reply: MockReply) {
        self.step_replies.write().await.insert(step_id.into(), reply);
    }

    pub async fn queue_reply(&self, reply: MockReply) {
        self.queued.lock().await.push_back(reply);
    }

    /// Requests received so far, in arrival order.
    pub async fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.read().await.clone()
    }

    pub async fn events(&self) -> Vec<CallEvent> {
        self.events.read().await.clone()
    }

    async fn next_reply(&self, request: &GenerationRequest) -> MockReply {
        if let Some(reply) = self.queued.lock().await.pop_front() {
            return reply;
        }
        let overrides = self.step_replies.read().await;
        request
            .step_id
            .as_ref()
            .and_then(|id| overrides.get(id))
            .cloned()
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let step_id = request.step_id.clone();
        let reply = self.next_reply(&request).await;
        let model = request.model.clone();
        self.calls.write().await.push(request);
        self.events.write().await.push(CallEvent::Started(step_id.clone()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match reply {
            MockReply::Text(text) => Ok(GenerationResponse { text, model }),
            MockReply::Fail(error) => Err(error),
            MockReply::Hang => std::future::pending().await,
        };
        self.events.write().await.push(CallEvent::Finished(step_id));
        result
    }
}
