//! Shared fakes for the HTTP integration tests

#![allow(dead_code)]

use async_stream::stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use smith_backend::{
    agent::{AgentGraph, AgentRequest, RelatedQuestions},
    api,
    error::ProviderError,
    providers::{ChatProvider, Message, ProviderRouter, TextStream, ToolSpec},
    state::{AppState, SessionRegistry},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Provider streaming a fixed script of tokens
pub struct FakeProvider {
    tokens: Vec<String>,
    token_delay: Duration,
    completion: String,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(tokens: &[&str]) -> Arc<Self> {
        Self::slow(tokens, Duration::ZERO)
    }

    pub fn slow(tokens: &[&str], token_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            token_delay,
            completion: r#"["What is next?", "Why?", "How?", "When?"]"#.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of upstream calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn stream_chat(
        &self,
        _model: &str,
        _messages: &[Message],
    ) -> Result<TextStream, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tokens = self.tokens.clone();
        let delay = self.token_delay;
        Ok(stream! {
            for token in tokens {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(token);
            }
        }
        .boxed())
    }

    async fn complete(&self, _model: &str, _messages: &[Message]) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.completion.clone())
    }

    async fn invoke(
        &self,
        _model: &str,
        _messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<Message, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Message::assistant(self.completion.clone()))
    }
}

/// Agent that waits, then answers with a fixed transcript
pub struct FakeAgent {
    delay: Duration,
    answer: Result<String, String>,
    runs: AtomicUsize,
}

impl FakeAgent {
    pub fn answering(answer: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            answer: Ok(answer.to_string()),
            runs: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            answer: Err(message.to_string()),
            runs: AtomicUsize::new(0),
        })
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentGraph for FakeAgent {
    async fn run(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<Message>, ProviderError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }
        match &self.answer {
            Ok(answer) => Ok(vec![
                Message::user(request.message),
                Message::assistant(answer.clone()),
            ]),
            Err(message) => Err(ProviderError::Stream(message.clone())),
        }
    }
}

/// State routing every model to `provider`
pub fn state_with(provider: Arc<FakeProvider>, agent: Arc<FakeAgent>) -> AppState {
    state_with_sessions(provider, agent, SessionRegistry::in_memory())
}

/// Like `state_with`, but sharing `sessions` so tests can inspect it
pub fn state_with_sessions(
    provider: Arc<FakeProvider>,
    agent: Arc<FakeAgent>,
    sessions: SessionRegistry,
) -> AppState {
    let router = Arc::new(ProviderRouter::new().with_fallback(provider));
    let related = Arc::new(RelatedQuestions::new(router.clone(), 3));
    AppState::new(router, agent, related)
        .with_sessions(sessions)
        .with_poll_interval(Duration::from_millis(20))
}

/// Router wired to `state`, with CORS for the default origin
pub fn app(state: AppState) -> axum::Router {
    api::router(state).layer(
        api::cors_layer(smith_backend::config::DEFAULT_ALLOW_ORIGIN).expect("valid origin"),
    )
}

/// `data:` payloads of an SSE body, in order
pub fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|event| !event.is_empty())
        .map(|event| {
            event
                .lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect()
}
