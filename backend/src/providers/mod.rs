//! Upstream model providers
//!
//! Every provider sits behind the `ChatProvider` trait so the relay, the agent
//! loop and the related-questions generator never see provider wire formats.
//! `ProviderRouter` picks the provider for a model id.

pub mod gemini;
pub mod gemini_types;
pub mod openai_compat;
pub mod router;
pub mod types;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderKind, ProviderRouter, RoutedModel};
pub use types::{Message, Role, ToolCall, ToolSpec};

use crate::error::ProviderError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::time::Duration;

/// Stream of text fragments produced by a provider
pub type TextStream = BoxStream<'static, Result<String, ProviderError>>;

/// A chat-capable model provider
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Start a streamed completion, yielding text fragments as they arrive
    async fn stream_chat(&self, model: &str, messages: &[Message])
        -> Result<TextStream, ProviderError>;

    /// Run a single non-streamed completion
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String, ProviderError>;

    /// Run a single completion whose answer should be JSON
    ///
    /// Providers with a native JSON response mode override this; the prompt
    /// alone asks for JSON otherwise.
    async fn complete_json(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<String, ProviderError> {
        self.complete(model, messages).await
    }

    /// Run one agent turn, letting the model request any of `tools`
    async fn invoke(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ProviderError>;
}

/// Convert an event-source failure into a `ProviderError`, reading the
/// response body when the provider answered with an error status
pub(crate) async fn event_source_error(
    provider: &'static str,
    error: reqwest_eventsource::Error,
) -> ProviderError {
    use reqwest_eventsource::Error;

    match error {
        Error::InvalidStatusCode(status, response) => ProviderError::Api {
            provider,
            status: status.as_u16(),
            body: response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string()),
        },
        Error::Transport(e) => ProviderError::Http(e),
        other => ProviderError::Stream(other.to_string()),
    }
}

/// Build the HTTP client shared by all providers
///
/// Only the connect phase is bounded: a total request timeout would cut long
/// token streams.
pub fn build_http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(16)
        .build()
        .map_err(ProviderError::from)
}
