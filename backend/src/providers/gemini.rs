//! Gemini API client
//!
//! Direct HTTP client for the Gemini native API, used for streamed chat
//! (`streamGenerateContent` over SSE) and single completions
//! (`generateContent`). Tool-calling turns go through Google's
//! OpenAI-compatible endpoint instead.

use super::gemini_types::{
    GeminiApiRequest, GeminiApiResponse, GenerationConfig, RequestContent, RequestPart,
};
use super::openai_compat::{OpenAiCompatProvider, GOOGLE_COMPAT_API_BASE};
use super::types::{Message, Role, ToolSpec};
use super::{event_source_error, ChatProvider, TextStream};
use crate::error::ProviderError;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, EventSource};

const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    tools: OpenAiCompatProvider,
}

impl GeminiProvider {
    /// Create a provider against the public Gemini endpoints
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let tools =
            OpenAiCompatProvider::new("google", client.clone(), &api_key, GOOGLE_COMPAT_API_BASE);
        Self::with_base_url(client, api_key, GEMINI_API_BASE_URL, tools)
    }

    /// Create a provider with custom endpoints (for testing)
    pub fn with_base_url(
        client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        tools: OpenAiCompatProvider,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tools,
        }
    }

    /// Run a single completion, optionally forcing a JSON response
    ///
    /// # Errors
    /// * `ProviderError::Api` if Gemini answers with an error status
    /// * `ProviderError::Blocked` if the prompt was refused
    /// * `ProviderError::Empty` if no text came back
    pub async fn generate(
        &self,
        model: &str,
        messages: &[Message],
        force_json: bool,
    ) -> Result<String, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Parse("API key is empty".to_string()));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let generation_config = force_json.then(|| GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
        });
        let request_body = build_request(messages, generation_config);

        tracing::debug!(
            model = %model,
            force_json = force_json,
            messages = messages.len(),
            "Calling Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status.as_u16(),
                error_body = %error_body,
                "Gemini API returned error status"
            );

            return Err(ProviderError::Api {
                provider: "google",
                status: status.as_u16(),
                body: error_body,
            });
        }

        let response_body = response.text().await?;
        let parsed: GeminiApiResponse = serde_json::from_str(&response_body).map_err(|e| {
            ProviderError::Parse(format!("{} - Response body: {}", e, response_body))
        })?;

        if let Some(reason) = parsed.block_reason() {
            return Err(ProviderError::Blocked(reason.to_string()));
        }

        let text = parsed.text();
        if text.is_empty() {
            return Err(ProviderError::Empty("Gemini API"));
        }

        tracing::debug!(
            response_len = text.len(),
            "Successfully received response from Gemini API"
        );

        Ok(text)
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<TextStream, ProviderError> {
        let url = format!("{}/models/{}:streamGenerateContent", self.base_url, model);
        let request = self
            .client
            .post(&url)
            .query(&[("alt", "sse"), ("key", self.api_key.as_str())])
            .json(&build_request(messages, None));

        let mut source =
            EventSource::new(request).map_err(|e| ProviderError::Stream(e.to_string()))?;

        tracing::debug!(model = %model, "Opened Gemini stream");

        let stream = async_stream::stream! {
            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => continue,
                    Ok(Event::Message(message)) => {
                        match serde_json::from_str::<GeminiApiResponse>(&message.data) {
                            Ok(chunk) => {
                                if let Some(reason) = chunk.block_reason() {
                                    yield Err(ProviderError::Blocked(reason.to_string()));
                                    break;
                                }
                                let text = chunk.text();
                                if !text.is_empty() {
                                    yield Ok(text);
                                }
                            }
                            Err(e) => {
                                yield Err(ProviderError::Parse(format!(
                                    "Failed to parse Gemini chunk: {}",
                                    e
                                )));
                                break;
                            }
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        yield Err(event_source_error("google", e).await);
                        break;
                    }
                }
            }
            source.close();
        };

        Ok(Box::pin(stream))
    }

    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String, ProviderError> {
        self.generate(model, messages, false).await
    }

    async fn complete_json(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<String, ProviderError> {
        self.generate(model, messages, true).await
    }

    async fn invoke(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ProviderError> {
        self.tools.invoke(model, messages, tools).await
    }
}

/// Map provider-agnostic messages onto Gemini turns
///
/// System messages become the system instruction; tool traffic has no
/// native-API counterpart here and is dropped.
fn build_request(
    messages: &[Message],
    generation_config: Option<GenerationConfig>,
) -> GeminiApiRequest {
    let system: Vec<RequestPart> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| RequestPart {
            text: m.content.clone(),
        })
        .collect();

    let contents = messages
        .iter()
        .filter_map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant if !m.content.is_empty() => "model",
                _ => return None,
            };
            Some(RequestContent {
                role: Some(role),
                parts: vec![RequestPart {
                    text: m.content.clone(),
                }],
            })
        })
        .collect();

    GeminiApiRequest {
        contents,
        system_instruction: (!system.is_empty()).then(|| RequestContent {
            role: None,
            parts: system,
        }),
        generation_config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    fn provider(base_url: &str) -> GeminiProvider {
        let client = reqwest::Client::new();
        let tools = OpenAiCompatProvider::new("google", client.clone(), "test-key", base_url);
        GeminiProvider::with_base_url(client, "test-key", base_url, tools)
    }

    #[tokio::test]
    async fn test_generate_empty_api_key() {
        let client = reqwest::Client::new();
        let tools = OpenAiCompatProvider::new("google", client.clone(), "", "http://localhost");
        let provider = GeminiProvider::with_base_url(client, "", "http://localhost", tools);
        let result = provider
            .generate("gemini-pro", &[Message::user("test prompt")], false)
            .await;
        assert!(result.unwrap_err().to_string().contains("API key is empty"));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_query(Matcher::AllOf(vec![Matcher::UrlEncoded(
                "key".into(),
                "test-key".into(),
            )]))
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {
                            "parts": [{
                                "text": "This is a test response"
                            }],
                            "role": "model"
                        }
                    }]
                }"#,
            )
            .create_async()
            .await;

        let result = provider(&server.url())
            .complete("gemini-pro", &[Message::user("test prompt")])
            .await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "This is a test response");
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_json_mode_requests_mime_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"[\"a\"]"}]}}]}"#)
            .create_async()
            .await;

        let result = provider(&server.url())
            .complete_json("gemini-pro", &[Message::user("test prompt")])
            .await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "[\"a\"]");
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_blocked_prompt() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let error = provider(&server.url())
            .complete("gemini-pro", &[Message::user("test prompt")])
            .await
            .unwrap_err()
            .to_string();
        assert!(error.contains("blocked"), "got: {}", error);
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_rate_limit() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let result = provider(&server.url())
            .complete("gemini-pro", &[Message::user("test prompt")])
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::Api { status: 429, .. })
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_invalid_json() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("This is not JSON")
            .create_async()
            .await;

        let result = provider(&server.url())
            .complete("gemini-pro", &[Message::user("test prompt")])
            .await;
        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_stream_chat_yields_each_chunk() {
        let mut server = Server::new_async().await;
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello\"}],\"role\":\"model\"}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" world\"}],\"role\":\"model\"},\"finishReason\":\"STOP\"}]}\n\n",
        );
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:streamGenerateContent")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("alt".into(), "sse".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let stream = provider(&server.url())
            .stream_chat("gemini-1.5-flash", &[Message::user("hi")])
            .await
            .unwrap();
        let fragments: Vec<String> = stream.map(|item| item.unwrap()).collect().await;

        mock.assert_async().await;
        assert_eq!(fragments, vec!["Hello", " world"]);
    }

    #[test]
    fn test_build_request_maps_roles() {
        let request = build_request(
            &[
                Message::system("be brief"),
                Message::user("hi"),
                Message::assistant("hello"),
                Message::tool("call_1", "ignored"),
            ],
            None,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["contents"].as_array().unwrap().len(), 2);
        assert_eq!(json["contents"][1]["role"], "model");
    }
}
