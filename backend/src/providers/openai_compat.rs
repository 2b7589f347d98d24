//! OpenAI-compatible chat completions client
//!
//! OpenAI, Groq, Fireworks and Anthropic (through its compatibility layer) all
//! speak the `/chat/completions` dialect, so a single client with a per-provider
//! base URL covers them. Google's compatibility endpoint is used for Gemini
//! tool-calling turns.

use super::types::{Message, Role, ToolCall, ToolSpec};
use super::{event_source_error, ChatProvider, TextStream};
use crate::error::ProviderError;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

/// OpenAI API base URL
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
/// Anthropic OpenAI-compatibility base URL
pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
/// Fireworks inference base URL
pub const FIREWORKS_API_BASE: &str = "https://api.fireworks.ai/inference/v1";
/// Groq OpenAI-compatible base URL
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
/// Google Gemini OpenAI-compatibility base URL
pub const GOOGLE_COMPAT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Client for any `/chat/completions` endpoint
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    name: &'static str,
    client: Client,
    api_key: String,
    api_base: String,
    max_tokens: Option<u32>,
}

impl OpenAiCompatProvider {
    /// Create a client for `api_base` authenticated with `api_key`
    pub fn new(
        name: &'static str,
        client: Client,
        api_key: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            name,
            client,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            max_tokens: None,
        }
    }

    /// Send `max_tokens` with every request (required by some providers)
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn request_body<'a>(
        &self,
        model: &'a str,
        messages: &[Message],
        tools: &[ToolSpec],
        stream: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools: tools.iter().map(WireTool::from).collect(),
            max_tokens: self.max_tokens,
            stream,
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    async fn chat_completion(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ProviderError> {
        let body = self.request_body(model, messages, tools, false);

        tracing::debug!(
            provider = self.name,
            model = %model,
            messages = messages.len(),
            tools = tools.len(),
            "Calling chat completions"
        );

        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(ProviderError::Api {
                provider: self.name,
                status: status.as_u16(),
                body,
            });
        }

        let response_body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&response_body).map_err(|e| {
            ProviderError::Parse(format!("{} - Response body: {}", e, response_body))
        })?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(ProviderError::Empty(self.name))?;

        Ok(message.into_message())
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<TextStream, ProviderError> {
        let body = self.request_body(model, messages, &[], true);
        let request = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&body);

        let mut source =
            EventSource::new(request).map_err(|e| ProviderError::Stream(e.to_string()))?;
        let provider = self.name;

        tracing::debug!(provider, model = %model, "Opened completion stream");

        let stream = async_stream::stream! {
            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => continue,
                    Ok(Event::Message(message)) => {
                        if message.data.trim() == "[DONE]" {
                            break;
                        }
                        match serde_json::from_str::<ChatChunk>(&message.data) {
                            Ok(chunk) => {
                                if let Some(text) = chunk.into_text() {
                                    yield Ok(text);
                                }
                            }
                            Err(e) => {
                                yield Err(ProviderError::Parse(format!(
                                    "Failed to parse chunk: {}",
                                    e
                                )));
                                break;
                            }
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        yield Err(event_source_error(provider, e).await);
                        break;
                    }
                }
            }
            source.close();
        };

        Ok(Box::pin(stream))
    }

    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String, ProviderError> {
        let message = self.chat_completion(model, messages, &[]).await?;
        if message.content.trim().is_empty() {
            return Err(ProviderError::Empty(self.name));
        }
        Ok(message.content)
    }

    async fn invoke(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ProviderError> {
        self.chat_completion(model, messages, tools).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        // Assistant turns that only carry tool calls are sent with null content
        let content = if message.role == Role::Assistant
            && message.has_tool_calls()
            && message.content.is_empty()
        {
            None
        } else {
            Some(message.content.clone())
        };

        Self {
            role: message.role.as_str(),
            content,
            tool_calls: message.tool_calls.iter().map(WireToolCall::from).collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_type(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            },
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        let raw = call.function.arguments;
        let arguments = if raw.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        };
        Self {
            id: call.id,
            name: call.function.name,
            arguments,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl From<&ToolSpec> for WireTool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl ResponseMessage {
    fn into_message(self) -> Message {
        let content = self.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(ToolCall::from)
            .collect();
        Message::assistant_with_tools(content, tool_calls)
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

impl ChatChunk {
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    fn provider(base_url: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("openai", Client::new(), "test-key", base_url)
    }

    #[tokio::test]
    #[serial]
    async fn test_stream_chat_yields_fragments_until_done() {
        let mut server = Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o",
                "stream": true,
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let stream = provider(&server.url())
            .stream_chat("gpt-4o", &[Message::user("hi")])
            .await
            .unwrap();
        let fragments: Vec<String> = stream.map(|item| item.unwrap()).collect().await;

        mock.assert_async().await;
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    #[serial]
    async fn test_stream_chat_reports_error_status_in_stream() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":"bad key"}"#)
            .create_async()
            .await;

        let stream = provider(&server.url())
            .stream_chat("gpt-4o", &[Message::user("hi")])
            .await
            .unwrap();
        let items: Vec<Result<String, ProviderError>> = stream.collect().await;

        assert_eq!(items.len(), 1);
        let error = items.into_iter().next().unwrap().unwrap_err().to_string();
        assert!(error.contains("401"), "unexpected error: {}", error);
    }

    #[tokio::test]
    #[serial]
    async fn test_invoke_parses_tool_calls() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "tools": [{"type": "function", "function": {"name": "web_search"}}]
            })))
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":null,
                    "tool_calls":[{"id":"call_1","type":"function",
                    "function":{"name":"web_search","arguments":"{\"query\":\"rust\"}"}}]}}]}"#,
            )
            .create_async()
            .await;

        let tools = vec![ToolSpec {
            name: "web_search".to_string(),
            description: "Search the web".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let message = provider(&server.url())
            .invoke("gpt-4o", &[Message::user("find rust")], &tools)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].id, "call_1");
        assert_eq!(message.tool_calls[0].arguments["query"], "rust");
    }

    #[tokio::test]
    #[serial]
    async fn test_complete_rejects_empty_content() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#)
            .create_async()
            .await;

        let result = provider(&server.url())
            .complete("gpt-4o", &[Message::user("hi")])
            .await;
        assert!(matches!(result, Err(ProviderError::Empty("openai"))));
    }

    #[test]
    fn test_tool_call_only_assistant_turn_has_null_content() {
        let message = Message::assistant_with_tools(
            "",
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "web_search".to_string(),
                arguments: serde_json::json!({"query": "x"}),
            }],
        );
        let wire = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert!(wire["content"].is_null());
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], "{\"query\":\"x\"}");
    }
}
