//! Agent tools
//!
//! Tools the ReAct loop can offer the model. Only web search exists, and only
//! when a Tavily key is configured.

use crate::error::ProviderError;
use crate::providers::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const TAVILY_API_BASE: &str = "https://api.tavily.com";

/// A tool the agent can call
#[async_trait]
pub trait Tool: Send + Sync {
    /// Description advertised to the model
    fn spec(&self) -> ToolSpec;

    /// Run the tool with the model-supplied arguments
    async fn call(&self, arguments: &serde_json::Value) -> Result<String, ProviderError>;
}

/// Web search backed by Tavily
pub struct WebSearch {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

impl WebSearch {
    /// Name the model uses to call this tool
    pub const NAME: &'static str = "web_search";

    /// Create a search tool returning at most `max_results` hits
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, max_results: usize) -> Self {
        Self::with_base_url(client, api_key, max_results, TAVILY_API_BASE)
    }

    /// Create a search tool against a custom endpoint (for testing)
    pub fn with_base_url(
        client: reqwest::Client,
        api_key: impl Into<String>,
        max_results: usize,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_results,
        }
    }

    fn error(message: impl Into<String>) -> ProviderError {
        ProviderError::Tool {
            name: Self::NAME.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl Tool for WebSearch {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Self::NAME.to_string(),
            description: "Search the web for current, general information. \
                          Useful for answering questions about recent events."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query"}
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, arguments: &serde_json::Value) -> Result<String, ProviderError> {
        let query = arguments
            .get("query")
            .and_then(|q| q.as_str())
            .or_else(|| arguments.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Self::error("missing 'query' argument"))?;

        tracing::debug!(query = %query, max_results = self.max_results, "Running web search");

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SearchRequest {
                query,
                max_results: self.max_results,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::error(format!("status {}: {}", status.as_u16(), body)));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Self::error(format!("invalid response: {}", e)))?;

        let results: Vec<SearchResult> =
            parsed.results.into_iter().take(self.max_results).collect();
        serde_json::to_string(&results).map_err(|e| Self::error(e.to_string()))
    }
}
