//! API utility functions
//!
//! Request body shape, validation, and the session/request header helpers
//! shared by the streaming handlers.

use crate::error::AppError;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

/// Session identifier header
pub const SESSION_ID_HEADER: HeaderName = HeaderName::from_static("x-session-id");

/// Request identifier header
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Cancel-previous-request header
pub const CANCEL_PREVIOUS_HEADER: HeaderName = HeaderName::from_static("x-cancel-previous");

/// Body accepted by `/chat`, `/agent-chat` and `/related-questions`
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// User message; required after trimming
    #[serde(default)]
    pub message: String,
    /// Optional model id; empty means the endpoint default
    #[serde(default)]
    pub model: Option<String>,
}

/// Validate and trim the user message
///
/// # Returns
/// * `Ok(String)` - Trimmed message
/// * `Err(AppError)` - Message is empty or whitespace only
pub fn validate_message(message: &str) -> Result<String, AppError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest("No message provided".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Trimmed model id, or `default` when absent or blank
pub fn resolve_model(model: Option<&str>, default: &str) -> String {
    model
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client-supplied session id, if any
pub fn session_id_header(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, &SESSION_ID_HEADER)
}

/// Client-supplied request id, or a fresh uuid
pub fn request_id_header(headers: &HeaderMap) -> String {
    header_str(headers, &REQUEST_ID_HEADER)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Whether the client asked to cancel the session's in-flight request
pub fn cancel_previous(headers: &HeaderMap) -> bool {
    header_str(headers, &CANCEL_PREVIOUS_HEADER).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Headers echoed on every streaming response
pub fn echo_headers(session_id: &str, request_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in [
        (SESSION_ID_HEADER, session_id),
        (REQUEST_ID_HEADER, request_id),
    ] {
        // Ids that came in as headers or were minted as ascii always fit
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(name, value);
        }
    }
    headers
}
