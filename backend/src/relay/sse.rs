//! SSE framing and response construction

use super::{SSE_DONE_SIGNAL, SSE_ERROR_PREFIX};
use crate::error::AppError;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use futures_util::{stream::Stream, StreamExt};
use serde_json::json;

/// Frame `payload` as one SSE event
///
/// Each line of the payload gets its own `data:` field so embedded newlines
/// survive the client's event parser.
pub fn data_event(payload: &str) -> String {
    let mut event = String::with_capacity(payload.len() + 8);
    for line in payload.split('\n') {
        event.push_str("data: ");
        event.push_str(line.strip_suffix('\r').unwrap_or(line));
        event.push('\n');
    }
    event.push('\n');
    event
}

/// The terminal `[DONE]` event
pub fn done_event() -> String {
    data_event(SSE_DONE_SIGNAL)
}

/// Error event for plain-text streams
pub fn text_error_event(message: &str) -> String {
    data_event(&format!("{} {}", SSE_ERROR_PREFIX, message))
}

/// `{"response": ...}` event for JSON streams
pub fn response_event(response: &str) -> String {
    data_event(&json!({ "response": response }).to_string())
}

/// `{"error": ...}` event for JSON streams
pub fn json_error_event(message: &str) -> String {
    data_event(&json!({ "error": message }).to_string())
}

/// Build a streaming `text/event-stream` response
///
/// # Arguments
/// * `stream` - Already-framed SSE events
/// * `extra_headers` - Additional headers (e.g. session id echo)
///
/// # Returns
/// * `Result<Response, AppError>` - SSE HTTP response or error
pub fn sse_response<S>(stream: S, extra_headers: HeaderMap) -> Result<Response, AppError>
where
    S: Stream<Item = String> + Send + 'static,
{
    let body_stream = stream.map(Ok::<_, std::io::Error>);

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        )
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build SSE response: {}", e)))?;

    response.headers_mut().extend(extra_headers);
    Ok(response)
}
