//! Request middleware

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, info_span, Instrument};

use crate::api::utils::{request_id_header, REQUEST_ID_HEADER};

/// Request ID middleware - tags each request with an id for tracing
///
/// Reuses the client's `X-Request-ID` when present, otherwise mints one and
/// writes it back into the request so handlers log the same id.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request_id_header(request.headers());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    // For SSE this is time to first byte, not stream length
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    response
}
