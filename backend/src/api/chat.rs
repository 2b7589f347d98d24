//! Chat API
//!
//! `POST /chat` streams model tokens straight to the client. The session
//! registry hands each request its own cancellation token; a later request on
//! the same session carrying `X-Cancel-Previous: true` stops this one.

use axum::{extract::State, http::HeaderMap, response::Response, Json};
use futures_util::FutureExt;
use tracing::info;

use crate::api::utils::{
    cancel_previous, echo_headers, request_id_header, resolve_model, session_id_header,
    validate_message, GenerateRequest,
};
use crate::error::AppError;
use crate::providers::Message;
use crate::relay::{relay_tokens, sse_response};
use crate::state::AppState;

/// Start a session for this request, cancelling the previous one if asked
///
/// Returns `(session_id, request_id, cancel token)`.
pub(crate) fn begin_request(
    state: &AppState,
    headers: &HeaderMap,
) -> (String, String, tokio_util::sync::CancellationToken) {
    let session_id = state.sessions.resolve(session_id_header(headers));
    let request_id = request_id_header(headers);

    // Must run before mark_request so the new token is not the one cancelled
    if cancel_previous(headers) {
        info!(session_id = %session_id, "Cancelling previous request");
        state.sessions.signal_cancel(&session_id);
    }
    let cancel = state.sessions.mark_request(&session_id, &request_id);

    (session_id, request_id, cancel)
}

/// Stream a chat completion as SSE
///
/// # Arguments
/// * `state` - Application state
/// * `headers` - Session, request and cancel headers
/// * `request` - Message and optional model
///
/// # Returns
/// * `Result<Response, AppError>` - SSE stream, or 400 for an empty message
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, AppError> {
    let message = validate_message(&request.message)?;
    let model = resolve_model(request.model.as_deref(), &state.models.chat);
    let (session_id, request_id, cancel) = begin_request(&state, &headers);

    info!(
        session_id = %session_id,
        request_id = %request_id,
        model = %model,
        "Starting chat stream"
    );

    let providers = state.providers.clone();
    let open = async move {
        let routed = providers.route(&model)?;
        routed
            .provider
            .stream_chat(&routed.model, &[Message::user(message)])
            .await
    }
    .boxed();

    sse_response(
        relay_tokens(open, cancel),
        echo_headers(&session_id, &request_id),
    )
}
