//! Agent chat API
//!
//! `POST /agent-chat` runs the ReAct agent on its own task and polls it,
//! streaming a JSON event per tick until the final answer is available.

use axum::{extract::State, http::HeaderMap, response::Response, Json};
use tracing::info;

use crate::agent::AgentRequest;
use crate::api::chat::begin_request;
use crate::api::utils::{echo_headers, resolve_model, validate_message, GenerateRequest};
use crate::error::AppError;
use crate::relay::{relay_agent, spawn_agent, sse_response};
use crate::state::AppState;

/// Run the agent and stream its progress as SSE
pub async fn agent_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, AppError> {
    let message = validate_message(&request.message)?;
    let model = resolve_model(request.model.as_deref(), &state.models.agent);
    let (session_id, request_id, cancel) = begin_request(&state, &headers);

    info!(
        session_id = %session_id,
        request_id = %request_id,
        model = %model,
        "Starting agent run"
    );

    let task = spawn_agent(
        state.agent.clone(),
        AgentRequest { message, model },
        cancel.clone(),
    );

    sse_response(
        relay_agent(task, cancel, state.poll_interval),
        echo_headers(&session_id, &request_id),
    )
}
