//! API module
//!
//! HTTP handlers, middleware and router assembly.

pub mod agent_chat;
pub mod chat;
pub mod health;
pub mod middleware;
pub mod related;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, options, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::ConfigError;
use crate::state::AppState;
use utils::{CANCEL_PREVIOUS_HEADER, REQUEST_ID_HEADER, SESSION_ID_HEADER};

/// Build the CORS layer for a single allowed origin
///
/// # Errors
/// * `ConfigError::Invalid` if `origin` is not a valid header value
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let origin = HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
        var: "CORS_ALLOW_ORIGIN",
        value: origin.to_string(),
    })?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            SESSION_ID_HEADER,
            REQUEST_ID_HEADER,
            CANCEL_PREVIOUS_HEADER,
        ])
        .expose_headers([SESSION_ID_HEADER, REQUEST_ID_HEADER])
        .max_age(Duration::from_secs(86_400)))
}

/// Assemble the application router
///
/// The request-id middleware wraps every route; tracing and CORS are layered
/// on by the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::chat).options(health::options_handler))
        .route(
            "/agent-chat",
            post(agent_chat::agent_chat).options(health::options_handler),
        )
        .route(
            "/related-questions",
            post(related::related_questions).options(health::options_handler),
        )
        .route(
            "/health",
            get(health::health_check).options(health::options_handler),
        )
        .route("/", options(health::options_handler))
        .route("/*path", options(health::options_handler))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .with_state(state)
}
