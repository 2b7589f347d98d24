//! Error types and error handling for the application
//!
//! This module defines the error types used across the service:
//! - `AppError` for the HTTP surface (implements `IntoResponse`)
//! - `ProviderError` for upstream model providers, tools and the agent loop
//! - `ConfigError` for startup configuration problems
//!
//! Once an SSE stream has started, `ProviderError`s are reported in-band by
//! the relay and never reach `AppError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Only client input problems are distinguished; every other failure maps to
/// a generic server error carrying the failure's description.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body is missing required data or is otherwise unusable
    #[error("{0}")]
    InvalidRequest(String),

    /// Upstream provider failed before a response could be produced
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Errors raised by model providers, tools and the agent loop
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No configured provider serves the requested model
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Transport-level failure talking to the provider
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} API returned error status {status}: {body}")]
    Api {
        /// Provider name
        provider: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, as returned
        body: String,
    },

    /// Provider output could not be decoded
    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    /// Event stream broke mid-flight
    #[error("Stream error: {0}")]
    Stream(String),

    /// Provider refused the prompt
    #[error("Prompt was blocked: {0}")]
    Blocked(String),

    /// Provider returned no usable content
    #[error("{0} returned an empty response")]
    Empty(&'static str),

    /// Agent output contained no final assistant answer
    #[error("Agent produced no final answer")]
    NoFinalAnswer,

    /// A tool invocation failed
    #[error("Tool {name} failed: {message}")]
    Tool {
        /// Tool name
        name: String,
        /// Failure description
        message: String,
    },

    /// Work was stopped because the request was cancelled
    #[error("Request cancelled")]
    Cancelled,
}

/// Startup configuration errors. All of these are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more provider credentials are absent
    #[error(
        "Missing required environment variables: {}. Please ensure these are set in your deployment environment.",
        .0.join(", ")
    )]
    MissingCredentials(Vec<String>),

    /// A variable is present but unusable
    #[error("Invalid value for {var}: {value}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
}
