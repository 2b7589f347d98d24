//! Smith Backend Library
//!
//! Session-scoped, cancellable SSE relay in front of LLM chat providers.
//! The main binary is in `src/main.rs`.

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod providers;
pub mod relay;
/// Application state management
///
/// Handles the session registry and its storage backend.
pub mod state;
