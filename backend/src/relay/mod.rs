//! Streaming relay
//!
//! Adapts upstream producers into Server-Sent-Events bodies while honoring
//! cooperative cancellation. Two modes:
//! - `relay_tokens` forwards a token stream fragment by fragment
//! - `relay_agent` polls a long-running agent task on a fixed interval
//!
//! Every relay stream ends with the `[DONE]` sentinel, whatever the outcome,
//! and never surfaces an error to the transport.

pub mod direct;
pub mod extract;
pub mod polled;
pub mod sse;

pub use direct::relay_tokens;
pub use extract::extract_final_answer;
pub use polled::{relay_agent, spawn_agent};
pub use sse::sse_response;

use std::time::Duration;

/// SSE stream termination signal
pub const SSE_DONE_SIGNAL: &str = "[DONE]";

/// SSE error prefix for plain-text streams
pub const SSE_ERROR_PREFIX: &str = "[ERROR]";

/// Default interval between polls of a running agent task
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a relay stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream finished normally
    Completed,
    /// Cancellation was observed
    Cancelled,
    /// Upstream failed; an error event was emitted
    Failed,
}
