//! Polled agent relay
//!
//! The agent runs as its own task. The relay wakes on a fixed interval,
//! emits an empty progress event while the task is running and the final
//! answer once it finishes.

use super::extract::extract_final_answer;
use super::sse::{done_event, json_error_event, response_event};
use super::RelayOutcome;
use crate::agent::{AgentGraph, AgentRequest};
use crate::error::ProviderError;
use crate::providers::Message;
use async_stream::stream;
use futures_util::stream::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle to a spawned agent run
pub type AgentTask = JoinHandle<Result<Vec<Message>, ProviderError>>;

/// Run `agent` on its own task
pub fn spawn_agent(
    agent: Arc<dyn AgentGraph>,
    request: AgentRequest,
    cancel: CancellationToken,
) -> AgentTask {
    tokio::spawn(async move { agent.run(request, cancel).await })
}

/// Aborts the agent task if the response body is dropped, polled or not
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Relay a running agent task as SSE events
///
/// Emits `{"response": ""}` on every tick while the task runs, then
/// `{"response": answer}` or `{"error": message}`, then `[DONE]`. On
/// cancellation the task is aborted and only `[DONE]` follows.
pub fn relay_agent(
    mut task: AgentTask,
    cancel: CancellationToken,
    poll_interval: Duration,
) -> impl Stream<Item = String> + Send + 'static {
    // Built outside the generator: an unpolled body never runs its code
    let guard = AbortOnDrop(task.abort_handle());

    stream! {
        let _guard = guard;
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0usize;

        let outcome = loop {
            ticker.tick().await;
            ticks += 1;

            if cancel.is_cancelled() {
                task.abort();
                break RelayOutcome::Cancelled;
            }

            if !task.is_finished() {
                yield response_event("");
                continue;
            }

            let result = match (&mut task).await {
                Ok(result) => result,
                Err(e) => Err(ProviderError::Stream(format!("Agent task failed: {}", e))),
            };

            match result.and_then(|messages| extract_final_answer(&messages)) {
                Ok(answer) => {
                    yield response_event(&answer);
                    break RelayOutcome::Completed;
                }
                Err(ProviderError::Cancelled) => break RelayOutcome::Cancelled,
                Err(e) => {
                    warn!(error = %e, "Agent run failed");
                    yield json_error_event(&e.to_string());
                    break RelayOutcome::Failed;
                }
            }
        };

        match outcome {
            RelayOutcome::Cancelled => info!(ticks, "Agent relay cancelled"),
            _ => debug!(ticks, outcome = ?outcome, "Agent relay finished"),
        }

        yield done_event();
    }
}
