//! Direct token relay
//!
//! Forwards each upstream fragment as its own SSE event. Cancellation is
//! checked before every forward and raced against every upstream read, so a
//! cancelled stream stops without waiting for the next token.

use super::sse::{data_event, done_event, text_error_event};
use super::RelayOutcome;
use crate::error::ProviderError;
use crate::providers::TextStream;
use async_stream::stream;
use futures_util::future::BoxFuture;
use futures_util::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Relay an upstream token stream as SSE events
///
/// # Arguments
/// * `open` - Future opening the upstream stream; not polled until the body is
/// * `cancel` - Token for this request
///
/// # Returns
/// A stream of framed SSE events, always ending with `[DONE]`
pub fn relay_tokens(
    open: BoxFuture<'static, Result<TextStream, ProviderError>>,
    cancel: CancellationToken,
) -> impl Stream<Item = String> + Send + 'static {
    stream! {
        let mut fragments = 0usize;

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = open => Some(opened),
        };

        let outcome = match opened {
            None => RelayOutcome::Cancelled,
            Some(Err(e)) => {
                warn!(error = %e, "Failed to open upstream stream");
                yield text_error_event(&e.to_string());
                RelayOutcome::Failed
            }
            Some(Ok(mut upstream)) => loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break RelayOutcome::Cancelled,
                    next = upstream.next() => next,
                };

                match next {
                    None => break RelayOutcome::Completed,
                    Some(Ok(fragment)) => {
                        if cancel.is_cancelled() {
                            break RelayOutcome::Cancelled;
                        }
                        if fragment.is_empty() {
                            continue;
                        }
                        fragments += 1;
                        yield data_event(&fragment);
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Upstream stream failed");
                        yield text_error_event(&e.to_string());
                        break RelayOutcome::Failed;
                    }
                }
            },
        };

        match outcome {
            RelayOutcome::Cancelled => info!(fragments, "Token relay cancelled"),
            _ => debug!(fragments, outcome = ?outcome, "Token relay finished"),
        }

        yield done_event();
    }
}
