//! Final answer extraction from agent transcripts

use crate::error::ProviderError;
use crate::providers::{Message, Role};

/// Return the content of the last assistant message that made no tool calls
///
/// # Errors
/// * `ProviderError::NoFinalAnswer` if the transcript has no such message
pub fn extract_final_answer(messages: &[Message]) -> Result<String, ProviderError> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant && !m.has_tool_calls())
        .map(|m| m.content.clone())
        .ok_or(ProviderError::NoFinalAnswer)
}
