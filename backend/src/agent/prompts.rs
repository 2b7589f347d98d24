//! Prompt templates

use chrono::Utc;

/// System prompt for the ReAct agent, stamped with the current time
pub fn agent_system_prompt() -> String {
    format!(
        "You are a helpful AI assistant.\n\nSystem time: {}",
        Utc::now().to_rfc3339()
    )
}

/// Final answer used when the agent runs out of steps
pub const STEP_LIMIT_ANSWER: &str =
    "Sorry, I could not find an answer to your question in the specified number of steps.";

/// Prompt asking for `count` follow-up questions about `message`
pub fn related_questions_prompt(message: &str, count: usize) -> String {
    format!(
        "Based on the following question, suggest {count} related follow-up questions \
         the user might want to ask next. Keep each question short and self-contained.\n\n\
         Question: {message}\n\n\
         Respond with a JSON array of strings and nothing else."
    )
}
