//! Agent module
//!
//! The reasoning agent behind `/agent-chat`, its tools, and the
//! related-questions generator. Each is reached through a narrow interface so
//! the relay and handlers never depend on how the answer is produced.

pub mod graph;
pub mod prompts;
pub mod related;
pub mod tools;

pub use graph::{AgentGraph, AgentRequest, ReactAgent};
pub use related::{parse_questions, RelatedQuestions};
pub use tools::{Tool, WebSearch};
