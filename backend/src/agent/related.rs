//! Related-questions generator
//!
//! Asks a model for follow-up questions and parses whatever shape comes back:
//! a JSON array (bare or in a code fence), a `{"questions": [...]}` object, or
//! a plain numbered/bulleted list.

use super::prompts::related_questions_prompt;
use crate::error::ProviderError;
use crate::providers::{Message, ProviderRouter};
use serde::Deserialize;
use std::sync::Arc;

/// Generates follow-up questions for a message
pub struct RelatedQuestions {
    providers: Arc<ProviderRouter>,
    count: usize,
}

impl RelatedQuestions {
    /// Create a generator returning at most `count` questions
    pub fn new(providers: Arc<ProviderRouter>, count: usize) -> Self {
        Self {
            providers,
            count: count.max(1),
        }
    }

    /// Generate questions related to `message` using `model`
    ///
    /// # Errors
    /// * `ProviderError::UnknownModel` if no provider serves `model`
    /// * Any provider failure from the completion call
    pub async fn generate(&self, message: &str, model: &str) -> Result<Vec<String>, ProviderError> {
        let routed = self.providers.route(model)?;
        let prompt = related_questions_prompt(message, self.count);

        let text = routed
            .provider
            .complete_json(&routed.model, &[Message::user(prompt)])
            .await?;

        let questions = parse_questions(&text, self.count);
        tracing::debug!(
            model = %routed.model,
            questions = questions.len(),
            "Generated related questions"
        );
        Ok(questions)
    }
}

#[derive(Deserialize)]
struct QuestionsObject {
    questions: Vec<String>,
}

/// Extract at most `limit` questions from model output
pub fn parse_questions(text: &str, limit: usize) -> Vec<String> {
    let body = strip_code_fence(text.trim());

    let parsed = serde_json::from_str::<Vec<String>>(body)
        .or_else(|_| serde_json::from_str::<QuestionsObject>(body).map(|o| o.questions));

    let candidates: Vec<String> = match parsed {
        Ok(list) => list,
        Err(_) => body.lines().map(strip_list_marker).map(str::to_string).collect(),
    };

    candidates
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .take(limit)
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line, e.g. ```json
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().trim_end_matches("```").trim()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatProvider, TextStream, ToolSpec};
    use async_trait::async_trait;

    /// Provider answering only in JSON mode
    struct JsonOnlyProvider;

    #[async_trait]
    impl ChatProvider for JsonOnlyProvider {
        fn name(&self) -> &'static str {
            "json-only"
        }

        async fn stream_chat(
            &self,
            _model: &str,
            _messages: &[Message],
        ) -> Result<TextStream, ProviderError> {
            Err(ProviderError::Empty("json-only"))
        }

        async fn complete(&self, _model: &str, _messages: &[Message]) -> Result<String, ProviderError> {
            Err(ProviderError::Empty("json-only"))
        }

        async fn complete_json(
            &self,
            _model: &str,
            _messages: &[Message],
        ) -> Result<String, ProviderError> {
            Ok(r#"["First?", "Second?", "Third?", "Fourth?"]"#.to_string())
        }

        async fn invoke(
            &self,
            _model: &str,
            _messages: &[Message],
            _tools: &[ToolSpec],
        ) -> Result<Message, ProviderError> {
            Err(ProviderError::Empty("json-only"))
        }
    }

    #[tokio::test]
    async fn test_generate_uses_json_completion() {
        let router = ProviderRouter::new().with_fallback(Arc::new(JsonOnlyProvider));
        let related = RelatedQuestions::new(Arc::new(router), 3);

        let questions = related.generate("Tell me about Rust", "any-model").await.unwrap();
        assert_eq!(questions, vec!["First?", "Second?", "Third?"]);
    }

    #[test]
    fn test_parse_json_array() {
        let questions = parse_questions(r#"["What is Rust?", "Why tokio?"]"#, 3);
        assert_eq!(questions, vec!["What is Rust?", "Why tokio?"]);
    }

    #[test]
    fn test_parse_fenced_json_and_cap() {
        let text = "```json\n[\"a?\", \"b?\", \"c?\", \"d?\"]\n```";
        assert_eq!(parse_questions(text, 3), vec!["a?", "b?", "c?"]);
    }

    #[test]
    fn test_parse_questions_object() {
        let text = r#"{"questions": ["one?", " ", "two?"]}"#;
        assert_eq!(parse_questions(text, 5), vec!["one?", "two?"]);
    }

    #[test]
    fn test_parse_numbered_and_bulleted_lists() {
        let text = "1. First question?\n2) Second question?\n\n- Third question?\n• Fourth?";
        assert_eq!(
            parse_questions(text, 4),
            vec![
                "First question?",
                "Second question?",
                "Third question?",
                "Fourth?"
            ]
        );
    }

    #[test]
    fn test_leading_numbers_without_marker_are_kept() {
        assert_eq!(parse_questions("2024 trends?", 3), vec!["2024 trends?"]);
    }
}
