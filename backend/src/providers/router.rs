//! Model id → provider routing

use super::gemini::GeminiProvider;
use super::openai_compat::{
    OpenAiCompatProvider, ANTHROPIC_API_BASE, FIREWORKS_API_BASE, GROQ_API_BASE, OPENAI_API_BASE,
};
use super::ChatProvider;
use crate::config::Credentials;
use crate::error::ProviderError;
use std::collections::HashMap;
use std::sync::Arc;

/// Upstream provider families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Google Gemini
    Google,
    /// OpenAI
    OpenAi,
    /// Anthropic
    Anthropic,
    /// Fireworks
    Fireworks,
    /// Groq
    Groq,
}

impl ProviderKind {
    const PREFIXES: [(&'static str, ProviderKind); 5] = [
        ("google/", ProviderKind::Google),
        ("openai/", ProviderKind::OpenAi),
        ("anthropic/", ProviderKind::Anthropic),
        ("fireworks/", ProviderKind::Fireworks),
        ("groq/", ProviderKind::Groq),
    ];

    /// Work out which provider serves `model`, returning the model name the
    /// provider expects (an explicit `provider/` prefix is stripped)
    pub fn detect(model: &str) -> Option<(ProviderKind, &str)> {
        for (prefix, kind) in Self::PREFIXES {
            if let Some(rest) = model.strip_prefix(prefix) {
                return Some((kind, rest));
            }
        }

        let lower = model.to_ascii_lowercase();
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| lower.starts_with(p));

        let kind = if starts(&["gemini"]) {
            ProviderKind::Google
        } else if starts(&["gpt", "o1", "o3", "o4", "chatgpt"]) {
            ProviderKind::OpenAi
        } else if starts(&["claude"]) {
            ProviderKind::Anthropic
        } else if starts(&["accounts/fireworks/"]) {
            ProviderKind::Fireworks
        } else if starts(&["llama", "mixtral", "gemma", "qwen", "deepseek"]) {
            ProviderKind::Groq
        } else {
            return None;
        };
        Some((kind, model))
    }
}

/// A provider resolved for a specific model
#[derive(Clone)]
pub struct RoutedModel {
    /// Provider serving the model
    pub provider: Arc<dyn ChatProvider>,
    /// Model name as the provider expects it
    pub model: String,
}

/// Routes model ids to providers
#[derive(Clone, Default)]
pub struct ProviderRouter {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
    fallback: Option<Arc<dyn ChatProvider>>,
}

impl ProviderRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the production router from provider credentials
    pub fn from_credentials(credentials: &Credentials, client: reqwest::Client) -> Self {
        Self::new()
            .with_provider(
                ProviderKind::Google,
                Arc::new(GeminiProvider::new(client.clone(), &credentials.google)),
            )
            .with_provider(
                ProviderKind::OpenAi,
                Arc::new(OpenAiCompatProvider::new(
                    "openai",
                    client.clone(),
                    &credentials.openai,
                    OPENAI_API_BASE,
                )),
            )
            .with_provider(
                ProviderKind::Anthropic,
                Arc::new(
                    OpenAiCompatProvider::new(
                        "anthropic",
                        client.clone(),
                        &credentials.anthropic,
                        ANTHROPIC_API_BASE,
                    )
                    .with_max_tokens(4096),
                ),
            )
            .with_provider(
                ProviderKind::Fireworks,
                Arc::new(OpenAiCompatProvider::new(
                    "fireworks",
                    client.clone(),
                    &credentials.fireworks,
                    FIREWORKS_API_BASE,
                )),
            )
            .with_provider(
                ProviderKind::Groq,
                Arc::new(OpenAiCompatProvider::new(
                    "groq",
                    client,
                    &credentials.groq,
                    GROQ_API_BASE,
                )),
            )
    }

    /// Register the provider for `kind`
    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn ChatProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    /// Serve every unmatched model with `provider`
    pub fn with_fallback(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    /// Resolve the provider for `model`
    ///
    /// # Errors
    /// * `ProviderError::UnknownModel` if no registered provider serves it
    pub fn route(&self, model: &str) -> Result<RoutedModel, ProviderError> {
        let detected = ProviderKind::detect(model)
            .and_then(|(kind, name)| self.providers.get(&kind).map(|p| (p.clone(), name)));

        match (detected, &self.fallback) {
            (Some((provider, name)), _) => Ok(RoutedModel {
                provider,
                model: name.to_string(),
            }),
            (None, Some(fallback)) => Ok(RoutedModel {
                provider: fallback.clone(),
                model: model.to_string(),
            }),
            (None, None) => Err(ProviderError::UnknownModel(model.to_string())),
        }
    }
}
