//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. Provider credentials are mandatory: a missing key
//! aborts startup instead of failing individual requests later.

use crate::error::ConfigError;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variables that must be present and non-empty at startup
pub const REQUIRED_CREDENTIALS: [&str; 5] = [
    "GOOGLE_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "FIREWORKS_API_KEY",
    "GROQ_API_KEY",
];

/// Origin allowed by CORS when `CORS_ALLOW_ORIGIN` is not set
pub const DEFAULT_ALLOW_ORIGIN: &str = "https://smith-frontend.vercel.app";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Provider credentials
    pub credentials: Credentials,
    /// Default model per endpoint
    pub models: ModelDefaults,
    /// Agent and relay tuning
    pub agent: AgentConfig,
    /// Session bookkeeping
    pub sessions: SessionConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Origin allowed to call the API with credentials
    pub allow_origin: String,
}

/// API keys for the upstream providers
#[derive(Clone)]
pub struct Credentials {
    /// Google Gemini
    pub google: String,
    /// OpenAI
    pub openai: String,
    /// Anthropic
    pub anthropic: String,
    /// Fireworks
    pub fireworks: String,
    /// Groq
    pub groq: String,
    /// Tavily web search; the agent runs without tools when absent
    pub tavily: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("google", &"<redacted>")
            .field("openai", &"<redacted>")
            .field("anthropic", &"<redacted>")
            .field("fireworks", &"<redacted>")
            .field("groq", &"<redacted>")
            .field("tavily", &self.tavily.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Default models used when a request omits `model`
#[derive(Debug, Clone)]
pub struct ModelDefaults {
    /// `/chat`
    pub chat: String,
    /// `/agent-chat`
    pub agent: String,
    /// `/related-questions`
    pub related: String,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            chat: "gemini-1.5-flash".to_string(),
            agent: "gemini-1.5-flash".to_string(),
            related: "gemini-pro".to_string(),
        }
    }
}

/// Agent and relay configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Interval between polls of a running agent task (in milliseconds)
    pub poll_interval_ms: u64,
    /// Maximum number of model calls per agent run
    pub max_steps: usize,
    /// Results returned by the web search tool
    pub max_search_results: usize,
    /// Number of related questions to generate
    pub related_questions_count: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            max_steps: 10,
            max_search_results: 5,
            related_questions_count: 3,
        }
    }
}

impl AgentConfig {
    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Session bookkeeping configuration
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Evict sessions idle longer than this; `None` keeps them for the
    /// process lifetime
    pub idle_ttl_secs: Option<u64>,
}

impl SessionConfig {
    /// Idle TTL as a `Duration`, when eviction is enabled
    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    /// * `ConfigError::MissingCredentials` if any provider key is absent
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED_CREDENTIALS
            .iter()
            .filter(|key| var(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials(missing));
        }

        let required = |key: &str| var(key).unwrap_or_default();

        let allow_origin = var("CORS_ALLOW_ORIGIN").unwrap_or_else(|| DEFAULT_ALLOW_ORIGIN.to_string());
        if axum::http::HeaderValue::from_str(&allow_origin).is_err() {
            return Err(ConfigError::Invalid {
                var: "CORS_ALLOW_ORIGIN",
                value: allow_origin,
            });
        }

        let model_defaults = ModelDefaults::default();
        let agent_defaults = AgentConfig::default();

        Ok(Self {
            server: ServerConfig {
                port: parse_var(var("PORT")).unwrap_or(8000),
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                allow_origin,
            },
            credentials: Credentials {
                google: required("GOOGLE_API_KEY"),
                openai: required("OPENAI_API_KEY"),
                anthropic: required("ANTHROPIC_API_KEY"),
                fireworks: required("FIREWORKS_API_KEY"),
                groq: required("GROQ_API_KEY"),
                tavily: var("TAVILY_API_KEY"),
            },
            models: ModelDefaults {
                chat: var("DEFAULT_CHAT_MODEL").unwrap_or(model_defaults.chat),
                agent: var("DEFAULT_AGENT_MODEL").unwrap_or(model_defaults.agent),
                related: var("DEFAULT_RELATED_MODEL").unwrap_or(model_defaults.related),
            },
            agent: AgentConfig {
                poll_interval_ms: parse_var(var("AGENT_POLL_INTERVAL_MS"))
                    .unwrap_or(agent_defaults.poll_interval_ms),
                max_steps: parse_var(var("AGENT_MAX_STEPS")).unwrap_or(agent_defaults.max_steps),
                max_search_results: parse_var(var("MAX_SEARCH_RESULTS"))
                    .unwrap_or(agent_defaults.max_search_results),
                related_questions_count: parse_var(var("RELATED_QUESTIONS_COUNT"))
                    .unwrap_or(agent_defaults.related_questions_count),
            },
            sessions: SessionConfig {
                idle_ttl_secs: parse_var(var("SESSION_IDLE_TTL_SECS")).filter(|ttl: &u64| *ttl > 0),
            },
        })
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        REQUIRED_CREDENTIALS
            .iter()
            .map(|key| (*key, format!("{}-value", key)))
            .collect()
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_only_credentials_are_set() {
        let config = load(&full_env()).expect("config should load");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.allow_origin, DEFAULT_ALLOW_ORIGIN);
        assert_eq!(config.models.chat, "gemini-1.5-flash");
        assert_eq!(config.models.related, "gemini-pro");
        assert_eq!(config.agent.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.agent.max_search_results, 5);
        assert!(config.credentials.tavily.is_none());
        assert!(config.sessions.idle_ttl().is_none());
    }

    #[test]
    fn test_missing_credentials_are_all_reported() {
        let mut vars = full_env();
        vars.remove("OPENAI_API_KEY");
        vars.insert("GROQ_API_KEY", "   ".to_string());

        match load(&vars) {
            Err(ConfigError::MissingCredentials(missing)) => {
                assert_eq!(missing, vec!["OPENAI_API_KEY", "GROQ_API_KEY"]);
            }
            other => panic!("expected missing credentials, got {:?}", other),
        }
    }

    #[test]
    fn test_overrides_are_applied() {
        let mut vars = full_env();
        vars.insert("PORT", "9001".to_string());
        vars.insert("AGENT_POLL_INTERVAL_MS", "250".to_string());
        vars.insert("SESSION_IDLE_TTL_SECS", "600".to_string());
        vars.insert("DEFAULT_CHAT_MODEL", "gpt-4o-mini".to_string());
        vars.insert("TAVILY_API_KEY", "tvly".to_string());

        let config = load(&vars).expect("config should load");
        assert_eq!(config.server_addr(), "0.0.0.0:9001");
        assert_eq!(config.agent.poll_interval_ms, 250);
        assert_eq!(config.sessions.idle_ttl(), Some(Duration::from_secs(600)));
        assert_eq!(config.models.chat, "gpt-4o-mini");
        assert_eq!(config.credentials.tavily.as_deref(), Some("tvly"));
    }

    #[test]
    fn test_unparseable_numbers_fall_back_to_defaults() {
        let mut vars = full_env();
        vars.insert("PORT", "not-a-port".to_string());
        let config = load(&vars).expect("config should load");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_debug_output_redacts_keys() {
        let config = load(&full_env()).expect("config should load");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("GOOGLE_API_KEY-value"));
        assert!(debug.contains("<redacted>"));
    }
}
