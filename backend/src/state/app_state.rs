// Application state shared by all handlers
// Holds the session registry and the upstream collaborators

use crate::agent::{AgentGraph, RelatedQuestions};
use crate::config::ModelDefaults;
use crate::providers::ProviderRouter;
use crate::relay::DEFAULT_POLL_INTERVAL;
use crate::state::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Main application state
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct AppState {
    /// Session bookkeeping
    pub sessions: SessionRegistry,
    /// Model id → provider routing for `/chat`
    pub providers: Arc<ProviderRouter>,
    /// Agent driven by `/agent-chat`
    pub agent: Arc<dyn AgentGraph>,
    /// Generator behind `/related-questions`
    pub related: Arc<RelatedQuestions>,
    /// Models used when a request names none
    pub models: Arc<ModelDefaults>,
    /// Poll interval of the agent relay
    pub poll_interval: Duration,
}

impl AppState {
    /// Create state with an in-memory session registry and default settings
    pub fn new(
        providers: Arc<ProviderRouter>,
        agent: Arc<dyn AgentGraph>,
        related: Arc<RelatedQuestions>,
    ) -> Self {
        Self {
            sessions: SessionRegistry::in_memory(),
            providers,
            agent,
            related,
            models: Arc::new(ModelDefaults::default()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Use `sessions` instead of a fresh in-memory registry
    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = sessions;
        self
    }

    /// Override the default models
    pub fn with_models(mut self, models: ModelDefaults) -> Self {
        self.models = Arc::new(models);
        self
    }

    /// Override the agent relay poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
