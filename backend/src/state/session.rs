//! Session registry
//!
//! Tracks per-session bookkeeping: timestamps, the current request and its
//! cancellation token. Cancellation is cooperative; the registry only flips
//! tokens, and relays decide when to look at them.

use super::store::{InMemorySessionStore, SessionStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Unique identifier for a session
pub type SessionId = String;

/// Per-session state
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,
    /// When the session was first seen
    pub created_at: DateTime<Utc>,
    /// Last time a request touched the session
    pub last_accessed: DateTime<Utc>,
    /// Request currently considered live, if any
    pub current_request: Option<String>,
    /// Cancellation token of the current request
    pub cancel: CancellationToken,
}

impl Session {
    /// Create a fresh session
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_accessed: now,
            current_request: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Whether the current request has been asked to stop
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn touch(&mut self) {
        // Never move backwards, even if the wall clock does
        self.last_accessed = self.last_accessed.max(Utc::now());
    }
}

/// Mint a new session identifier
pub fn generate_session_id() -> SessionId {
    format!("session_{}", Uuid::new_v4())
}

/// Session registry backed by a `SessionStore`
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionRegistry {
    /// Create a registry over `store`
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Create a registry with an in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySessionStore::new()))
    }

    /// Resolve the session for a request, creating it when needed
    ///
    /// Without an identifier a new one is minted. `last_accessed` is always
    /// refreshed. Never fails.
    pub fn resolve(&self, session_id: Option<&str>) -> SessionId {
        let id = match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => generate_session_id(),
        };

        let mut created = false;
        self.store.upsert(
            &id,
            &mut || {
                created = true;
                Session::new(id.clone())
            },
            &mut Session::touch,
        );

        if created {
            debug!(session_id = %id, "Created session");
        }
        id
    }

    /// Record `request_id` as the session's current request
    ///
    /// Installs a fresh cancellation token, which clears any cancellation
    /// left behind by an earlier request, and returns it for the relay to
    /// watch. Unknown sessions are created.
    pub fn mark_request(&self, session_id: &str, request_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        let mut install = |session: &mut Session| {
            session.current_request = Some(request_id.to_string());
            session.cancel = token.clone();
            session.touch();
        };
        self.store.upsert(
            session_id,
            &mut || Session::new(session_id.to_string()),
            &mut install,
        );
        token
    }

    /// Ask the session's current request to stop
    ///
    /// No-op for unknown sessions.
    pub fn signal_cancel(&self, session_id: &str) {
        let found = self.store.update(session_id, &mut |session| {
            session.cancel.cancel();
        });
        if found {
            info!(session_id = %session_id, "Cancellation signalled");
        } else {
            debug!(session_id = %session_id, "Cancellation for unknown session ignored");
        }
    }

    /// Whether the session's current request has been cancelled
    pub fn is_cancelled(&self, session_id: &str) -> bool {
        self.store
            .get(session_id)
            .map(|session| session.is_cancelled())
            .unwrap_or(false)
    }

    /// Snapshot of a session
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.store.get(session_id)
    }

    /// Number of tracked sessions
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no sessions are tracked
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop sessions idle for longer than `ttl`; returns how many were removed
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;
        self.store
            .retain(&mut |session| session.last_accessed >= cutoff)
    }

    /// Periodically evict idle sessions in the background
    pub fn spawn_idle_sweeper(&self, ttl: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let period = (ttl / 2).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let removed = registry.evict_idle(ttl);
                if removed > 0 {
                    info!(
                        removed = removed,
                        remaining = registry.len(),
                        "Evicted idle sessions"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_without_id_mints_distinct_ids() {
        let registry = SessionRegistry::in_memory();
        let first = registry.resolve(None);
        let second = registry.resolve(None);
        assert_ne!(first, second);
        assert!(first.starts_with("session_"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_resolve_with_id_is_stable_and_refreshes_access() {
        let registry = SessionRegistry::in_memory();
        let id = registry.resolve(Some("abc"));
        let first = registry.get(&id).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(registry.resolve(Some("abc")), "abc");
        let second = registry.get("abc").unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.last_accessed > first.last_accessed);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_session_header_is_treated_as_absent() {
        let registry = SessionRegistry::in_memory();
        let id = registry.resolve(Some("   "));
        assert!(id.starts_with("session_"));
    }

    #[test]
    fn test_signal_cancel_then_new_request_resets_flag() {
        let registry = SessionRegistry::in_memory();
        let id = registry.resolve(Some("s"));

        let first = registry.mark_request(&id, "req-1");
        assert!(!registry.is_cancelled(&id));

        registry.signal_cancel(&id);
        assert!(registry.is_cancelled(&id));
        assert!(first.is_cancelled());

        let second = registry.mark_request(&id, "req-2");
        assert!(!registry.is_cancelled(&id));
        assert!(!second.is_cancelled());
        // The earlier request stays cancelled
        assert!(first.is_cancelled());
        assert_eq!(
            registry.get(&id).unwrap().current_request.as_deref(),
            Some("req-2")
        );
    }

    #[test]
    fn test_signal_cancel_unknown_session_is_noop() {
        let registry = SessionRegistry::in_memory();
        registry.signal_cancel("nope");
        assert!(!registry.is_cancelled("nope"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_evict_idle_removes_stale_sessions() {
        let registry = SessionRegistry::in_memory();
        registry.resolve(Some("old"));
        std::thread::sleep(Duration::from_millis(20));
        registry.resolve(Some("fresh"));

        let removed = registry.evict_idle(Duration::from_millis(10));
        assert_eq!(removed, 1);
        assert!(registry.get("old").is_none());
        assert!(registry.get("fresh").is_some());
    }
}
