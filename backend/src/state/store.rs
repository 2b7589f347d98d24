//! Session storage
//!
//! `SessionStore` is the seam between the registry's contract and where the
//! records live. Only the in-memory store exists; state is process-lifetime.

use super::session::Session;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Storage backend for session records
///
/// Methods take closures so read-modify-write happens under one lock
/// acquisition. Across calls there is no transaction: concurrent requests on
/// the same session are last-writer-wins.
pub trait SessionStore: Send + Sync {
    /// Snapshot of a session
    fn get(&self, id: &str) -> Option<Session>;

    /// Apply `update` to the session, creating it with `create` first when
    /// absent
    fn upsert(
        &self,
        id: &str,
        create: &mut dyn FnMut() -> Session,
        update: &mut dyn FnMut(&mut Session),
    ) -> Session;

    /// Apply `update` to an existing session; returns `false` if unknown
    fn update(&self, id: &str, update: &mut dyn FnMut(&mut Session)) -> bool;

    /// Remove a session
    fn remove(&self, id: &str) -> Option<Session>;

    /// Keep only sessions for which `keep` returns true; returns the number
    /// removed
    fn retain(&self, keep: &mut dyn FnMut(&Session) -> bool) -> usize;

    /// Number of stored sessions
    fn len(&self) -> usize;

    /// Whether the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &str) -> Option<Session> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(id).cloned()
    }

    fn upsert(
        &self,
        id: &str,
        create: &mut dyn FnMut() -> Session,
        update: &mut dyn FnMut(&mut Session),
    ) -> Session {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(id.to_string()).or_insert_with(|| create());
        update(session);
        session.clone()
    }

    fn update(&self, id: &str, update: &mut dyn FnMut(&mut Session)) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get_mut(id) {
            Some(session) => {
                update(session);
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(id)
    }

    fn retain(&self, keep: &mut dyn FnMut(&Session) -> bool) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, session| keep(session));
        before - sessions.len()
    }

    fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
