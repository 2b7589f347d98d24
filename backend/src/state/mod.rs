//! Application state
//!
//! Shared handler state plus the session registry and its storage.

pub mod app_state;
pub mod session;
pub mod store;

pub use app_state::AppState;
pub use session::{generate_session_id, Session, SessionId, SessionRegistry};
pub use store::{InMemorySessionStore, SessionStore};
