use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::session::{AuthEvent, AuthSession, LoadTicket, LoadedUserData};

/// In-memory session state, keyed by session id (the `sid` token claim).
/// Constructed once at startup and carried in the server context; entries
/// live from sign-in (or restore) until sign-out.
pub type SessionRegistry = Arc<RwLock<HashMap<String, AuthSession>>>;

#[must_use]
pub fn create_session_registry() -> SessionRegistry {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Applies an event to a session, creating the entry when needed.
pub async fn dispatch_event(sessions: &SessionRegistry, session_id: &str, event: AuthEvent) {
    let mut sessions = sessions.write().await;
    sessions.entry(session_id.to_string()).or_default().handle_event(event);
}

/// Sign-out teardown: clears the session in place (bumping its epoch so
/// in-flight loads are discarded), then drops the entry entirely.
pub async fn remove_session(sessions: &SessionRegistry, session_id: &str) {
    let mut sessions = sessions.write().await;
    if let Some(session) = sessions.get_mut(session_id) {
        session.handle_event(AuthEvent::SignedOut);
    }
    sessions.remove(session_id);
}

pub async fn begin_load(sessions: &SessionRegistry, session_id: &str) -> Option<LoadTicket> {
    let mut sessions = sessions.write().await;
    sessions.get_mut(session_id).map(AuthSession::begin_load)
}

/// Hands a finished load to its session. Returns false when the result was
/// discarded (stale ticket or removed entry).
pub async fn apply_load(
    sessions: &SessionRegistry,
    session_id: &str,
    ticket: LoadTicket,
    data: LoadedUserData,
) -> bool {
    let mut sessions = sessions.write().await;
    match sessions.get_mut(session_id) {
        Some(session) => session.apply_load(ticket, data),
        None => false,
    }
}

pub async fn contains(sessions: &SessionRegistry, session_id: &str) -> bool {
    sessions.read().await.contains_key(session_id)
}

/// Cloned view of a session for read-only use (guard evaluation, snapshots).
pub async fn get_session(sessions: &SessionRegistry, session_id: &str) -> Option<AuthSession> {
    sessions.read().await.get(session_id).cloned()
}

/// Runs a closure against a session under the write lock.
pub async fn with_session<F, R>(sessions: &SessionRegistry, session_id: &str, f: F) -> Option<R>
where
    F: FnOnce(&mut AuthSession) -> R,
{
    let mut sessions = sessions.write().await;
    sessions.get_mut(session_id).map(f)
}
