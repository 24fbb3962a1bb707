use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::session::{Session, SessionHandle, SessionId};

/// Live connections: `session_id -> SessionHandle`.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<SessionHandle>>,
    seq: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh session id. Ids are never reused.
    pub fn next_id(&self) -> SessionId {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, session: Arc<SessionHandle>) {
        self.sessions.insert(session.id(), session);
    }

    pub fn remove(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.remove(&id).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Close every live session (runs their close hooks) and clear the map.
    /// Returns how many sessions were closed.
    pub fn close_all(&self) -> usize {
        let all: Vec<Arc<SessionHandle>> = self
            .sessions
            .iter()
            .map(|r| Arc::clone(r.value()))
            .collect();
        self.sessions.clear();
        all.iter().filter(|s| s.close()).count()
    }
}
