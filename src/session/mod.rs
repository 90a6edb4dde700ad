//! Session Attributes
//!
//! The core only needs a small key/value capability per caller session:
//! read an attribute, set one, and take one out. [`SessionAttributes`] is
//! that capability. [`MemorySessionStore`] is the in-process store behind
//! the web surface, keyed by a random identifier carried in a cookie.
//!
//! Sessions end by idle expiry only. Every access, reads included, resets
//! the idle timer. Expired sessions are dropped lazily the next time the
//! store is touched; there is no background sweeper.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Session attribute holding the authenticated username
pub const LOGGED_USER: &str = "loggedUser";

/// One-shot error message for the next rendered view
pub const ERROR_MESSAGE: &str = "errorMessage";

/// One-shot success message for the next rendered view
pub const SUCCESS_MESSAGE: &str = "successMessage";

/// Default idle lifetime of a session
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Key/value capability over one caller session
pub trait SessionAttributes {
    fn attribute(&self, key: &str) -> Option<String>;

    fn set_attribute(&self, key: &str, value: String);

    /// Remove and return an attribute (used for flash messages)
    fn take_attribute(&self, key: &str) -> Option<String>;
}

#[derive(Debug)]
struct SessionEntry {
    attributes: HashMap<String, String>,
    last_access: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self { attributes: HashMap::new(), last_access: Instant::now() }
    }
}

/// In-memory session store with idle expiry
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    idle_timeout: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl MemorySessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), idle_timeout }
    }

    /// Resume the session with the given id, or start a new one when the id
    /// is absent, unknown or expired
    pub fn resume_or_create(&self, id: Option<Uuid>) -> Session {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        sessions.retain(|_, entry| now.duration_since(entry.last_access) < self.idle_timeout);

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_access = now;
                return Session { id, store: self.clone() };
            }
        }

        let id = Uuid::new_v4();
        sessions.insert(id, SessionEntry::new());
        tracing::debug!(session = %id, "started new session");
        Session { id, store: self.clone() }
    }

    /// Number of live (not yet purged) sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_entry<T>(&self, id: Uuid, f: impl FnOnce(&mut SessionEntry) -> T) -> Option<T> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let expired = match sessions.get(&id) {
            Some(entry) => now.duration_since(entry.last_access) >= self.idle_timeout,
            None => return None,
        };
        if expired {
            sessions.remove(&id);
            return None;
        }
        sessions.get_mut(&id).map(|entry| {
            entry.last_access = now;
            f(entry)
        })
    }
}

/// Handle to one session inside a [`MemorySessionStore`]
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    store: MemorySessionStore,
}

impl Session {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }
}

impl SessionAttributes for Session {
    fn attribute(&self, key: &str) -> Option<String> {
        self.store.with_entry(self.id, |entry| entry.attributes.get(key).cloned()).flatten()
    }

    fn set_attribute(&self, key: &str, value: String) {
        // Writing to an expired session is a no-op; the caller gets a fresh
        // session on its next request
        self.store.with_entry(self.id, |entry| {
            entry.attributes.insert(key.to_string(), value);
        });
    }

    fn take_attribute(&self, key: &str) -> Option<String> {
        self.store.with_entry(self.id, |entry| entry.attributes.remove(key)).flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_no_attributes() {
        let store = MemorySessionStore::default();
        let session = store.resume_or_create(None);
        assert!(session.attribute(LOGGED_USER).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_resume_existing_session() {
        let store = MemorySessionStore::default();
        let session = store.resume_or_create(None);
        session.set_attribute(LOGGED_USER, "admin".to_string());

        let resumed = store.resume_or_create(Some(session.id()));
        assert_eq!(resumed.id(), session.id());
        assert_eq!(resumed.attribute(LOGGED_USER).as_deref(), Some("admin"));
    }

    #[test]
    fn test_unknown_id_starts_fresh_session() {
        let store = MemorySessionStore::default();
        let unknown = Uuid::new_v4();
        let session = store.resume_or_create(Some(unknown));
        assert_ne!(session.id(), unknown);
    }

    #[test]
    fn test_take_attribute_consumes_flash() {
        let store = MemorySessionStore::default();
        let session = store.resume_or_create(None);
        session.set_attribute(ERROR_MESSAGE, "boom".to_string());

        assert_eq!(session.take_attribute(ERROR_MESSAGE).as_deref(), Some("boom"));
        assert!(session.take_attribute(ERROR_MESSAGE).is_none());
    }

    #[test]
    fn test_idle_session_expires() {
        let store = MemorySessionStore::new(Duration::from_millis(20));
        let session = store.resume_or_create(None);
        session.set_attribute(LOGGED_USER, "admin".to_string());

        std::thread::sleep(Duration::from_millis(50));
        assert!(session.attribute(LOGGED_USER).is_none());

        let resumed = store.resume_or_create(Some(session.id()));
        assert_ne!(resumed.id(), session.id());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reads_keep_session_alive() {
        let store = MemorySessionStore::new(Duration::from_millis(200));
        let session = store.resume_or_create(None);
        session.set_attribute(LOGGED_USER, "admin".to_string());

        // Each read lands inside the idle window; together they outlast it
        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(120));
            assert_eq!(session.attribute(LOGGED_USER).as_deref(), Some("admin"));
        }
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = MemorySessionStore::default();
        let first = store.resume_or_create(None);
        let second = store.resume_or_create(None);
        first.set_attribute(LOGGED_USER, "admin".to_string());

        assert!(second.attribute(LOGGED_USER).is_none());
    }
}
