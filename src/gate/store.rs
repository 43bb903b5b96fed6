//! Server-side session storage.

use std::{
    collections::HashMap,
    sync::RwLock,
    time::SystemTime,
};

use super::{session::Session, token::SessionKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store lock poisoned")]
    Poisoned,
}

/// Storage for authenticated sessions, keyed by token digest.
///
/// Implementations must give concurrent requests for the same key a consistent
/// view; last write wins.
pub trait SessionStore: Send + Sync {
    /// # Errors
    /// Returns an error if the backing storage is unavailable.
    fn load(&self, key: &SessionKey) -> Result<Option<Session>, SessionStoreError>;

    /// # Errors
    /// Returns an error if the backing storage is unavailable.
    fn save(&self, key: SessionKey, session: Session) -> Result<(), SessionStoreError>;

    /// Remove a session. Returns whether a record existed.
    ///
    /// # Errors
    /// Returns an error if the backing storage is unavailable.
    fn destroy(&self, key: &SessionKey) -> Result<bool, SessionStoreError>;

    /// Drop every session that has expired at `now`, returning how many were removed.
    ///
    /// # Errors
    /// Returns an error if the backing storage is unavailable.
    fn purge_expired(&self, now: SystemTime) -> Result<usize, SessionStoreError>;
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included until the next purge.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, SessionStoreError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionStoreError::Poisoned)?;
        Ok(sessions.len())
    }

    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, SessionStoreError> {
        self.len().map(|len| len == 0)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, key: &SessionKey) -> Result<Option<Session>, SessionStoreError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionStoreError::Poisoned)?;
        Ok(sessions.get(key).cloned())
    }

    fn save(&self, key: SessionKey, session: Session) -> Result<(), SessionStoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionStoreError::Poisoned)?;
        sessions.insert(key, session);
        Ok(())
    }

    fn destroy(&self, key: &SessionKey) -> Result<bool, SessionStoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionStoreError::Poisoned)?;
        Ok(sessions.remove(key).is_some())
    }

    fn purge_expired(&self, now: SystemTime) -> Result<usize, SessionStoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionStoreError::Poisoned)?;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }
}
