//! Registry of live sessions.
//!
//! Sessions are indexed by socket handle for lookup and removal, with a
//! secondary id index so caller-assigned ids stay unique.

use super::{Session, SessionId, SocketHandle};
use crate::error::NetworkError;
use std::collections::HashMap;

/// Owner of every live [`Session`].
///
/// # Invariants
///
/// * each handle maps to at most one session
/// * `ids` holds exactly one entry per session in `sessions`
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SocketHandle, Session>,
    ids: HashMap<SessionId, SocketHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a session.
    ///
    /// Fails without touching the registry if the id or the handle is
    /// already taken. On failure the rejected session is dropped, which
    /// closes its own socket; registered sessions are never evicted.
    pub fn insert(&mut self, session: Session) -> Result<&mut Session, NetworkError> {
        let id = session.id();
        let handle = session.handle();
        if self.ids.contains_key(&id) {
            return Err(NetworkError::DuplicateSession(id));
        }
        if self.sessions.contains_key(&handle) {
            return Err(NetworkError::HandleInUse(handle));
        }
        self.ids.insert(id, handle);
        Ok(self.sessions.entry(handle).or_insert(session))
    }

    pub fn get(&self, handle: SocketHandle) -> Option<&Session> {
        self.sessions.get(&handle)
    }

    pub fn get_mut(&mut self, handle: SocketHandle) -> Option<&mut Session> {
        self.sessions.get_mut(&handle)
    }

    pub fn get_by_id(&self, id: SessionId) -> Option<&Session> {
        self.ids.get(&id).and_then(|handle| self.sessions.get(handle))
    }

    pub fn contains_id(&self, id: SessionId) -> bool {
        self.ids.contains_key(&id)
    }

    /// Removes a session and hands it back to the caller.
    ///
    /// Returns `None` if nothing is registered under `handle`, so removing
    /// the same session twice is harmless.
    pub fn remove(&mut self, handle: SocketHandle) -> Option<Session> {
        let session = self.sessions.remove(&handle)?;
        self.ids.remove(&session.id());
        Some(session)
    }

    /// Removes every session, leaving the registry empty.
    pub fn drain(&mut self) -> impl Iterator<Item = Session> + '_ {
        self.ids.clear();
        self.sessions.drain().map(|(_, session)| session)
    }

    pub fn handles(&self) -> impl Iterator<Item = SocketHandle> + '_ {
        self.sessions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
