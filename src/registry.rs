//! Registry of live sessions
//!
//! The single owner of all session state. Everything else goes through the
//! narrow operation set below (insert, remove, rename, find, list) and looks
//! sessions up by id or username at call time.

use std::collections::HashMap;

use crate::error::RegistryError;
use crate::session::Session;
use crate::types::ConnectionId;

/// Mapping from connection id to session, remembering insertion order
///
/// Invariant: the usernames of any two live sessions differ. Unregistered
/// sessions hold their (unique) connection id as username, and registration
/// rejects any name already held by another live session.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<ConnectionId, Session>,
    /// Connection ids in insertion order
    order: Vec<ConnectionId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly accepted session
    ///
    /// A live session keeps its id: a second session under the same id is
    /// handed back unchanged.
    pub fn insert(&mut self, session: Session) -> Result<(), Session> {
        if self.sessions.contains_key(session.id()) {
            return Err(session);
        }
        let id = session.id().clone();
        self.order.push(id.clone());
        self.sessions.insert(id, session);
        Ok(())
    }

    /// Remove a session; `None` if it was already gone
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        self.order.retain(|o| o != id);
        Some(session)
    }

    /// Give an unregistered session its chosen username
    ///
    /// The candidate is trimmed first. Fails without touching the session when
    /// the name is empty, contains whitespace or a comma, equals a connection
    /// id, or is held by another live session.
    pub fn rename_unregistered_to_named(
        &mut self,
        id: &ConnectionId,
        candidate: &str,
    ) -> Result<&Session, RegistryError> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(RegistryError::EmptyUsername);
        }
        // Names are single tokens: notices and the user list embed them as-is.
        if candidate.contains(|c: char| c.is_whitespace() || c == ',') {
            return Err(RegistryError::InvalidUsername(candidate.to_string()));
        }

        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| RegistryError::UnknownConnection(id.to_string()))?;
        if session.is_registered() {
            return Err(RegistryError::AlreadyRegistered(session.username().to_string()));
        }

        // Own id included: taking it would leave the session looking unregistered.
        let taken = self
            .sessions
            .values()
            .any(|s| s.username() == candidate || s.id().as_str() == candidate);
        if taken {
            return Err(RegistryError::UsernameTaken(candidate.to_string()));
        }

        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownConnection(id.to_string()))?;
        session.set_username(candidate.to_string());
        Ok(&*session)
    }

    /// Look up a registered session by username
    pub fn find_by_username(&self, username: &str) -> Option<&Session> {
        self.iter()
            .find(|s| s.is_registered() && s.username() == username)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Usernames of registered sessions, in insertion order
    pub fn list_usernames(&self) -> Vec<&str> {
        self.iter()
            .filter(|s| s.is_registered())
            .map(Session::username)
            .collect()
    }

    /// All live sessions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.order.iter().filter_map(|id| self.sessions.get(id))
    }

    /// Remove every session, in insertion order
    pub fn drain(&mut self) -> Vec<Session> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.sessions.remove(&id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn session(id: &str) -> Session {
        let (tx, _rx) = mpsc::unbounded_channel();
        Session::new(ConnectionId::new(id), tx)
    }

    fn registry_with(ids: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for id in ids {
            assert!(registry.insert(session(id)).is_ok());
        }
        registry
    }

    #[test]
    fn test_insert_and_remove() {
        let mut registry = registry_with(&["a:1", "a:2"]);
        assert_eq!(registry.len(), 2);

        let removed = registry.remove(&ConnectionId::new("a:1")).unwrap();
        assert_eq!(removed.id().as_str(), "a:1");
        assert_eq!(registry.len(), 1);

        // Second removal is a no-op
        assert!(registry.remove(&ConnectionId::new("a:1")).is_none());
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_insert_refuses_live_id() {
        let mut registry = registry_with(&["a:1"]);
        registry
            .rename_unregistered_to_named(&ConnectionId::new("a:1"), "alice")
            .unwrap();

        let rejected = registry.insert(session("a:1")).unwrap_err();
        assert!(!rejected.is_registered());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_usernames(), vec!["alice"]);
        assert_eq!(registry.iter().count(), 1);
    }

    #[test]
    fn test_rename_rejects_whitespace_and_commas() {
        let mut registry = registry_with(&["a:1"]);
        let id = ConnectionId::new("a:1");

        for bad in ["username set to x", "bob,carol", "tab\there"] {
            assert_eq!(
                registry.rename_unregistered_to_named(&id, bad).unwrap_err(),
                RegistryError::InvalidUsername(bad.to_string())
            );
        }
        assert!(!registry.get(&id).unwrap().is_registered());
        registry.rename_unregistered_to_named(&id, "bob").unwrap();
    }

    #[test]
    fn test_rename_registers_session() {
        let mut registry = registry_with(&["a:1"]);
        let id = ConnectionId::new("a:1");

        let session = registry.rename_unregistered_to_named(&id, "  alice ").unwrap();
        assert_eq!(session.username(), "alice");
        assert!(session.is_registered());
        assert_eq!(registry.find_by_username("alice").unwrap().id(), &id);
    }

    #[test]
    fn test_rename_rejects_duplicate() {
        let mut registry = registry_with(&["a:1", "a:2"]);
        let first = ConnectionId::new("a:1");
        let second = ConnectionId::new("a:2");

        registry.rename_unregistered_to_named(&first, "alice").unwrap();
        let err = registry
            .rename_unregistered_to_named(&second, "alice")
            .unwrap_err();
        assert_eq!(err, RegistryError::UsernameTaken("alice".to_string()));

        // Loser stays unregistered and may retry
        assert!(!registry.get(&second).unwrap().is_registered());
        registry.rename_unregistered_to_named(&second, "bob").unwrap();
        assert_eq!(registry.list_usernames(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_rename_rejects_connection_ids() {
        let mut registry = registry_with(&["a:1", "a:2"]);
        let first = ConnectionId::new("a:1");

        assert!(matches!(
            registry.rename_unregistered_to_named(&first, "a:2"),
            Err(RegistryError::UsernameTaken(_))
        ));
        assert!(matches!(
            registry.rename_unregistered_to_named(&first, "a:1"),
            Err(RegistryError::UsernameTaken(_))
        ));
    }

    #[test]
    fn test_rename_rejects_empty_and_repeat() {
        let mut registry = registry_with(&["a:1"]);
        let id = ConnectionId::new("a:1");

        assert_eq!(
            registry.rename_unregistered_to_named(&id, "   ").unwrap_err(),
            RegistryError::EmptyUsername
        );

        registry.rename_unregistered_to_named(&id, "alice").unwrap();
        assert!(matches!(
            registry.rename_unregistered_to_named(&id, "alicia"),
            Err(RegistryError::AlreadyRegistered(_))
        ));

        assert!(matches!(
            registry.rename_unregistered_to_named(&ConnectionId::new("z:9"), "zed"),
            Err(RegistryError::UnknownConnection(_))
        ));
    }

    #[test]
    fn test_name_freed_on_remove() {
        let mut registry = registry_with(&["a:1", "a:2"]);
        let first = ConnectionId::new("a:1");
        let second = ConnectionId::new("a:2");

        registry.rename_unregistered_to_named(&first, "alice").unwrap();
        registry.remove(&first);
        registry.rename_unregistered_to_named(&second, "alice").unwrap();
        assert_eq!(registry.list_usernames(), vec!["alice"]);
    }

    #[test]
    fn test_list_usernames_skips_unregistered_and_keeps_order() {
        let mut registry = registry_with(&["a:1", "a:2", "a:3"]);
        registry
            .rename_unregistered_to_named(&ConnectionId::new("a:3"), "carol")
            .unwrap();
        registry
            .rename_unregistered_to_named(&ConnectionId::new("a:1"), "alice")
            .unwrap();

        assert_eq!(registry.list_usernames(), vec!["alice", "carol"]);
        assert!(registry.find_by_username("a:2").is_none());
    }

    #[test]
    fn test_drain_empties_registry() {
        let mut registry = registry_with(&["a:1", "a:2"]);
        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].id().as_str(), "a:1");
        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);
    }
}
