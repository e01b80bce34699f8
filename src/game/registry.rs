//! Registry of live sessions and of which player is in which session

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::error::JoinError;
use super::player::PlayerId;
use super::session::SessionHandle;

/// Registry of all live sessions
pub struct SessionRegistry {
    sessions: DashMap<String, SessionHandle>,
    /// player id → session id
    memberships: DashMap<PlayerId, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id().to_string(), handle);
    }

    /// Drop a session and every membership pointing at it.
    /// Returns `None` when it was already gone.
    pub fn remove(&self, id: &str) -> Option<SessionHandle> {
        let removed = self.sessions.remove(id).map(|(_, h)| h);
        if removed.is_some() {
            self.memberships.retain(|_, session_id| session_id.as_str() != id);
        }
        removed
    }

    /// Record that `player_id` is in `session_id`. Fails when the player
    /// already belongs to a session.
    pub fn claim_membership(&self, player_id: &str, session_id: &str) -> Result<(), JoinError> {
        match self.memberships.entry(player_id.to_string()) {
            Entry::Occupied(_) => Err(JoinError::AlreadyInGame),
            Entry::Vacant(slot) => {
                slot.insert(session_id.to_string());
                Ok(())
            }
        }
    }

    /// Forget the membership, but only if it still points at `session_id`
    pub fn release(&self, player_id: &str, session_id: &str) {
        self.memberships
            .remove_if(player_id, |_, current| current.as_str() == session_id);
    }

    pub fn membership(&self, player_id: &str) -> Option<String> {
        self.memberships.get(player_id).map(|s| s.value().clone())
    }

    /// Players whose membership points at `session_id`
    pub fn members(&self, session_id: &str) -> Vec<PlayerId> {
        self.memberships
            .iter()
            .filter(|m| m.value().as_str() == session_id)
            .map(|m| m.key().clone())
            .collect()
    }

    pub fn sessions(&self) -> Vec<SessionHandle> {
        self.sessions.iter().map(|s| s.value().clone()).collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn player_count(&self) -> usize {
        self.memberships.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_exclusive() {
        let registry = SessionRegistry::new();
        registry.claim_membership("p1", "g1").unwrap();
        assert_eq!(
            registry.claim_membership("p1", "g2"),
            Err(JoinError::AlreadyInGame)
        );
        assert_eq!(registry.membership("p1").as_deref(), Some("g1"));
    }

    #[test]
    fn release_ignores_other_sessions() {
        let registry = SessionRegistry::new();
        registry.claim_membership("p1", "g1").unwrap();
        registry.release("p1", "g2");
        assert_eq!(registry.membership("p1").as_deref(), Some("g1"));
        registry.release("p1", "g1");
        assert_eq!(registry.membership("p1"), None);
        assert_eq!(registry.player_count(), 0);
    }

    #[test]
    fn members_lists_only_that_session() {
        let registry = SessionRegistry::new();
        registry.claim_membership("p1", "g1").unwrap();
        registry.claim_membership("p2", "g1").unwrap();
        registry.claim_membership("p3", "g2").unwrap();

        let mut members = registry.members("g1");
        members.sort();
        assert_eq!(members, vec!["p1".to_string(), "p2".to_string()]);
        assert!(registry.members("g3").is_empty());
    }

    #[test]
    fn removing_a_missing_session_is_a_no_op() {
        let registry = SessionRegistry::new();
        registry.claim_membership("p1", "g1").unwrap();
        assert!(registry.remove("g1").is_none());
        // Memberships are only swept when a session was actually removed
        assert_eq!(registry.player_count(), 1);
    }
}
