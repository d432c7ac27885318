//! Presence roster and participant-name cache.
//!
//! Presence is derived, never reconciled: the roster is rebuilt from scratch
//! from the transport's presence state on every (re)subscribe, then patched
//! by join/leave events. The name cache maps actor ids to usernames for the
//! participants view and is fed by join replies and `user:*` events.

use std::collections::{BTreeMap, BTreeSet};

use protocol::model::{ActorId, Participant};

/// Which actors currently hold an open channel subscription.
#[derive(Debug, Default)]
pub struct Roster {
    online: BTreeSet<ActorId>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self { online: BTreeSet::new() }
    }

    /// Rebuild the roster wholesale from a full presence snapshot.
    pub fn rebuild(&mut self, actors: impl IntoIterator<Item = ActorId>) {
        self.online = actors.into_iter().collect();
    }

    /// An actor's channel subscription opened.
    pub fn join(&mut self, actor_id: &str) {
        self.online.insert(actor_id.to_owned());
    }

    /// An actor's channel subscription closed.
    pub fn leave(&mut self, actor_id: &str) {
        self.online.remove(actor_id);
    }

    /// Drop everything, e.g. on disconnect.
    pub fn clear(&mut self) {
        self.online.clear();
    }

    #[must_use]
    pub fn is_online(&self, actor_id: &str) -> bool {
        self.online.contains(actor_id)
    }

    /// Online actor ids in stable order.
    #[must_use]
    pub fn online(&self) -> Vec<ActorId> {
        self.online.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.online.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }
}

/// Actor id -> username cache for the participants view.
#[derive(Debug, Default)]
pub struct Participants {
    names: BTreeMap<ActorId, String>,
}

impl Participants {
    #[must_use]
    pub fn new() -> Self {
        Self { names: BTreeMap::new() }
    }

    /// Seed from a gateway participants list.
    pub fn seed(&mut self, participants: impl IntoIterator<Item = Participant>) {
        for p in participants {
            self.names.insert(p.actor_id, p.username);
        }
    }

    /// Record or update one actor's username (join or rename).
    pub fn record(&mut self, actor_id: &str, username: &str) {
        self.names.insert(actor_id.to_owned(), username.to_owned());
    }

    #[must_use]
    pub fn name_of(&self, actor_id: &str) -> Option<&str> {
        self.names.get(actor_id).map(String::as_str)
    }

    /// All known participants in stable order.
    #[must_use]
    pub fn all(&self) -> Vec<Participant> {
        self.names
            .iter()
            .map(|(actor_id, username)| Participant {
                actor_id: actor_id.clone(),
                username: username.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_rebuild_replaces_state() {
        let mut roster = Roster::new();
        roster.join("a");
        roster.join("b");
        roster.rebuild(vec!["c".to_owned()]);
        assert!(!roster.is_online("a"));
        assert!(roster.is_online("c"));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn roster_join_leave() {
        let mut roster = Roster::new();
        roster.join("a");
        roster.join("a");
        assert_eq!(roster.len(), 1);
        roster.leave("a");
        assert!(roster.is_empty());
        // Leaving an unknown actor is harmless.
        roster.leave("ghost");
    }

    #[test]
    fn participants_rename_overwrites() {
        let mut parts = Participants::new();
        parts.record("a", "Cozy Tabby");
        parts.record("a", "Sassy Neko");
        assert_eq!(parts.name_of("a"), Some("Sassy Neko"));
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn participants_seed_then_lookup() {
        let mut parts = Participants::new();
        parts.seed(vec![
            Participant { actor_id: "a".into(), username: "Fluffy Paws".into() },
            Participant { actor_id: "b".into(), username: "Ginger Biscuit".into() },
        ]);
        assert_eq!(parts.name_of("b"), Some("Ginger Biscuit"));
        assert_eq!(parts.all().len(), 2);
    }
}
