//! Core data model: sessions, cards, users, and participants.
//!
//! These types are shared verbatim by the server (database rows) and clients
//! (local store + wire payloads). Field names serialize in camelCase to keep
//! one canonical wire shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable fingerprint-derived visitor identity.
pub type ActorId = String;

/// Client-generated opaque card identifier.
pub type CardId = String;

/// Shareable session (board) slug.
pub type SessionId = String;

// =============================================================================
// ENUMS
// =============================================================================

/// Role of an actor within a session. Exactly one creator exists per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Participant,
}

/// Who may move cards while the session is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovePermission {
    Creator,
    Everyone,
}

/// Who may delete cards while the session is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePermission {
    Creator,
    Everyone,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Participant => "participant",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "creator" => Some(Self::Creator),
            "participant" => Some(Self::Participant),
            _ => None,
        }
    }
}

impl MovePermission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Everyone => "everyone",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "creator" => Some(Self::Creator),
            "everyone" => Some(Self::Everyone),
            _ => None,
        }
    }
}

impl DeletePermission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Everyone => "everyone",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "creator" => Some(Self::Creator),
            "everyone" => Some(Self::Everyone),
            _ => None,
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

/// A session (board): a shared canvas of cards plus its access settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    /// Freezes all content-mutating operations board-wide.
    pub is_locked: bool,
    pub move_permission: MovePermission,
    pub delete_permission: DeletePermission,
}

/// An anonymous visitor identity. Usernames are global, not per-session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: ActorId,
    pub username: String,
}

/// Join record surfaced to the participants view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub actor_id: ActorId,
    pub username: String,
}

/// A sticky-note card on the canvas.
///
/// `votes` is derived from `voted_by` and the two are only ever updated as a
/// pair; see [`Card::toggle_vote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub session_id: SessionId,
    /// Free text, markdown-rendered by UIs. Defaults to empty.
    #[serde(default)]
    pub content: String,
    pub color: String,
    /// World-space position.
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub votes: i64,
    #[serde(default)]
    pub voted_by: Vec<ActorId>,
    /// Emoji -> actors who reacted with it.
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<ActorId>>,
    pub created_by_id: ActorId,
    /// Milliseconds since the Unix epoch, advanced by the server on every
    /// persisted mutation.
    #[serde(default)]
    pub updated_at: i64,
}

/// Result of a vote toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Added,
    Removed,
    Denied,
}

impl Card {
    /// Toggle `actor_id`'s membership in `voted_by`, keeping `votes` equal to
    /// the voter-set size. Both fields change together or not at all.
    pub fn toggle_vote(&mut self, actor_id: &str) -> VoteAction {
        let action = if let Some(pos) = self.voted_by.iter().position(|v| v == actor_id) {
            self.voted_by.remove(pos);
            VoteAction::Removed
        } else {
            self.voted_by.push(actor_id.to_owned());
            VoteAction::Added
        };
        #[allow(clippy::cast_possible_wrap)]
        {
            self.votes = self.voted_by.len() as i64;
        }
        action
    }

    /// Toggle `actor_id`'s membership in the reactor set for `emoji`.
    /// Empty reactor sets are dropped. Returns true if the reaction was added.
    pub fn toggle_reaction(&mut self, emoji: &str, actor_id: &str) -> bool {
        let reactors = self.reactions.entry(emoji.to_owned()).or_default();
        if let Some(pos) = reactors.iter().position(|v| v == actor_id) {
            reactors.remove(pos);
            if reactors.is_empty() {
                self.reactions.remove(emoji);
            }
            false
        } else {
            reactors.push(actor_id.to_owned());
            true
        }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

pub const SESSION_NAME_MIN_LENGTH: usize = 2;
pub const SESSION_NAME_MAX_LENGTH: usize = 50;
pub const USERNAME_MIN_LENGTH: usize = 2;
pub const USERNAME_MAX_LENGTH: usize = 30;

/// Why a session name or username was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("must be at least {min} characters")]
    TooShort { min: usize },
    #[error("must be at most {max} characters")]
    TooLong { max: usize },
    #[error("contains invalid characters")]
    ControlCharacters,
}

fn validate_name(name: &str, min: usize, max: usize) -> Result<&str, NameError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(NameError::TooShort { min });
    }
    if len > max {
        return Err(NameError::TooLong { max });
    }
    // ASCII 0-31 and 127 are rejected; everything else is allowed.
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(NameError::ControlCharacters);
    }
    Ok(trimmed)
}

/// Validate a session name, returning the trimmed value.
///
/// # Errors
///
/// Returns [`NameError`] on length or control-character violations.
pub fn validate_session_name(name: &str) -> Result<&str, NameError> {
    validate_name(name, SESSION_NAME_MIN_LENGTH, SESSION_NAME_MAX_LENGTH)
}

/// Validate a username, returning the trimmed value.
///
/// # Errors
///
/// Returns [`NameError`] on length or control-character violations.
pub fn validate_username(name: &str) -> Result<&str, NameError> {
    validate_name(name, USERNAME_MIN_LENGTH, USERNAME_MAX_LENGTH)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn card(created_by: &str) -> Card {
        Card {
            id: "c1".into(),
            session_id: "s1".into(),
            content: String::new(),
            color: "#F9E9A8".into(),
            x: 0.0,
            y: 0.0,
            votes: 0,
            voted_by: Vec::new(),
            reactions: BTreeMap::new(),
            created_by_id: created_by.into(),
            updated_at: 0,
        }
    }

    #[test]
    fn vote_toggle_keeps_derived_count() {
        let mut c = card("alice");
        assert_eq!(c.toggle_vote("bob"), VoteAction::Added);
        assert_eq!(c.votes, 1);
        assert_eq!(c.voted_by, vec!["bob".to_owned()]);

        assert_eq!(c.toggle_vote("bob"), VoteAction::Removed);
        assert_eq!(c.votes, 0);
        assert!(c.voted_by.is_empty());
    }

    #[test]
    fn reaction_toggle_drops_empty_sets() {
        let mut c = card("alice");
        assert!(c.toggle_reaction("🔥", "bob"));
        assert_eq!(c.reactions.get("🔥").map(Vec::len), Some(1));
        assert!(!c.toggle_reaction("🔥", "bob"));
        assert!(c.reactions.is_empty());
    }

    #[test]
    fn card_serde_round_trip_uses_camel_case() {
        let c = card("alice");
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("createdById").is_some());
        assert!(json.get("votedBy").is_some());
        let restored: Card = serde_json::from_value(json).unwrap();
        assert_eq!(restored, c);
    }

    #[test]
    fn session_name_validation_bounds() {
        assert!(validate_session_name("ab").is_ok());
        assert_eq!(
            validate_session_name("a"),
            Err(NameError::TooShort { min: 2 })
        );
        assert_eq!(
            validate_session_name(&"x".repeat(51)),
            Err(NameError::TooLong { max: 50 })
        );
        assert_eq!(validate_session_name(&"x".repeat(50)).unwrap().len(), 50);
    }

    #[test]
    fn username_rejects_control_characters() {
        assert_eq!(
            validate_username("bad\x07name"),
            Err(NameError::ControlCharacters)
        );
        assert_eq!(
            validate_username("del\x7fete"),
            Err(NameError::ControlCharacters)
        );
        assert_eq!(validate_username("  Fluffy Paws  "), Ok("Fluffy Paws"));
    }
}
