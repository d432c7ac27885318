//! Broadcast card events and their origin-tagged envelope.
//!
//! DESIGN
//! ======
//! Every peer-to-peer mutation travels as a [`CardEvent`] wrapped in an
//! [`Envelope`] carrying the sending actor's id. Receivers drop envelopes
//! whose origin equals their own actor id (echo suppression), which lets one
//! reducer apply local and remote events identically. The event union is an
//! explicit tagged enum: unknown tags are rejected at the receive site, never
//! silently ignored.

use serde::{Deserialize, Serialize};

use crate::model::{ActorId, Card, CardId, SessionId};

/// All wire tags the receive path accepts. Kept in sync with [`CardEvent`].
const KNOWN_TAGS: [&str; 10] = [
    "card:add",
    "card:update",
    "card:move",
    "card:typing",
    "card:color",
    "card:vote",
    "card:delete",
    "cards:sync",
    "user:join",
    "user:rename",
];

/// A single broadcast mutation, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum CardEvent {
    /// Append a card. Idempotent on duplicate id (guards replay).
    #[serde(rename = "card:add")]
    Add { card: Card },
    /// Replace a card wholesale. Last write wins by arrival order.
    #[serde(rename = "card:update")]
    Update { card: Card },
    /// Patch position. High frequency; throttled before broadcast.
    #[serde(rename = "card:move")]
    Move { id: CardId, x: f64, y: f64 },
    /// Patch content. High frequency; throttled before broadcast.
    #[serde(rename = "card:typing")]
    Typing { id: CardId, content: String },
    /// Patch color.
    #[serde(rename = "card:color")]
    Color { id: CardId, color: String },
    /// Patch the derived vote pair, computed by the sender before send.
    #[serde(rename = "card:vote")]
    Vote {
        id: CardId,
        votes: i64,
        voted_by: Vec<ActorId>,
    },
    /// Remove a card. No-op if absent.
    #[serde(rename = "card:delete")]
    Delete { id: CardId },
    /// Full-state catch-up for late joiners. Additive only.
    #[serde(rename = "cards:sync")]
    Sync { cards: Vec<Card> },
    /// A participant announced itself; informs the name cache, not the store.
    #[serde(rename = "user:join")]
    UserJoin { actor_id: ActorId, username: String },
    /// A participant changed its global username.
    #[serde(rename = "user:rename")]
    UserRename { actor_id: ActorId, username: String },
}

impl CardEvent {
    /// The wire tag of this event, for logging and dispatch.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Add { .. } => "card:add",
            Self::Update { .. } => "card:update",
            Self::Move { .. } => "card:move",
            Self::Typing { .. } => "card:typing",
            Self::Color { .. } => "card:color",
            Self::Vote { .. } => "card:vote",
            Self::Delete { .. } => "card:delete",
            Self::Sync { .. } => "cards:sync",
            Self::UserJoin { .. } => "user:join",
            Self::UserRename { .. } => "user:rename",
        }
    }

    /// Whether a wire tag maps to a known event variant.
    #[must_use]
    pub fn is_known_tag(tag: &str) -> bool {
        KNOWN_TAGS.contains(&tag)
    }
}

/// Broadcast wrapper: the event plus its origin tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Sending actor's id. Receivers discard their own envelopes.
    pub origin: ActorId,
    /// Milliseconds since the Unix epoch at send time.
    pub ts: i64,
    pub event: CardEvent,
}

/// Error raised when decoding an inbound envelope.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The `event.type` tag is not part of the protocol.
    #[error("unknown event tag: {0}")]
    UnknownTag(String),
    /// The payload is structurally invalid for its tag.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode an envelope from a JSON value, distinguishing unknown tags from
/// malformed payloads so receivers can log them separately.
///
/// # Errors
///
/// Returns [`EventError::UnknownTag`] for unrecognized `event.type` values
/// and [`EventError::Malformed`] for payloads that fail deserialization.
pub fn decode_envelope(value: serde_json::Value) -> Result<Envelope, EventError> {
    if let Some(tag) = value
        .get("event")
        .and_then(|e| e.get("type"))
        .and_then(|t| t.as_str())
    {
        if !CardEvent::is_known_tag(tag) {
            return Err(EventError::UnknownTag(tag.to_owned()));
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Broadcast channel scope for a session's card events.
#[must_use]
pub fn channel_name(session_id: &SessionId) -> String {
    format!("cards:{session_id}")
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
