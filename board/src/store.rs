//! In-memory card store and the event reducer.
//!
//! DESIGN
//! ======
//! One store owns the card collection for exactly one active session. The
//! single [`CardStore::apply`] entry point is invoked for local optimistic
//! mutations and for remote events off the broadcast channel alike, so both
//! paths share identical application semantics. Cards keep insertion order;
//! order matters only for rendering, never for correctness.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use protocol::event::CardEvent;
use protocol::model::{Card, CardId};

/// Insertion-ordered collection of cards for the active session.
#[derive(Debug, Default)]
pub struct CardStore {
    cards: Vec<Card>,
}

impl CardStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { cards: Vec::new() }
    }

    /// Create a store seeded with an initial snapshot (e.g. a join reply).
    #[must_use]
    pub fn with_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// All cards in insertion order.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Look up a card by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Whether a card with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.cards.iter().any(|c| c.id == id)
    }

    /// Number of cards in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns true if the store holds no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Replace the whole collection, e.g. after a reload from persistence.
    pub fn load_snapshot(&mut self, cards: Vec<Card>) {
        self.cards = cards;
    }

    /// Apply one event to the store. The reducer for both local and remote
    /// mutations.
    pub fn apply(&mut self, event: &CardEvent) {
        match event {
            // Idempotent on duplicate id: replayed adds must not duplicate.
            CardEvent::Add { card } => {
                if !self.contains(&card.id) {
                    self.cards.push(card.clone());
                }
            }
            CardEvent::Update { card } => {
                if let Some(slot) = self.cards.iter_mut().find(|c| c.id == card.id) {
                    *slot = card.clone();
                }
            }
            CardEvent::Move { id, x, y } => {
                self.patch(id, |c| {
                    c.x = *x;
                    c.y = *y;
                });
            }
            CardEvent::Typing { id, content } => {
                self.patch(id, |c| c.content = content.clone());
            }
            CardEvent::Color { id, color } => {
                self.patch(id, |c| c.color = color.clone());
            }
            // The sender computed the derived pair; patch both atomically.
            CardEvent::Vote { id, votes, voted_by } => {
                self.patch(id, |c| {
                    c.votes = *votes;
                    c.voted_by = voted_by.clone();
                });
            }
            CardEvent::Delete { id } => {
                self.cards.retain(|c| c.id != *id);
            }
            // Additive-only merge: never clobbers cards we already hold.
            CardEvent::Sync { cards } => {
                for card in cards {
                    if !self.contains(&card.id) {
                        self.cards.push(card.clone());
                    }
                }
            }
            // Participant identity events do not touch the card collection;
            // the sync session maintains the name cache.
            CardEvent::UserJoin { .. } | CardEvent::UserRename { .. } => {}
        }
    }

    fn patch(&mut self, id: &CardId, f: impl FnOnce(&mut Card)) {
        if let Some(card) = self.cards.iter_mut().find(|c| c.id == *id) {
            f(card);
        }
    }
}
