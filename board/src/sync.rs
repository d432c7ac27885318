//! Realtime sync session: optimistic local state + peer broadcast stream.
//!
//! DESIGN
//! ======
//! `SyncSession` is the client-side state machine for one active session. It
//! owns the card store, the presence roster, and the per-kind broadcast
//! throttles. It is deliberately transport-agnostic: local mutations return
//! the envelope to broadcast, remote envelopes are fed in by whoever owns the
//! socket, and time arrives as explicit `Instant`s. The caller constructs one
//! per joined session and drops it on leave; there is no shared or
//! module-level channel state.
//!
//! Every mutation follows the same pipeline: permission predicate, immediate
//! reducer application (UI never waits), envelope out for the peers.
//! Persistence runs beside this type as fire-and-forget gateway calls; a
//! later server rejection does not roll the optimistic patch back (accepted
//! eventual-consistency tradeoff, see DESIGN.md).
//!
//! ORDERING
//! ========
//! No cross-card ordering is guaranteed. Concurrent edits to the same field
//! of the same card resolve last-write-wins by arrival order; there are no
//! vector clocks and no CRDT merge.

use std::time::Instant;

use protocol::event::{CardEvent, Envelope};
use protocol::frame::now_ms;
use protocol::model::{ActorId, Card, CardId, Participant, Role, Session, VoteAction};

use crate::colors::DEFAULT_COLOR;
use crate::presence::{Participants, Roster};
use crate::store::CardStore;
use crate::throttle::{BROADCAST_WINDOW, Throttle};
use crate::{ids, permissions};

/// Why a local mutation was refused before it touched the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("card not found: {0}")]
    UnknownCard(CardId),
    #[error("not permitted: {0}")]
    Forbidden(&'static str),
}

/// What happened to an inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Our own broadcast came back; dropped without touching the store.
    Echo,
    /// Applied to the store (or the name cache for `user:*` events).
    Applied,
}

/// Bookkeeping for one-shot refine undo.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RefineUndo {
    card_id: CardId,
    previous_content: String,
}

/// Client-side sync state for one joined session.
pub struct SyncSession {
    actor_id: ActorId,
    username: String,
    session: Session,
    role: Role,
    store: CardStore,
    roster: Roster,
    participants: Participants,
    move_throttle: Throttle<(CardId, f64, f64)>,
    typing_throttle: Throttle<(CardId, String)>,
    last_refine: Option<RefineUndo>,
}

impl SyncSession {
    /// Build a session from a gateway join reply.
    #[must_use]
    pub fn new(
        actor_id: ActorId,
        username: String,
        session: Session,
        role: Role,
        cards: Vec<Card>,
        participants: Vec<Participant>,
        online: Vec<ActorId>,
    ) -> Self {
        let mut names = Participants::new();
        names.seed(participants);
        names.record(&actor_id, &username);

        let mut roster = Roster::new();
        roster.rebuild(online);
        roster.join(&actor_id);

        Self {
            actor_id,
            username,
            session,
            role,
            store: CardStore::with_cards(cards),
            roster,
            participants: names,
            move_throttle: Throttle::new(BROADCAST_WINDOW),
            typing_throttle: Throttle::new(BROADCAST_WINDOW),
            last_refine: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        self.store.cards()
    }

    #[must_use]
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.store.get(id)
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    /// Adopt updated session settings, e.g. after a settings reply.
    pub fn set_session(&mut self, session: Session) {
        self.session = session;
    }

    /// Announcement envelope sent right after subscribing.
    #[must_use]
    pub fn hello(&self) -> Envelope {
        self.envelope(CardEvent::UserJoin {
            actor_id: self.actor_id.clone(),
            username: self.username.clone(),
        })
    }

    // -------------------------------------------------------------------------
    // Local mutations (optimistic apply + envelope out)
    // -------------------------------------------------------------------------

    /// Create a card at a canvas position and stage its broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Forbidden`] while the session is locked.
    pub fn create_card(&mut self, content: &str, x: f64, y: f64) -> Result<(Card, Envelope), SyncError> {
        if !permissions::can_add_card(&self.session) {
            return Err(SyncError::Forbidden("session is locked"));
        }
        let card = Card {
            id: ids::generate_card_id(),
            session_id: self.session.id.clone(),
            content: content.to_owned(),
            color: DEFAULT_COLOR.to_owned(),
            x,
            y,
            votes: 0,
            voted_by: Vec::new(),
            reactions: std::collections::BTreeMap::new(),
            created_by_id: self.actor_id.clone(),
            updated_at: now_ms(),
        };
        let event = CardEvent::Add { card: card.clone() };
        self.store.apply(&event);
        Ok((card, self.envelope(event)))
    }

    /// Replace a card wholesale (used after refine/reaction replies).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownCard`] if the card is gone.
    pub fn update_card(&mut self, card: Card) -> Result<Envelope, SyncError> {
        if !self.store.contains(&card.id) {
            return Err(SyncError::UnknownCard(card.id));
        }
        let event = CardEvent::Update { card };
        self.store.apply(&event);
        Ok(self.envelope(event))
    }

    /// Move a card. The store is patched immediately so dragging feels
    /// instant; the broadcast passes through the move throttle and may be
    /// deferred to a trailing fire.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownCard`] or [`SyncError::Forbidden`] per the
    /// session's move permission.
    pub fn move_card(
        &mut self,
        id: &str,
        x: f64,
        y: f64,
        now: Instant,
    ) -> Result<Option<Envelope>, SyncError> {
        let card = self
            .store
            .get(id)
            .ok_or_else(|| SyncError::UnknownCard(id.to_owned()))?;
        if !permissions::can_move_card(&self.session, card, &self.actor_id) {
            return Err(SyncError::Forbidden("move not permitted"));
        }
        self.store.apply(&CardEvent::Move { id: id.to_owned(), x, y });

        Ok(self
            .move_throttle
            .offer(now, (id.to_owned(), x, y))
            .map(|(id, x, y)| self.envelope(CardEvent::Move { id, x, y })))
    }

    /// Update a card's content while typing. Same throttle discipline as
    /// [`SyncSession::move_card`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownCard`] or [`SyncError::Forbidden`] unless
    /// the caller authored the card in an unlocked session.
    pub fn type_card(
        &mut self,
        id: &str,
        content: &str,
        now: Instant,
    ) -> Result<Option<Envelope>, SyncError> {
        let card = self
            .store
            .get(id)
            .ok_or_else(|| SyncError::UnknownCard(id.to_owned()))?;
        if !permissions::can_edit_card(&self.session, card, &self.actor_id) {
            return Err(SyncError::Forbidden("edit not permitted"));
        }
        let event = CardEvent::Typing { id: id.to_owned(), content: content.to_owned() };
        self.store.apply(&event);

        Ok(self
            .typing_throttle
            .offer(now, (id.to_owned(), content.to_owned()))
            .map(|(id, content)| self.envelope(CardEvent::Typing { id, content })))
    }

    /// Change a card's color.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownCard`] or [`SyncError::Forbidden`] unless
    /// the caller authored the card in an unlocked session.
    pub fn change_color(&mut self, id: &str, color: &str) -> Result<Envelope, SyncError> {
        let card = self
            .store
            .get(id)
            .ok_or_else(|| SyncError::UnknownCard(id.to_owned()))?;
        if !permissions::can_change_color(&self.session, card, &self.actor_id) {
            return Err(SyncError::Forbidden("color change not permitted"));
        }
        let event = CardEvent::Color { id: id.to_owned(), color: color.to_owned() };
        self.store.apply(&event);
        Ok(self.envelope(event))
    }

    /// Delete a card.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownCard`] or [`SyncError::Forbidden`] per the
    /// delete permission (the session creator overrides the lock).
    pub fn remove_card(&mut self, id: &str) -> Result<Envelope, SyncError> {
        let card = self
            .store
            .get(id)
            .ok_or_else(|| SyncError::UnknownCard(id.to_owned()))?;
        if !permissions::can_delete_card(&self.session, card, &self.actor_id, self.role) {
            return Err(SyncError::Forbidden("delete not permitted"));
        }
        let event = CardEvent::Delete { id: id.to_owned() };
        self.store.apply(&event);
        Ok(self.envelope(event))
    }

    /// Toggle our vote on a card. The derived `votes`/`voted_by` pair is
    /// computed here, before send, so every receiver patches both at once.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Forbidden`] for own cards or a locked session.
    pub fn vote(&mut self, id: &str) -> Result<Envelope, SyncError> {
        let card = self
            .store
            .get(id)
            .ok_or_else(|| SyncError::UnknownCard(id.to_owned()))?;
        if !permissions::can_vote(&self.session, card, &self.actor_id) {
            return Err(SyncError::Forbidden("vote not permitted"));
        }
        let mut updated = card.clone();
        let _action: VoteAction = updated.toggle_vote(&self.actor_id);

        let event = CardEvent::Vote {
            id: id.to_owned(),
            votes: updated.votes,
            voted_by: updated.voted_by,
        };
        self.store.apply(&event);
        Ok(self.envelope(event))
    }

    /// Toggle an emoji reaction. Reactions broadcast as a wholesale card
    /// update; there is no dedicated reaction event on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Forbidden`] while the session is locked.
    pub fn react(&mut self, id: &str, emoji: &str) -> Result<Envelope, SyncError> {
        if !permissions::can_react(&self.session) {
            return Err(SyncError::Forbidden("session is locked"));
        }
        let card = self
            .store
            .get(id)
            .ok_or_else(|| SyncError::UnknownCard(id.to_owned()))?;
        let mut updated = card.clone();
        updated.toggle_reaction(emoji, &self.actor_id);
        self.update_card(updated)
    }

    /// Rename ourselves. Propagates to the name cache and to peers.
    pub fn rename_user(&mut self, username: &str) -> Envelope {
        self.username = username.to_owned();
        self.participants.record(&self.actor_id, username);
        self.envelope(CardEvent::UserRename {
            actor_id: self.actor_id.clone(),
            username: username.to_owned(),
        })
    }

    // -------------------------------------------------------------------------
    // Refine undo
    // -------------------------------------------------------------------------

    /// Adopt a refined card from the gateway, remembering the prior content
    /// for one-shot undo. Returns the update envelope to broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownCard`] if the card vanished meanwhile.
    pub fn adopt_refined(
        &mut self,
        card: Card,
        previous_content: String,
    ) -> Result<Envelope, SyncError> {
        let card_id = card.id.clone();
        let envelope = self.update_card(card)?;
        self.last_refine = Some(RefineUndo { card_id, previous_content });
        Ok(envelope)
    }

    /// Undo the most recent refine, once. Returns the typing envelope
    /// restoring the prior content, or `None` if there is nothing to undo.
    pub fn undo_refine(&mut self) -> Option<Envelope> {
        let undo = self.last_refine.take()?;
        if !self.store.contains(&undo.card_id) {
            return None;
        }
        let event = CardEvent::Typing { id: undo.card_id, content: undo.previous_content };
        self.store.apply(&event);
        Some(self.envelope(event))
    }

    // -------------------------------------------------------------------------
    // Throttle plumbing
    // -------------------------------------------------------------------------

    /// Release any throttled trailing broadcasts that have come due.
    pub fn poll_throttled(&mut self, now: Instant) -> Vec<Envelope> {
        let mut out = Vec::new();
        if let Some((id, x, y)) = self.move_throttle.fire_due(now) {
            out.push(self.envelope(CardEvent::Move { id, x, y }));
        }
        if let Some((id, content)) = self.typing_throttle.fire_due(now) {
            out.push(self.envelope(CardEvent::Typing { id, content }));
        }
        out
    }

    /// Earliest instant at which [`SyncSession::poll_throttled`] could yield.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.move_throttle.deadline(), self.typing_throttle.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // -------------------------------------------------------------------------
    // Inbound
    // -------------------------------------------------------------------------

    /// Feed one envelope from the broadcast channel through the reducer.
    /// Envelopes we originated are dropped (echo suppression) so a local
    /// mutation is never double-applied.
    pub fn on_remote(&mut self, envelope: &Envelope) -> Inbound {
        if envelope.origin == self.actor_id {
            return Inbound::Echo;
        }
        match &envelope.event {
            CardEvent::UserJoin { actor_id, username }
            | CardEvent::UserRename { actor_id, username } => {
                self.participants.record(actor_id, username);
            }
            event => self.store.apply(event),
        }
        Inbound::Applied
    }

    /// A peer's presence subscription opened. Late-join catch-up: answer any
    /// other actor's join with our full card list so the newcomer converges
    /// on the union of all live views.
    pub fn on_presence_join(&mut self, actor_id: &str) -> Option<Envelope> {
        if actor_id == self.actor_id {
            return None;
        }
        self.roster.join(actor_id);
        if self.store.is_empty() {
            return None;
        }
        Some(self.envelope(CardEvent::Sync { cards: self.store.cards().to_vec() }))
    }

    /// A peer's presence subscription closed.
    pub fn on_presence_leave(&mut self, actor_id: &str) {
        self.roster.leave(actor_id);
    }

    /// Rebuild presence from scratch after a (re)subscribe.
    pub fn rebuild_presence(&mut self, online: Vec<ActorId>) {
        self.roster.rebuild(online);
        self.roster.join(&self.actor_id);
    }

    fn envelope(&self, event: CardEvent) -> Envelope {
        Envelope { origin: self.actor_id.clone(), ts: now_ms(), event }
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
