//! Permission engine: pure predicates over session, card, and actor.
//!
//! The same predicates drive UI affordance client-side and are re-derived
//! server-side (with the role looked up from the database) before any
//! persisted mutation. All functions are side-effect free and never fail.

use protocol::model::{Card, DeletePermission, MovePermission, Role, Session};

/// Adding cards is allowed whenever the session is unlocked.
#[must_use]
pub fn can_add_card(session: &Session) -> bool {
    !session.is_locked
}

/// Editing content requires an unlocked session and card authorship.
#[must_use]
pub fn can_edit_card(session: &Session, card: &Card, actor_id: &str) -> bool {
    !session.is_locked && card.created_by_id == actor_id
}

/// Moving is never allowed while locked; otherwise governed by the session's
/// move permission ("everyone" opens every card, "creator" only one's own).
#[must_use]
pub fn can_move_card(session: &Session, card: &Card, actor_id: &str) -> bool {
    if session.is_locked {
        return false;
    }
    if session.move_permission == MovePermission::Everyone {
        return true;
    }
    card.created_by_id == actor_id
}

/// Color changes follow the edit rule.
#[must_use]
pub fn can_change_color(session: &Session, card: &Card, actor_id: &str) -> bool {
    can_edit_card(session, card, actor_id)
}

/// AI refinement follows the edit rule.
#[must_use]
pub fn can_refine(session: &Session, card: &Card, actor_id: &str) -> bool {
    can_edit_card(session, card, actor_id)
}

/// Voting requires an unlocked session; self-voting is forbidden
/// unconditionally.
#[must_use]
pub fn can_vote(session: &Session, card: &Card, actor_id: &str) -> bool {
    !session.is_locked && card.created_by_id != actor_id
}

/// Reacting requires only an unlocked session. Unlike votes, reacting to
/// one's own card is allowed.
#[must_use]
pub fn can_react(session: &Session) -> bool {
    !session.is_locked
}

/// The session creator can always delete any card, even while locked.
/// Otherwise deletion is frozen by the lock and then governed by the
/// session's delete permission.
#[must_use]
pub fn can_delete_card(session: &Session, card: &Card, actor_id: &str, role: Role) -> bool {
    if role == Role::Creator {
        return true;
    }
    if session.is_locked {
        return false;
    }
    if session.delete_permission == DeletePermission::Everyone {
        return true;
    }
    card.created_by_id == actor_id
}

/// Only the session creator can change session settings.
#[must_use]
pub fn can_configure_session(role: Role) -> bool {
    role == Role::Creator
}

/// Only the session creator can delete the session.
#[must_use]
pub fn can_delete_session(role: Role) -> bool {
    role == Role::Creator
}

/// Only the session creator can rename the session.
#[must_use]
pub fn can_edit_session_name(role: Role) -> bool {
    role == Role::Creator
}

#[cfg(test)]
#[path = "permissions_test.rs"]
mod tests;
