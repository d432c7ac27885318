use std::collections::BTreeMap;

use protocol::model::{Card, DeletePermission, MovePermission, Role, Session};

use super::*;

fn session() -> Session {
    Session {
        id: "s1".into(),
        name: "Retro".into(),
        is_locked: false,
        move_permission: MovePermission::Creator,
        delete_permission: DeletePermission::Creator,
    }
}

fn locked_session() -> Session {
    Session { is_locked: true, ..session() }
}

fn card_by(actor: &str) -> Card {
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
        created_by_id: actor.into(),
        updated_at: 0,
    }
}

// --- add ---

#[test]
fn add_allowed_when_unlocked() {
    assert!(can_add_card(&session()));
}

#[test]
fn add_denied_when_locked() {
    assert!(!can_add_card(&locked_session()));
}

// --- edit / color / refine ---

#[test]
fn edit_requires_authorship() {
    let s = session();
    let card = card_by("alice");
    assert!(can_edit_card(&s, &card, "alice"));
    assert!(!can_edit_card(&s, &card, "bob"));
}

#[test]
fn edit_denied_when_locked_even_for_author() {
    let card = card_by("alice");
    assert!(!can_edit_card(&locked_session(), &card, "alice"));
}

#[test]
fn color_and_refine_mirror_edit() {
    let s = session();
    let card = card_by("alice");
    assert!(can_change_color(&s, &card, "alice"));
    assert!(!can_change_color(&s, &card, "bob"));
    assert!(can_refine(&s, &card, "alice"));
    assert!(!can_refine(&s, &card, "bob"));
    assert!(!can_change_color(&locked_session(), &card, "alice"));
    assert!(!can_refine(&locked_session(), &card, "alice"));
}

// --- move ---

#[test]
fn move_mode_creator_restricts_to_author() {
    let s = session();
    let card = card_by("alice");
    assert!(can_move_card(&s, &card, "alice"));
    assert!(!can_move_card(&s, &card, "bob"));
}

#[test]
fn move_mode_everyone_opens_all_cards() {
    let s = Session { move_permission: MovePermission::Everyone, ..session() };
    let card = card_by("alice");
    assert!(can_move_card(&s, &card, "bob"));
    assert!(can_move_card(&s, &card, "alice"));
}

#[test]
fn move_denied_when_locked_regardless_of_mode() {
    let s = Session { move_permission: MovePermission::Everyone, is_locked: true, ..session() };
    let card = card_by("alice");
    assert!(!can_move_card(&s, &card, "alice"));
    assert!(!can_move_card(&s, &card, "bob"));
}

// --- vote / react ---

#[test]
fn vote_forbidden_on_own_card() {
    let s = session();
    let card = card_by("alice");
    assert!(!can_vote(&s, &card, "alice"));
    assert!(can_vote(&s, &card, "bob"));
}

#[test]
fn vote_denied_when_locked() {
    let card = card_by("alice");
    assert!(!can_vote(&locked_session(), &card, "bob"));
}

#[test]
fn react_allows_own_card_when_unlocked() {
    assert!(can_react(&session()));
    assert!(!can_react(&locked_session()));
}

// --- delete ---

#[test]
fn session_creator_deletes_anything_even_locked() {
    let card = card_by("alice");
    assert!(can_delete_card(&locked_session(), &card, "bob", Role::Creator));
    assert!(can_delete_card(&session(), &card, "bob", Role::Creator));
}

#[test]
fn participant_delete_frozen_by_lock() {
    let card = card_by("bob");
    assert!(!can_delete_card(&locked_session(), &card, "bob", Role::Participant));
}

#[test]
fn delete_mode_creator_restricts_to_author() {
    let s = session();
    let card = card_by("alice");
    assert!(can_delete_card(&s, &card, "alice", Role::Participant));
    assert!(!can_delete_card(&s, &card, "bob", Role::Participant));
}

#[test]
fn delete_mode_everyone_opens_all_cards() {
    let s = Session { delete_permission: DeletePermission::Everyone, ..session() };
    let card = card_by("alice");
    assert!(can_delete_card(&s, &card, "bob", Role::Participant));
}

// --- session-level ---

#[test]
fn session_admin_requires_creator_role() {
    assert!(can_configure_session(Role::Creator));
    assert!(!can_configure_session(Role::Participant));
    assert!(can_delete_session(Role::Creator));
    assert!(!can_delete_session(Role::Participant));
    assert!(can_edit_session_name(Role::Creator));
    assert!(!can_edit_session_name(Role::Participant));
}

// --- lock freeze sweep ---

#[test]
fn lock_freezes_all_content_mutation() {
    let s = locked_session();
    let own = card_by("p1");
    assert!(!can_add_card(&s));
    assert!(!can_edit_card(&s, &own, "p1"));
    assert!(!can_move_card(&s, &own, "p1"));
    assert!(!can_change_color(&s, &own, "p1"));
    assert!(!can_refine(&s, &own, "p1"));
    assert!(!can_vote(&s, &own, "p2"));
    assert!(!can_delete_card(&s, &own, "p1", Role::Participant));
    assert!(can_delete_card(&s, &own, "p1", Role::Creator));
}
