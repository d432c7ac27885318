use std::collections::BTreeMap;

use protocol::event::CardEvent;
use protocol::model::Card;

use super::*;

fn card(id: &str, by: &str) -> Card {
    Card {
        id: id.into(),
        session_id: "s1".into(),
        content: String::new(),
        color: "#F9E9A8".into(),
        x: 100.0,
        y: 100.0,
        votes: 0,
        voted_by: Vec::new(),
        reactions: BTreeMap::new(),
        created_by_id: by.into(),
        updated_at: 0,
    }
}

#[test]
fn add_appends() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Add { card: card("c1", "a") });
    assert_eq!(store.len(), 1);
    assert!(store.contains("c1"));
}

#[test]
fn add_is_idempotent_on_duplicate_id() {
    let mut store = CardStore::new();
    let c = card("c1", "a");
    store.apply(&CardEvent::Add { card: c.clone() });
    store.apply(&CardEvent::Add { card: c });
    assert_eq!(store.len(), 1);
}

#[test]
fn duplicate_add_keeps_first_version() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Add { card: card("c1", "a") });
    let mut altered = card("c1", "a");
    altered.content = "late replay".into();
    store.apply(&CardEvent::Add { card: altered });
    assert_eq!(store.get("c1").unwrap().content, "");
}

#[test]
fn update_replaces_wholesale() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Add { card: card("c1", "a") });
    let mut updated = card("c1", "a");
    updated.content = "rewritten".into();
    updated.color = "#C4EDBA".into();
    updated.x = 5.0;
    store.apply(&CardEvent::Update { card: updated });

    let got = store.get("c1").unwrap();
    assert_eq!(got.content, "rewritten");
    assert_eq!(got.color, "#C4EDBA");
    assert!((got.x - 5.0).abs() < f64::EPSILON);
}

#[test]
fn update_unknown_id_is_noop() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Update { card: card("ghost", "a") });
    assert!(store.is_empty());
}

#[test]
fn move_patches_position_only() {
    let mut store = CardStore::new();
    let mut c = card("c1", "a");
    c.content = "keep me".into();
    store.apply(&CardEvent::Add { card: c });
    store.apply(&CardEvent::Move { id: "c1".into(), x: -20.0, y: 640.25 });

    let got = store.get("c1").unwrap();
    assert!((got.x - -20.0).abs() < f64::EPSILON);
    assert!((got.y - 640.25).abs() < f64::EPSILON);
    assert_eq!(got.content, "keep me");
}

#[test]
fn typing_patches_content() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Add { card: card("c1", "a") });
    store.apply(&CardEvent::Typing { id: "c1".into(), content: "draft".into() });
    assert_eq!(store.get("c1").unwrap().content, "draft");
}

#[test]
fn color_patches_color() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Add { card: card("c1", "a") });
    store.apply(&CardEvent::Color { id: "c1".into(), color: "#D4B8F0".into() });
    assert_eq!(store.get("c1").unwrap().color, "#D4B8F0");
}

#[test]
fn vote_patches_derived_pair_together() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Add { card: card("c1", "a") });
    store.apply(&CardEvent::Vote {
        id: "c1".into(),
        votes: 2,
        voted_by: vec!["b".into(), "c".into()],
    });

    let got = store.get("c1").unwrap();
    assert_eq!(got.votes, 2);
    assert_eq!(got.voted_by.len(), 2);
    assert_eq!(got.votes, got.voted_by.len() as i64);
}

#[test]
fn delete_removes() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Add { card: card("c1", "a") });
    store.apply(&CardEvent::Delete { id: "c1".into() });
    assert!(store.is_empty());
}

#[test]
fn delete_absent_id_is_noop() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Add { card: card("c1", "a") });
    store.apply(&CardEvent::Delete { id: "nope".into() });
    assert_eq!(store.len(), 1);
}

#[test]
fn sync_merges_only_missing_ids() {
    let mut store = CardStore::new();
    let mut local = card("c1", "a");
    local.content = "local edit".into();
    store.apply(&CardEvent::Add { card: local });

    let mut stale = card("c1", "a");
    stale.content = "stale remote".into();
    store.apply(&CardEvent::Sync { cards: vec![stale, card("c2", "b"), card("c3", "b")] });

    assert_eq!(store.len(), 3);
    // Existing card survives untouched; sync never overwrites.
    assert_eq!(store.get("c1").unwrap().content, "local edit");
    assert!(store.contains("c2"));
    assert!(store.contains("c3"));
}

#[test]
fn user_events_do_not_touch_cards() {
    let mut store = CardStore::new();
    store.apply(&CardEvent::Add { card: card("c1", "a") });
    store.apply(&CardEvent::UserJoin { actor_id: "b".into(), username: "Cozy Tabby".into() });
    store.apply(&CardEvent::UserRename { actor_id: "b".into(), username: "Sassy Neko".into() });
    assert_eq!(store.len(), 1);
}

#[test]
fn insertion_order_is_preserved() {
    let mut store = CardStore::new();
    for id in ["c1", "c2", "c3"] {
        store.apply(&CardEvent::Add { card: card(id, "a") });
    }
    let ids: Vec<&str> = store.cards().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
}

#[test]
fn snapshot_replaces_everything() {
    let mut store = CardStore::with_cards(vec![card("c1", "a")]);
    store.load_snapshot(vec![card("c9", "b")]);
    assert!(!store.contains("c1"));
    assert!(store.contains("c9"));
}
