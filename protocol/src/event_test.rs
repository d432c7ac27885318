use std::collections::BTreeMap;

use super::*;

fn sample_card(id: &str) -> Card {
    Card {
        id: id.into(),
        session_id: "retro-monday".into(),
        content: "ship it".into(),
        color: "#C4EDBA".into(),
        x: 120.0,
        y: -40.5,
        votes: 0,
        voted_by: Vec::new(),
        reactions: BTreeMap::new(),
        created_by_id: "actor-a".into(),
        updated_at: 1_700_000_000_000,
    }
}

fn envelope(event: CardEvent) -> Envelope {
    Envelope {
        origin: "actor-a".into(),
        ts: 1_700_000_000_123,
        event,
    }
}

#[test]
fn add_event_serializes_with_wire_tag() {
    let env = envelope(CardEvent::Add {
        card: sample_card("c1"),
    });
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(json["event"]["type"], "card:add");
    assert_eq!(json["event"]["card"]["createdById"], "actor-a");
    assert_eq!(json["origin"], "actor-a");
}

#[test]
fn vote_event_fields_are_camel_case() {
    let env = envelope(CardEvent::Vote {
        id: "c1".into(),
        votes: 2,
        voted_by: vec!["b".into(), "c".into()],
    });
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(json["event"]["type"], "card:vote");
    assert_eq!(json["event"]["votedBy"], serde_json::json!(["b", "c"]));
}

#[test]
fn round_trip_every_variant() {
    let events = vec![
        CardEvent::Add { card: sample_card("c1") },
        CardEvent::Update { card: sample_card("c1") },
        CardEvent::Move { id: "c1".into(), x: 1.0, y: 2.0 },
        CardEvent::Typing { id: "c1".into(), content: "hm".into() },
        CardEvent::Color { id: "c1".into(), color: "#D4B8F0".into() },
        CardEvent::Vote { id: "c1".into(), votes: 1, voted_by: vec!["b".into()] },
        CardEvent::Delete { id: "c1".into() },
        CardEvent::Sync { cards: vec![sample_card("c1"), sample_card("c2")] },
        CardEvent::UserJoin { actor_id: "b".into(), username: "Cozy Tabby".into() },
        CardEvent::UserRename { actor_id: "b".into(), username: "Sassy Neko".into() },
    ];
    for event in events {
        let tag = event.tag();
        let env = envelope(event.clone());
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["event"]["type"], tag);
        let restored = decode_envelope(value).unwrap();
        assert_eq!(restored.event, event);
        assert_eq!(restored.origin, "actor-a");
    }
}

#[test]
fn unknown_tag_is_rejected_not_ignored() {
    let value = serde_json::json!({
        "origin": "actor-a",
        "ts": 0,
        "event": { "type": "card:explode", "id": "c1" },
    });
    match decode_envelope(value) {
        Err(EventError::UnknownTag(tag)) => assert_eq!(tag, "card:explode"),
        other => panic!("expected UnknownTag, got {other:?}"),
    }
}

#[test]
fn malformed_known_tag_is_malformed() {
    // Known tag but missing required fields.
    let value = serde_json::json!({
        "origin": "actor-a",
        "ts": 0,
        "event": { "type": "card:move", "id": "c1" },
    });
    assert!(matches!(
        decode_envelope(value),
        Err(EventError::Malformed(_))
    ));
}

#[test]
fn known_tags_match_variants() {
    assert!(CardEvent::is_known_tag("cards:sync"));
    assert!(CardEvent::is_known_tag("user:rename"));
    assert!(!CardEvent::is_known_tag("cards:sync2"));
    assert!(!CardEvent::is_known_tag(""));
}

#[test]
fn channel_name_scopes_by_session() {
    assert_eq!(channel_name(&"abc123".to_owned()), "cards:abc123");
}
