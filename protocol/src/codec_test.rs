use prost::Message;

use super::*;

fn sample_frame() -> Frame {
    Frame::request("card:create", Data::new())
        .with_session_id("retro-monday")
        .with_from("actor-a")
        .with_data("content", "an idea")
        .with_data("x", 120.5)
        .with_data("pinned", false)
}

#[test]
fn round_trip_preserves_identity_fields() {
    let frame = sample_frame();
    let bytes = encode_frame(&frame);
    let restored = decode_frame(&bytes).expect("decode");

    assert_eq!(restored.id, frame.id);
    assert_eq!(restored.parent_id, frame.parent_id);
    assert_eq!(restored.ts, frame.ts);
    assert_eq!(restored.session_id, frame.session_id);
    assert_eq!(restored.from, frame.from);
    assert_eq!(restored.syscall, frame.syscall);
    assert_eq!(restored.status, frame.status);
}

#[test]
fn round_trip_preserves_payload() {
    let frame = sample_frame();
    let restored = decode_frame(&encode_frame(&frame)).expect("decode");

    assert_eq!(
        restored.data.get("content").and_then(|v| v.as_str()),
        Some("an idea")
    );
    assert_eq!(
        restored.data.get("x").and_then(serde_json::Value::as_f64),
        Some(120.5)
    );
    assert_eq!(
        restored
            .data
            .get("pinned")
            .and_then(serde_json::Value::as_bool),
        Some(false)
    );
}

#[test]
fn round_trip_nested_structures() {
    let frame = Frame::request("sync:event", Data::new()).with_data(
        "envelope",
        serde_json::json!({
            "origin": "actor-a",
            "ts": 7,
            "event": { "type": "card:move", "id": "c1", "x": 1.5, "y": -2.0 },
        }),
    );
    let restored = decode_frame(&encode_frame(&frame)).expect("decode");
    let envelope = restored.data.get("envelope").expect("envelope present");
    assert_eq!(envelope["event"]["type"], "card:move");
    assert_eq!(envelope["event"]["x"], serde_json::json!(1.5));
    assert_eq!(envelope["origin"], "actor-a");
}

#[test]
fn reply_round_trip_keeps_parent() {
    let req = sample_frame();
    let done = req.done_with(Data::from([("id".into(), serde_json::json!("c1"))]));
    let restored = decode_frame(&encode_frame(&done)).expect("decode");
    assert_eq!(restored.parent_id, Some(req.id));
    assert_eq!(restored.status, Status::Done);
}

#[test]
fn null_values_survive() {
    let frame = Frame::request("user:get", Data::new()).with_data("username", serde_json::Value::Null);
    let restored = decode_frame(&encode_frame(&frame)).expect("decode");
    assert_eq!(restored.data.get("username"), Some(&serde_json::Value::Null));
}

#[test]
fn garbage_bytes_fail_decode() {
    let result = decode_frame(&[0xFF, 0x01, 0x02, 0x03, 0x9A]);
    assert!(matches!(result, Err(CodecError::Decode(_))));
}

#[test]
fn invalid_uuid_fails_decode() {
    // Hand-build a wire frame with a non-UUID id.
    let mut frame = sample_frame();
    frame.syscall = "session:get".into();
    let mut bytes = encode_frame(&frame);
    // Re-decode through the raw wire struct to corrupt the id.
    let mut wire = WireFrame::decode(bytes.as_slice()).expect("wire decode");
    wire.id = "not-a-uuid".into();
    bytes.clear();
    wire.encode(&mut bytes).expect("encode");

    assert!(matches!(decode_frame(&bytes), Err(CodecError::InvalidId(_))));
}

#[test]
fn invalid_status_fails_decode() {
    let mut wire = WireFrame::decode(encode_frame(&sample_frame()).as_slice()).expect("wire");
    wire.status = 99;
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    assert!(matches!(
        decode_frame(&bytes),
        Err(CodecError::InvalidStatus(99))
    ));
}
