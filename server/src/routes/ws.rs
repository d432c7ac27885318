//! WebSocket handler — gateway dispatch and broadcast relay.
//!
//! DESIGN
//! ======
//! On upgrade, the fingerprint-derived actor id is taken from the query
//! string and a per-connection client id is generated. The connection then
//! runs a `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Frames fanned out from room peers → forward to this client
//!
//! Handler functions are pure business logic — they validate, call services,
//! and return an `Outcome`. The dispatch layer owns all outbound concerns:
//! reply to sender and broadcast to peers.
//!
//! Two planes share the socket. Gateway syscalls (`session:*`, `card:*`,
//! `user:*`) validate and persist, replying done/error. The relay plane
//! (`sync:event`, `cursor:move`) forwards payloads to the session's other
//! subscribers without inspecting them, after stamping the authenticated
//! origin.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `gateway:connected` with `client_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply / broadcast / both)
//! 4. Close → broadcast `session:part` → room cleanup

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use protocol::codec;
use protocol::frame::{Data, FRAME_ENVELOPE, Frame};
use protocol::model::{DeletePermission, MovePermission, SessionId};

use crate::services;
use crate::services::card::{CardPatch, NewCard};
use crate::services::session::SettingsPatch;
use crate::state::{AppState, ConnectedActor};

/// Per-client outbound queue depth; slow clients past this drop frames.
const CLIENT_QUEUE_CAPACITY: usize = 256;

/// Upper bound on fingerprint ids; anything longer is rejected at upgrade.
const MAX_ACTOR_ID_LENGTH: usize = 128;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send frames directly.
enum Outcome {
    /// Send done+data to sender only.
    Reply(Data),
    /// Send empty done to sender only.
    Done,
    /// Broadcast data to all session peers EXCLUDING sender. No reply.
    /// Used for the relay plane (card envelopes, cursor moves).
    BroadcastExcludeSender(Data),
    /// Reply to sender with one payload, broadcast different data to peers.
    /// Used for join (reply: state snapshot, broadcast: presence join).
    ReplyAndBroadcast { reply: Data, broadcast: Data },
}

/// Which wire encoding a connection speaks.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Json,
    Binary,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(actor_id) = params.get("actor_id").map(String::as_str) else {
        return (StatusCode::UNAUTHORIZED, "actor_id required").into_response();
    };
    if actor_id.is_empty() || actor_id.len() > MAX_ACTOR_ID_LENGTH {
        return (StatusCode::UNAUTHORIZED, "invalid actor_id").into_response();
    }

    let encoding = if params.get("encoding").map(String::as_str) == Some("binary") {
        Encoding::Binary
    } else {
        Encoding::Json
    };

    let actor_id = actor_id.to_owned();
    ws.on_upgrade(move |socket| run_ws(socket, state, actor_id, encoding))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, actor_id: String, encoding: Encoding) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(CLIENT_QUEUE_CAPACITY);

    let welcome = Frame::request("gateway:connected", Data::new())
        .with_data("client_id", client_id.to_string())
        .with_data("actor_id", actor_id.clone());
    if send_frame(&mut socket, &welcome, encoding).await.is_err() {
        return;
    }

    info!(%client_id, %actor_id, "ws: client connected");

    // Which session channel this connection is subscribed to.
    let mut current_session: Option<SessionId> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                let req = match msg {
                    Message::Text(text) => match serde_json::from_str::<Frame>(&text) {
                        Ok(req) => req,
                        Err(e) => {
                            warn!(%client_id, error = %e, "ws: invalid inbound frame");
                            let err = Frame::request("gateway:error", Data::new())
                                .with_data("message", format!("invalid json: {e}"));
                            let _ = send_frame(&mut socket, &err, encoding).await;
                            continue;
                        }
                    },
                    Message::Binary(bytes) => match codec::decode_frame(&bytes) {
                        Ok(req) => req,
                        Err(e) => {
                            warn!(%client_id, error = %e, "ws: invalid inbound binary frame");
                            let err = Frame::request("gateway:error", Data::new())
                                .with_data("message", format!("invalid frame: {e}"));
                            let _ = send_frame(&mut socket, &err, encoding).await;
                            continue;
                        }
                    },
                    Message::Close(_) => break,
                    _ => continue,
                };

                let replies = process_inbound_frame(
                    &state, &mut current_session, client_id, &actor_id, &client_tx, req,
                ).await;
                for frame in replies {
                    let _ = send_frame(&mut socket, &frame, encoding).await;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame, encoding).await.is_err() {
                    break;
                }
            }
        }
    }

    // Broadcast session:part to peers BEFORE cleanup evicts our sender.
    if let Some(session_id) = current_session {
        if let Some(actor) = services::room::part_room(&state, &session_id, client_id).await {
            let part = Frame::request("session:part", Data::new())
                .with_session_id(session_id.clone())
                .with_from(actor.actor_id.clone())
                .with_data("client_id", client_id.to_string())
                .with_data("actor_id", actor.actor_id)
                .with_data("username", actor.username);
            services::room::broadcast(&state, &session_id, &part, Some(client_id)).await;
        }
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Process one inbound frame and return the frames owed to the sender.
///
/// Kept free of socket concerns so tests can exercise dispatch end-to-end.
async fn process_inbound_frame(
    state: &AppState,
    current_session: &mut Option<SessionId>,
    client_id: Uuid,
    actor_id: &str,
    client_tx: &mpsc::Sender<Frame>,
    mut req: Frame,
) -> Vec<Frame> {
    // Stamp the authenticated actor id; the client's claim is ignored.
    req.from = Some(actor_id.to_owned());

    let prefix = req.prefix().to_owned();
    let is_cursor = prefix == "cursor";
    if !is_cursor {
        info!(%client_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");
    }

    let result = match prefix.as_str() {
        "session" => handle_session(state, current_session, client_id, actor_id, client_tx, &req).await,
        "card" => handle_card(state, current_session.as_ref(), actor_id, &req).await,
        "user" => handle_user(state, actor_id, &req).await,
        "cursor" => Ok(handle_cursor(current_session.as_ref(), client_id, actor_id, &req)),
        "sync" => handle_sync(current_session.as_ref(), actor_id, &req),
        _ => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    let session_id = current_session.clone();
    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::BroadcastExcludeSender(data)) => {
            if let Some(sid) = &session_id {
                let frame = Frame::request(&req.syscall, data)
                    .with_session_id(sid.clone())
                    .with_from(actor_id);
                services::room::broadcast(state, sid, &frame, Some(client_id)).await;
            }
            vec![]
        }
        Ok(Outcome::ReplyAndBroadcast { reply, broadcast }) => {
            let sender_frame = req.done_with(reply);
            if let Some(sid) = &session_id {
                let notif = Frame::request(&req.syscall, broadcast)
                    .with_session_id(sid.clone())
                    .with_from(actor_id);
                services::room::broadcast(state, sid, &notif, Some(client_id)).await;
            }
            vec![sender_frame]
        }
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

async fn handle_session(
    state: &AppState,
    current_session: &mut Option<SessionId>,
    client_id: Uuid,
    actor_id: &str,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);

    match op {
        "get" => {
            let session_id = require_session_id(req)?;
            let session = services::session::get_or_create(&state.pool, &session_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("session", &session)))
        }
        "join" => {
            let session_id = require_session_id(req)?;

            // Leave any previous session channel first.
            if let Some(old) = current_session.take() {
                services::room::part_room(state, &old, client_id).await;
            }

            let user = services::user::get_or_create(&state.pool, &actor_id.to_owned())
                .await
                .map_err(|e| req.error_from(&e))?;
            let session = services::session::get_or_create(&state.pool, &session_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            let role = services::session::join(&state.pool, &actor_id.to_owned(), &session_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            let cards = services::card::list(&state.pool, &session_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            let participants = services::session::participants(&state.pool, &session_id)
                .await
                .map_err(|e| req.error_from(&e))?;

            let online = services::room::join_room(
                state,
                &session_id,
                client_id,
                ConnectedActor { actor_id: actor_id.to_owned(), username: user.username.clone() },
                client_tx.clone(),
            )
            .await;
            *current_session = Some(session_id);

            let mut reply = Data::new();
            reply.insert("session".into(), to_json(&session));
            reply.insert("role".into(), to_json(&role));
            reply.insert("cards".into(), to_json(&cards));
            reply.insert("participants".into(), to_json(&participants));
            reply.insert("online".into(), to_json(&online));
            reply.insert("user".into(), to_json(&user));

            let mut broadcast = Data::new();
            broadcast.insert("client_id".into(), serde_json::json!(client_id));
            broadcast.insert("actor_id".into(), serde_json::json!(actor_id));
            broadcast.insert("username".into(), serde_json::json!(user.username));

            Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
        }
        "rename" => {
            let session_id = require_session_id(req)?;
            let Some(name) = data_str(req, "name") else {
                return Err(req.error("name required"));
            };
            let session = services::session::rename(&state.pool, &session_id, name, actor_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("session", &session)))
        }
        "settings" => {
            let session_id = require_session_id(req)?;
            let patch = parse_settings_patch(req)?;
            let session =
                services::session::update_settings(&state.pool, &session_id, patch, actor_id)
                    .await
                    .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("session", &session)))
        }
        "delete" => {
            let session_id = require_session_id(req)?;
            services::session::delete(&state.pool, &session_id, actor_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Done)
        }
        "participants" => {
            let session_id = require_session_id(req)?;
            let participants = services::session::participants(&state.pool, &session_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("participants", &participants)))
        }
        "cleanup" => {
            let session_id = require_session_id(req)?;
            let deleted = services::card::delete_empty(&state.pool, &session_id, actor_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("deleted_ids", &deleted)))
        }
        _ => Err(req.error(format!("unknown session op: {op}"))),
    }
}

// =============================================================================
// CARD HANDLERS
// =============================================================================

async fn handle_card(
    state: &AppState,
    current_session: Option<&SessionId>,
    actor_id: &str,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);

    match op {
        "create" => {
            let Some(session_id) = current_session else {
                return Err(req.error("must join a session first"));
            };
            let data = NewCard {
                id: data_str(req, "id").map(ToOwned::to_owned),
                content: data_str(req, "content").unwrap_or_default().to_owned(),
                color: data_str(req, "color").map(ToOwned::to_owned),
                x: data_f64(req, "x").unwrap_or(100.0),
                y: data_f64(req, "y").unwrap_or(100.0),
            };
            let card = services::card::create(&state.pool, session_id, data, actor_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("card", &card)))
        }
        "update" => {
            let id = require_card_id(req)?;
            let patch = CardPatch {
                content: data_str(req, "content").map(ToOwned::to_owned),
                x: data_f64(req, "x"),
                y: data_f64(req, "y"),
                color: data_str(req, "color").map(ToOwned::to_owned),
            };
            let card = services::card::update(&state.pool, id, patch, actor_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("card", &card)))
        }
        "vote" => {
            let id = require_card_id(req)?;
            let (card, action) = services::card::vote(&state.pool, id, actor_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            let mut data = json_data("card", &card);
            data.insert("action".into(), to_json(&action));
            Ok(Outcome::Reply(data))
        }
        "react" => {
            let id = require_card_id(req)?;
            let Some(emoji) = data_str(req, "emoji") else {
                return Err(req.error("emoji required"));
            };
            let card = services::card::react(&state.pool, id, emoji, actor_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("card", &card)))
        }
        "delete" => {
            let id = require_card_id(req)?;
            services::card::delete(&state.pool, id, actor_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Done)
        }
        "refine" => {
            let id = require_card_id(req)?;
            let (card, previous) = services::card::refine(state, id, actor_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            let mut data = json_data("card", &card);
            data.insert("previous_content".into(), serde_json::json!(previous));
            Ok(Outcome::Reply(data))
        }
        _ => Err(req.error(format!("unknown card op: {op}"))),
    }
}

// =============================================================================
// USER HANDLERS
// =============================================================================

async fn handle_user(state: &AppState, actor_id: &str, req: &Frame) -> Result<Outcome, Frame> {
    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);

    match op {
        "get" => {
            let user = services::user::get_or_create(&state.pool, &actor_id.to_owned())
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("user", &user)))
        }
        "rename" => {
            let Some(username) = data_str(req, "username") else {
                return Err(req.error("username required"));
            };
            let user = services::user::rename(&state.pool, &actor_id.to_owned(), username)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(json_data("user", &user)))
        }
        _ => Err(req.error(format!("unknown user op: {op}"))),
    }
}

// =============================================================================
// CURSOR HANDLER
// =============================================================================

fn handle_cursor(
    current_session: Option<&SessionId>,
    client_id: Uuid,
    actor_id: &str,
    req: &Frame,
) -> Outcome {
    if current_session.is_none() {
        // Silently ignore cursor moves before joining.
        return Outcome::Done;
    }

    // Positions are world-space; clients convert before sending.
    let x = data_f64(req, "x").unwrap_or(0.0);
    let y = data_f64(req, "y").unwrap_or(0.0);
    let name = data_str(req, "name").unwrap_or("anonymous");

    let mut data = Data::new();
    data.insert("client_id".into(), serde_json::json!(client_id));
    data.insert("actor_id".into(), serde_json::json!(actor_id));
    data.insert("x".into(), serde_json::json!(x));
    data.insert("y".into(), serde_json::json!(y));
    data.insert("name".into(), serde_json::json!(name));

    Outcome::BroadcastExcludeSender(data)
}

// =============================================================================
// RELAY HANDLER
// =============================================================================

/// The broadcast relay plane. The embedded envelope is forwarded verbatim to
/// every other subscriber — the server stamps the authenticated origin but
/// never interprets the event; unknown tags are the receivers' concern.
fn handle_sync(
    current_session: Option<&SessionId>,
    actor_id: &str,
    req: &Frame,
) -> Result<Outcome, Frame> {
    if current_session.is_none() {
        return Err(req.error("must join a session first"));
    }

    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);
    match op {
        "event" => {
            let Some(envelope) = req.data.get(FRAME_ENVELOPE) else {
                return Err(req.error("envelope required"));
            };
            let mut envelope = envelope.clone();
            let Some(fields) = envelope.as_object_mut() else {
                return Err(req.error("envelope must be an object"));
            };
            fields.insert("origin".into(), serde_json::json!(actor_id));

            let mut data = Data::new();
            data.insert(FRAME_ENVELOPE.into(), envelope);
            Ok(Outcome::BroadcastExcludeSender(data))
        }
        _ => Err(req.error(format!("unknown sync op: {op}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame, encoding: Encoding) -> Result<(), ()> {
    let is_cursor = frame.syscall.starts_with("cursor:");
    if !is_cursor {
        if frame.status == protocol::frame::Status::Error {
            let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
            let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
            warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
        } else {
            info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
        }
    }

    let message = match encoding {
        Encoding::Json => {
            let json = match serde_json::to_string(frame) {
                Ok(j) => j,
                Err(e) => {
                    warn!(error = %e, "ws: failed to serialize frame");
                    return Err(());
                }
            };
            Message::Text(json.into())
        }
        Encoding::Binary => Message::Binary(codec::encode_frame(frame).into()),
    };

    socket.send(message).await.map_err(|_| ())
}

fn to_json<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}

fn json_data<T: serde::Serialize>(key: &str, value: &T) -> Data {
    let mut data = Data::new();
    data.insert(key.to_owned(), to_json(value));
    data
}

fn data_str<'a>(req: &'a Frame, key: &str) -> Option<&'a str> {
    req.data.get(key).and_then(|v| v.as_str())
}

fn data_f64(req: &Frame, key: &str) -> Option<f64> {
    req.data.get(key).and_then(serde_json::Value::as_f64)
}

fn require_session_id(req: &Frame) -> Result<SessionId, Frame> {
    req.session_id
        .clone()
        .or_else(|| data_str(req, "session_id").map(ToOwned::to_owned))
        .ok_or_else(|| req.error("session_id required"))
}

fn require_card_id<'a>(req: &'a Frame) -> Result<&'a str, Frame> {
    data_str(req, "id").ok_or_else(|| req.error("id required"))
}

fn parse_settings_patch(req: &Frame) -> Result<SettingsPatch, Frame> {
    let move_permission = match data_str(req, "move_permission") {
        Some(raw) => Some(
            MovePermission::parse(raw).ok_or_else(|| req.error("invalid move_permission"))?,
        ),
        None => None,
    };
    let delete_permission = match data_str(req, "delete_permission") {
        Some(raw) => Some(
            DeletePermission::parse(raw).ok_or_else(|| req.error("invalid delete_permission"))?,
        ),
        None => None,
    };
    Ok(SettingsPatch {
        is_locked: req.data.get("is_locked").and_then(serde_json::Value::as_bool),
        move_permission,
        delete_permission,
    })
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
