//! Room service — channel subscriptions, presence, and broadcast fan-out.
//!
//! DESIGN
//! ======
//! A room is the server end of one session's broadcast channel. Joining
//! subscribes a connection's sender; parting drops it and evicts the room
//! when the last client leaves. Broadcast is best-effort: a client whose
//! queue is full is skipped rather than blocking the fan-out.

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use protocol::frame::Frame;
use protocol::model::{ActorId, SessionId};

use crate::state::{AppState, ConnectedActor};

/// Subscribe a connection to a session's channel. Returns the distinct actor
/// ids currently online in the room, including the new arrival.
pub async fn join_room(
    state: &AppState,
    session_id: &SessionId,
    client_id: Uuid,
    actor: ConnectedActor,
    tx: mpsc::Sender<Frame>,
) -> Vec<ActorId> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(session_id.clone()).or_default();
    room.clients.insert(client_id, tx);
    room.actors.insert(client_id, actor);

    info!(%session_id, %client_id, clients = room.clients.len(), "client joined room");
    distinct_actors(room.actors.values())
}

/// Unsubscribe a connection. Returns the removed presence record so the
/// caller can broadcast the part. Evicts the room when it empties.
pub async fn part_room(
    state: &AppState,
    session_id: &SessionId,
    client_id: Uuid,
) -> Option<ConnectedActor> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(session_id)?;

    room.clients.remove(&client_id);
    let removed = room.actors.remove(&client_id);
    info!(%session_id, %client_id, remaining = room.clients.len(), "client left room");

    if room.clients.is_empty() {
        rooms.remove(session_id);
        info!(%session_id, "evicted room from memory");
    }
    removed
}

/// Distinct actor ids currently subscribed to a session's channel.
pub async fn online_actors(state: &AppState, session_id: &SessionId) -> Vec<ActorId> {
    let rooms = state.rooms.read().await;
    rooms
        .get(session_id)
        .map(|room| distinct_actors(room.actors.values()))
        .unwrap_or_default()
}

/// Broadcast a frame to all clients in a room, optionally excluding one.
pub async fn broadcast(state: &AppState, session_id: &SessionId, frame: &Frame, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(session_id) else {
        return;
    };

    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = tx.try_send(frame.clone());
    }
}

fn distinct_actors<'a>(actors: impl Iterator<Item = &'a ConnectedActor>) -> Vec<ActorId> {
    let mut ids: Vec<ActorId> = actors.map(|a| a.actor_id.clone()).collect();
    ids.sort();
    ids.dedup();
    ids
}
