//! Headless ideaboard client.
//!
//! Drives the realtime sync core against a gateway server from the command
//! line: every mutating command runs the same pipeline a browser tab would —
//! optimistic apply through `SyncSession`, envelope broadcast over
//! `sync:event`, fire-and-forget persistence via the gateway syscall — and
//! `watch` tails a session's broadcast stream.

mod gateway;

use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use board::SyncSession;
use canvas::consts::{CARD_HEIGHT, CARD_WIDTH};
use canvas::{Camera, Minimap, Point, Rect, Size};
use protocol::event::{Envelope, decode_envelope};
use protocol::frame::{Data, FRAME_ENVELOPE, Frame};
use protocol::model::SessionId;

use gateway::{ClientError, Gateway};

#[derive(Parser, Debug)]
#[command(name = "ideaboard", about = "Ideaboard gateway and sync CLI")]
struct Cli {
    #[arg(long, env = "IDEABOARD_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Stable fingerprint-derived identity. Generated (and printed) if absent.
    #[arg(long, env = "IDEABOARD_ACTOR_ID")]
    actor_id: Option<String>,

    /// Speak JSON frames instead of protobuf binary.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct Context {
    base_url: String,
    actor_id: String,
    binary: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Health-check the gateway.
    Ping,
    Session(SessionCommand),
    User(UserCommand),
    Card(CardCommand),
    /// Join a session and stream its broadcast traffic to stdout.
    Watch {
        session_id: SessionId,
        /// Also print cursor traffic (noisy).
        #[arg(long, default_value_t = false)]
        cursors: bool,
    },
}

#[derive(Args, Debug)]
struct SessionCommand {
    #[command(subcommand)]
    command: SessionSubcommand,
}

#[derive(Subcommand, Debug)]
enum SessionSubcommand {
    /// Get or lazily create a session.
    Get { session_id: SessionId },
    Rename {
        session_id: SessionId,
        name: String,
    },
    Settings {
        session_id: SessionId,
        #[arg(long)]
        lock: Option<bool>,
        #[arg(long)]
        move_permission: Option<String>,
        #[arg(long)]
        delete_permission: Option<String>,
    },
    Delete { session_id: SessionId },
    Participants { session_id: SessionId },
    /// Creator-only bulk delete of blank cards.
    Cleanup { session_id: SessionId },
    /// Fit-to-content camera plus minimap geometry for the session.
    Overview {
        session_id: SessionId,
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
        #[arg(long, default_value_t = 720.0)]
        height: f64,
    },
}

#[derive(Args, Debug)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Subcommand, Debug)]
enum UserSubcommand {
    /// Get or lazily create our user row.
    Get,
    /// Change the global username; broadcast to a session when given.
    Rename {
        username: String,
        #[arg(long)]
        session_id: Option<SessionId>,
    },
}

#[derive(Args, Debug)]
struct CardCommand {
    #[command(subcommand)]
    command: CardSubcommand,
}

#[derive(Subcommand, Debug)]
enum CardSubcommand {
    Add {
        session_id: SessionId,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long, default_value_t = 100.0)]
        x: f64,
        #[arg(long, default_value_t = 100.0)]
        y: f64,
    },
    Move {
        session_id: SessionId,
        id: String,
        x: f64,
        y: f64,
    },
    /// Simulate a drag: many rapid moves, throttled broadcast, one persist.
    Drag {
        session_id: SessionId,
        id: String,
        #[arg(long)]
        to_x: f64,
        #[arg(long)]
        to_y: f64,
        #[arg(long, default_value_t = 20)]
        steps: u32,
        #[arg(long, default_value_t = 10)]
        interval_ms: u64,
    },
    Edit {
        session_id: SessionId,
        id: String,
        content: String,
    },
    Color {
        session_id: SessionId,
        id: String,
        color: String,
    },
    Vote {
        session_id: SessionId,
        id: String,
    },
    React {
        session_id: SessionId,
        id: String,
        emoji: String,
    },
    Delete {
        session_id: SessionId,
        id: String,
    },
    Refine {
        session_id: SessionId,
        id: String,
        /// Immediately restore the previous content after refining.
        #[arg(long, default_value_t = false)]
        undo: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();
    let actor_id = cli.actor_id.unwrap_or_else(|| {
        let generated = format!("anon-{}", Uuid::new_v4().simple());
        eprintln!("no actor id given; using {generated} (set IDEABOARD_ACTOR_ID to keep it)");
        generated
    });
    let ctx = Context { base_url: cli.base_url, actor_id, binary: !cli.json };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Session(session) => run_session(&ctx, session).await,
        Command::User(user) => run_user(&ctx, user).await,
        Command::Card(card) => run_card(&ctx, card).await,
        Command::Watch { session_id, cursors } => run_watch(&ctx, &session_id, cursors).await,
    }
}

// =============================================================================
// PLUMBING
// =============================================================================

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
}

fn print_reply(reply: &Frame) {
    print_json(&serde_json::to_value(&reply.data).unwrap_or_default());
}

fn sync_event_frame(session_id: &SessionId, envelope: &Envelope) -> Frame {
    Frame::request("sync:event", Data::new())
        .with_session_id(session_id.clone())
        .with_data(
            FRAME_ENVELOPE,
            serde_json::to_value(envelope).unwrap_or_default(),
        )
}

/// Connect, join, build the sync session, and announce ourselves.
async fn joined(ctx: &Context, session_id: &SessionId) -> Result<(Gateway, SyncSession), ClientError> {
    let mut gw = Gateway::connect(&ctx.base_url, &ctx.actor_id, ctx.binary).await?;
    let state = gw.join(session_id).await?;
    let sync = SyncSession::new(
        ctx.actor_id.clone(),
        state.user.username.clone(),
        state.session,
        state.role,
        state.cards,
        state.participants,
        state.online,
    );
    gw.send(&sync_event_frame(session_id, &sync.hello())).await?;
    Ok((gw, sync))
}

async fn broadcast(
    gw: &mut Gateway,
    session_id: &SessionId,
    envelope: &Envelope,
) -> Result<(), ClientError> {
    gw.send(&sync_event_frame(session_id, envelope)).await
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_ping(ctx: &Context) -> Result<(), ClientError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", ctx.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(ClientError::ServerError {
            syscall: format!("HTTP {}", response.status().as_u16()),
            code: "-".into(),
            message: "health check failed".into(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_session(ctx: &Context, session: SessionCommand) -> Result<(), ClientError> {
    match session.command {
        SessionSubcommand::Get { session_id } => {
            let mut gw = Gateway::connect(&ctx.base_url, &ctx.actor_id, ctx.binary).await?;
            let req = Frame::request("session:get", Data::new()).with_session_id(session_id);
            print_reply(&gw.request(req).await?);
            Ok(())
        }
        SessionSubcommand::Rename { session_id, name } => {
            let mut gw = Gateway::connect(&ctx.base_url, &ctx.actor_id, ctx.binary).await?;
            let req = Frame::request("session:rename", Data::new())
                .with_session_id(session_id)
                .with_data("name", name);
            print_reply(&gw.request(req).await?);
            Ok(())
        }
        SessionSubcommand::Settings { session_id, lock, move_permission, delete_permission } => {
            let mut gw = Gateway::connect(&ctx.base_url, &ctx.actor_id, ctx.binary).await?;
            let mut req = Frame::request("session:settings", Data::new()).with_session_id(session_id);
            if let Some(lock) = lock {
                req = req.with_data("is_locked", lock);
            }
            if let Some(mode) = move_permission {
                req = req.with_data("move_permission", mode);
            }
            if let Some(mode) = delete_permission {
                req = req.with_data("delete_permission", mode);
            }
            print_reply(&gw.request(req).await?);
            Ok(())
        }
        SessionSubcommand::Delete { session_id } => {
            let mut gw = Gateway::connect(&ctx.base_url, &ctx.actor_id, ctx.binary).await?;
            let req = Frame::request("session:delete", Data::new()).with_session_id(session_id);
            gw.request(req).await?;
            println!("deleted");
            Ok(())
        }
        SessionSubcommand::Participants { session_id } => {
            let mut gw = Gateway::connect(&ctx.base_url, &ctx.actor_id, ctx.binary).await?;
            let req = Frame::request("session:participants", Data::new()).with_session_id(session_id);
            print_reply(&gw.request(req).await?);
            Ok(())
        }
        SessionSubcommand::Cleanup { session_id } => {
            // Join first: peers learn about the removals through our deletes.
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            let req = Frame::request("session:cleanup", Data::new()).with_session_id(session_id.clone());
            let reply = gw.request(req).await?;
            let deleted: Vec<String> = reply
                .data
                .get("deleted_ids")
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();
            for id in &deleted {
                if let Ok(envelope) = sync.remove_card(id) {
                    broadcast(&mut gw, &session_id, &envelope).await?;
                }
            }
            print_json(&serde_json::json!({ "deleted_ids": deleted }));
            Ok(())
        }
        SessionSubcommand::Overview { session_id, width, height } => {
            let (_gw, sync) = joined(ctx, &session_id).await?;
            let positions: Vec<Point> =
                sync.cards().iter().map(|c| Point::new(c.x, c.y)).collect();

            let mut camera = Camera::default();
            let viewport = Size::new(width, height);
            if let Some(bounds) = card_bounds(&positions) {
                camera.fit_to_bounds(bounds, viewport);
            }

            let map = Minimap::layout(&positions);
            let view = map.viewport_rect(&camera, viewport);
            print_json(&serde_json::json!({
                "cards": positions.len(),
                "camera": camera,
                "minimap": {
                    "size": map.size,
                    "scale": map.scale,
                    "world_bounds": map.world_bounds,
                    "viewport": view,
                    "markers": map.card_markers(&positions).len(),
                },
            }));
            Ok(())
        }
    }
}

fn card_bounds(positions: &[Point]) -> Option<Rect> {
    let first = positions.first()?;
    let mut bounds = Rect::new(first.x, first.y, first.x + CARD_WIDTH, first.y + CARD_HEIGHT);
    for p in positions {
        bounds.min_x = bounds.min_x.min(p.x);
        bounds.min_y = bounds.min_y.min(p.y);
        bounds.max_x = bounds.max_x.max(p.x + CARD_WIDTH);
        bounds.max_y = bounds.max_y.max(p.y + CARD_HEIGHT);
    }
    Some(bounds)
}

async fn run_user(ctx: &Context, user: UserCommand) -> Result<(), ClientError> {
    match user.command {
        UserSubcommand::Get => {
            let mut gw = Gateway::connect(&ctx.base_url, &ctx.actor_id, ctx.binary).await?;
            print_reply(&gw.request(Frame::request("user:get", Data::new())).await?);
            Ok(())
        }
        UserSubcommand::Rename { username, session_id } => {
            match session_id {
                Some(session_id) => {
                    let (mut gw, mut sync) = joined(ctx, &session_id).await?;
                    let req = Frame::request("user:rename", Data::new())
                        .with_data("username", username.clone());
                    let reply = gw.request(req).await?;
                    let envelope = sync.rename_user(&username);
                    broadcast(&mut gw, &session_id, &envelope).await?;
                    print_reply(&reply);
                }
                None => {
                    let mut gw = Gateway::connect(&ctx.base_url, &ctx.actor_id, ctx.binary).await?;
                    let req = Frame::request("user:rename", Data::new()).with_data("username", username);
                    print_reply(&gw.request(req).await?);
                }
            }
            Ok(())
        }
    }
}

#[allow(clippy::too_many_lines)]
async fn run_card(ctx: &Context, card: CardCommand) -> Result<(), ClientError> {
    match card.command {
        CardSubcommand::Add { session_id, content, x, y } => {
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            let (created, envelope) = sync.create_card(&content, x, y)?;
            broadcast(&mut gw, &session_id, &envelope).await?;

            let persist = Frame::request("card:create", Data::new())
                .with_session_id(session_id)
                .with_data("id", created.id.clone())
                .with_data("content", created.content.clone())
                .with_data("color", created.color.clone())
                .with_data("x", created.x)
                .with_data("y", created.y);
            print_reply(&gw.request(persist).await?);
            Ok(())
        }
        CardSubcommand::Move { session_id, id, x, y } => {
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            if let Some(envelope) = sync.move_card(&id, x, y, Instant::now())? {
                broadcast(&mut gw, &session_id, &envelope).await?;
            }
            let persist = Frame::request("card:update", Data::new())
                .with_session_id(session_id)
                .with_data("id", id)
                .with_data("x", x)
                .with_data("y", y);
            print_reply(&gw.request(persist).await?);
            Ok(())
        }
        CardSubcommand::Drag { session_id, id, to_x, to_y, steps, interval_ms } => {
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            let start = sync
                .card(&id)
                .map(|c| (c.x, c.y))
                .ok_or(ClientError::MissingField("card"))?;

            // Cursor sharing rides the same transport on its own throttle.
            let mut cursor = board::Throttle::new(board::throttle::BROADCAST_WINDOW);

            let steps = steps.max(1);
            let mut sends = 0_u32;
            for step in 1..=steps {
                let t = f64::from(step) / f64::from(steps);
                let x = start.0 + (to_x - start.0) * t;
                let y = start.1 + (to_y - start.1) * t;
                // The store tracks every step; the network only sees what
                // survives the throttle.
                if let Some(envelope) = sync.move_card(&id, x, y, Instant::now())? {
                    broadcast(&mut gw, &session_id, &envelope).await?;
                    sends += 1;
                }
                for envelope in sync.poll_throttled(Instant::now()) {
                    broadcast(&mut gw, &session_id, &envelope).await?;
                    sends += 1;
                }
                for (cx, cy) in cursor
                    .offer(Instant::now(), (x, y))
                    .into_iter()
                    .chain(cursor.fire_due(Instant::now()))
                {
                    let frame = Frame::request("cursor:move", Data::new())
                        .with_session_id(session_id.clone())
                        .with_data("x", cx)
                        .with_data("y", cy)
                        .with_data("name", sync.username().to_owned());
                    gw.send_and_forget(frame).await?;
                }
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            }
            // Flush the trailing fire so the final position reaches peers.
            if let Some(deadline) = sync.next_deadline() {
                tokio::time::sleep_until(deadline.into()).await;
                for envelope in sync.poll_throttled(Instant::now()) {
                    broadcast(&mut gw, &session_id, &envelope).await?;
                    sends += 1;
                }
            }

            let persist = Frame::request("card:update", Data::new())
                .with_session_id(session_id)
                .with_data("id", id)
                .with_data("x", to_x)
                .with_data("y", to_y);
            let reply = gw.request(persist).await?;
            print_json(&serde_json::json!({
                "steps": steps,
                "broadcasts": sends,
                "card": reply.data.get("card"),
            }));
            Ok(())
        }
        CardSubcommand::Edit { session_id, id, content } => {
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            if let Some(envelope) = sync.type_card(&id, &content, Instant::now())? {
                broadcast(&mut gw, &session_id, &envelope).await?;
            }
            let persist = Frame::request("card:update", Data::new())
                .with_session_id(session_id)
                .with_data("id", id)
                .with_data("content", content);
            print_reply(&gw.request(persist).await?);
            Ok(())
        }
        CardSubcommand::Color { session_id, id, color } => {
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            let envelope = sync.change_color(&id, &color)?;
            broadcast(&mut gw, &session_id, &envelope).await?;
            let persist = Frame::request("card:update", Data::new())
                .with_session_id(session_id)
                .with_data("id", id)
                .with_data("color", color);
            print_reply(&gw.request(persist).await?);
            Ok(())
        }
        CardSubcommand::Vote { session_id, id } => {
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            let envelope = sync.vote(&id)?;
            broadcast(&mut gw, &session_id, &envelope).await?;
            let persist = Frame::request("card:vote", Data::new())
                .with_session_id(session_id)
                .with_data("id", id);
            print_reply(&gw.request(persist).await?);
            Ok(())
        }
        CardSubcommand::React { session_id, id, emoji } => {
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            let envelope = sync.react(&id, &emoji)?;
            broadcast(&mut gw, &session_id, &envelope).await?;
            let persist = Frame::request("card:react", Data::new())
                .with_session_id(session_id)
                .with_data("id", id)
                .with_data("emoji", emoji);
            print_reply(&gw.request(persist).await?);
            Ok(())
        }
        CardSubcommand::Delete { session_id, id } => {
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            let envelope = sync.remove_card(&id)?;
            broadcast(&mut gw, &session_id, &envelope).await?;
            let persist = Frame::request("card:delete", Data::new())
                .with_session_id(session_id)
                .with_data("id", id);
            gw.request(persist).await?;
            println!("deleted");
            Ok(())
        }
        CardSubcommand::Refine { session_id, id, undo } => {
            let (mut gw, mut sync) = joined(ctx, &session_id).await?;
            let req = Frame::request("card:refine", Data::new())
                .with_session_id(session_id.clone())
                .with_data("id", id);
            let reply = gw.request(req).await?;

            let refined: protocol::model::Card = reply
                .data
                .get("card")
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .ok_or(ClientError::MissingField("card"))?;
            let previous: String = reply
                .data
                .get("previous_content")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_owned();

            let envelope = sync.adopt_refined(refined, previous)?;
            broadcast(&mut gw, &session_id, &envelope).await?;

            if undo {
                if let Some(envelope) = sync.undo_refine() {
                    if let protocol::event::CardEvent::Typing { id, content } = &envelope.event {
                        let persist = Frame::request("card:update", Data::new())
                            .with_session_id(session_id.clone())
                            .with_data("id", id.clone())
                            .with_data("content", content.clone());
                        gw.send_and_forget(persist).await?;
                    }
                    broadcast(&mut gw, &session_id, &envelope).await?;
                }
            }
            print_reply(&reply);
            Ok(())
        }
    }
}

// =============================================================================
// WATCH
// =============================================================================

async fn run_watch(ctx: &Context, session_id: &SessionId, cursors: bool) -> Result<(), ClientError> {
    let (mut gw, mut sync) = joined(ctx, session_id).await?;

    print_json(&serde_json::json!({
        "joined": session_id,
        "role": sync.role(),
        "cards": sync.cards().len(),
        "online": sync.roster().online(),
    }));

    loop {
        let frame = gw.recv_forever().await?;
        match frame.syscall.as_str() {
            "sync:event" => {
                let Some(raw) = frame.data.get(FRAME_ENVELOPE).cloned() else {
                    continue;
                };
                match decode_envelope(raw) {
                    Ok(envelope) => {
                        if sync.on_remote(&envelope) == board::sync::Inbound::Applied {
                            print_json(&serde_json::json!({
                                "event": envelope.event.tag(),
                                "origin": envelope.origin,
                                "cards": sync.cards().len(),
                            }));
                        }
                    }
                    Err(e) => eprintln!("dropped inbound event: {e}"),
                }
            }
            "session:join" => {
                let Some(actor) = frame.data.get("actor_id").and_then(|v| v.as_str()) else {
                    continue;
                };
                // Late-join catch-up: answer a newcomer with our card list.
                if let Some(envelope) = sync.on_presence_join(actor) {
                    broadcast(&mut gw, session_id, &envelope).await?;
                }
                print_json(&serde_json::json!({
                    "presence": "join",
                    "actor": actor,
                    "online": sync.roster().online(),
                }));
            }
            "session:part" => {
                let Some(actor) = frame.data.get("actor_id").and_then(|v| v.as_str()) else {
                    continue;
                };
                sync.on_presence_leave(actor);
                print_json(&serde_json::json!({
                    "presence": "leave",
                    "actor": actor,
                    "online": sync.roster().online(),
                }));
            }
            "cursor:move" => {
                if cursors {
                    print_json(&serde_json::to_value(&frame.data).unwrap_or_default());
                }
            }
            _ => {}
        }
    }
}
