//! Gateway connection: websocket framing, request/response, and join state.
//!
//! The CLI talks to the server over one websocket. Frames go out protobuf-
//! encoded by default (JSON with `--json`); inbound text and binary are both
//! accepted. Request/response correlation uses `parent_id`; frames that
//! arrive while waiting for a reply (relay traffic from peers) are buffered
//! so `recv` hands them out afterwards in order.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

use protocol::codec;
use protocol::frame::{Data, Frame, Status};
use protocol::model::{ActorId, Card, Participant, Role, Session, SessionId, User};

const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] codec::CodecError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: [{code}] {message}")]
    ServerError {
        syscall: String,
        code: String,
        message: String,
    },
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("local mutation rejected: {0}")]
    Sync(#[from] board::SyncError),
}

/// Everything the join reply carries, ready to seed a `SyncSession`.
pub struct JoinState {
    pub session: Session,
    pub role: Role,
    pub cards: Vec<Card>,
    pub participants: Vec<Participant>,
    pub online: Vec<ActorId>,
    pub user: User,
}

/// One live gateway connection.
pub struct Gateway {
    stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    binary: bool,
    buffered: VecDeque<Frame>,
}

/// Derive the websocket URL from an HTTP base URL.
pub fn ws_url(base_url: &str, actor_id: &str, binary: bool) -> Result<String, ClientError> {
    let trimmed = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(ClientError::InvalidBaseUrl(base_url.to_owned()));
    };
    let encoding = if binary { "binary" } else { "json" };
    Ok(format!("{ws_base}/api/ws?actor_id={actor_id}&encoding={encoding}"))
}

impl Gateway {
    /// Connect and wait for the server's `gateway:connected` hello.
    ///
    /// # Errors
    ///
    /// Returns connection, decode, or timeout errors.
    pub async fn connect(base_url: &str, actor_id: &str, binary: bool) -> Result<Self, ClientError> {
        let url = ws_url(base_url, actor_id, binary)?;
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::WsConnect(Box::new(e)))?;

        let mut gateway = Self { stream, binary, buffered: VecDeque::new() };
        let hello = gateway.recv().await?;
        if hello.syscall != "gateway:connected" {
            return Err(ClientError::MissingField("gateway:connected"));
        }
        Ok(gateway)
    }

    /// Send one frame in the connection's encoding.
    ///
    /// # Errors
    ///
    /// Returns `WsClosed` if the socket is gone.
    pub async fn send(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let message = if self.binary {
            Message::Binary(codec::encode_frame(frame).into())
        } else {
            Message::Text(serde_json::to_string(frame)?.into())
        };
        self.stream
            .send(message)
            .await
            .map_err(|_| ClientError::WsClosed)
    }

    /// Receive the next frame, buffered relay traffic first.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` after the reply window, `WsClosed` on EOF.
    pub async fn recv(&mut self) -> Result<Frame, ClientError> {
        if let Some(frame) = self.buffered.pop_front() {
            return Ok(frame);
        }
        self.recv_raw(REPLY_TIMEOUT).await
    }

    /// Receive with a caller-chosen timeout, without touching the buffer.
    async fn recv_raw(&mut self, timeout: Duration) -> Result<Frame, ClientError> {
        loop {
            let message = tokio::time::timeout(timeout, self.stream.next())
                .await
                .map_err(|_| ClientError::Timeout)?
                .ok_or(ClientError::WsClosed)?
                .map_err(|_| ClientError::WsClosed)?;

            match message {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Binary(bytes) => return Ok(codec::decode_frame(&bytes)?),
                Message::Close(_) => return Err(ClientError::WsClosed),
                _ => {}
            }
        }
    }

    /// Receive the next frame, waiting forever (watch mode).
    ///
    /// # Errors
    ///
    /// Returns `WsClosed` on EOF.
    pub async fn recv_forever(&mut self) -> Result<Frame, ClientError> {
        if let Some(frame) = self.buffered.pop_front() {
            return Ok(frame);
        }
        self.recv_raw(Duration::from_secs(u64::MAX / 4)).await
    }

    /// Send a request and wait for its terminal response, buffering any
    /// unrelated frames that arrive in between.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` for error replies, transport errors otherwise.
    pub async fn request(&mut self, frame: Frame) -> Result<Frame, ClientError> {
        let request_id = frame.id;
        let syscall = frame.syscall.clone();
        self.send(&frame).await?;

        loop {
            let reply = self.recv_raw(REPLY_TIMEOUT).await?;
            if reply.parent_id != Some(request_id) {
                self.buffered.push_back(reply);
                continue;
            }
            if !reply.status.is_terminal() {
                continue;
            }
            if reply.status == Status::Error {
                return Err(server_error(&syscall, &reply));
            }
            return Ok(reply);
        }
    }

    /// Send a request without waiting for the reply (fire-and-forget
    /// persistence). A later error reply surfaces through `recv` and is
    /// logged by the caller; the optimistic local state is never rolled back.
    ///
    /// # Errors
    ///
    /// Returns `WsClosed` if the send itself fails.
    pub async fn send_and_forget(&mut self, frame: Frame) -> Result<Uuid, ClientError> {
        let id = frame.id;
        self.send(&frame).await?;
        Ok(id)
    }

    /// Join a session and parse the reply into `SyncSession` inputs.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` or parse errors.
    pub async fn join(&mut self, session_id: &SessionId) -> Result<JoinState, ClientError> {
        let req = Frame::request("session:join", Data::new()).with_session_id(session_id.clone());
        let reply = self.request(req).await?;
        parse_join_reply(&reply)
    }
}

fn server_error(syscall: &str, reply: &Frame) -> ClientError {
    let code = reply
        .data
        .get("code")
        .and_then(|v| v.as_str())
        .unwrap_or("-")
        .to_owned();
    let message = reply
        .data
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error")
        .to_owned();
    ClientError::ServerError { syscall: syscall.to_owned(), code, message }
}

/// Parse a `session:join` done frame.
///
/// # Errors
///
/// Returns `MissingField` or JSON errors for malformed replies.
pub fn parse_join_reply(reply: &Frame) -> Result<JoinState, ClientError> {
    fn field<T: serde::de::DeserializeOwned>(
        reply: &Frame,
        key: &'static str,
    ) -> Result<T, ClientError> {
        let value = reply
            .data
            .get(key)
            .cloned()
            .ok_or(ClientError::MissingField(key))?;
        Ok(serde_json::from_value(value)?)
    }

    Ok(JoinState {
        session: field(reply, "session")?,
        role: field(reply, "role")?,
        cards: field(reply, "cards")?,
        participants: field(reply, "participants")?,
        online: field(reply, "online")?,
        user: field(reply, "user")?,
    })
}
