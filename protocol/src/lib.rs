//! Wire protocol and shared data model for ideaboard.
//!
//! This crate owns everything that crosses the network between the gateway
//! server and clients: the card/session/user data model, the broadcast
//! `CardEvent` union with its origin-tagged envelope, the request/response
//! `Frame` used for gateway syscalls, and a protobuf codec for compact
//! binary transport.

pub mod codec;
pub mod event;
pub mod frame;
pub mod model;

pub use event::{CardEvent, Envelope, EventError, channel_name};
pub use frame::{Data, ErrorCode, Frame, Status};
pub use model::{
    ActorId, Card, CardId, DeletePermission, MovePermission, Participant, Role, Session,
    SessionId, User,
};
