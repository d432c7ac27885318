//! Client-side realtime core for ideaboard.
//!
//! Everything in this crate is pure, single-threaded state: the card store
//! and its reducer, the sync session that reconciles local optimistic
//! mutations with the peer broadcast stream, the permission engine, the
//! broadcast throttle, and the presence roster. Network I/O lives in the
//! binaries that drive these types; nothing here blocks or suspends.

pub mod colors;
pub mod ids;
pub mod names;
pub mod permissions;
pub mod presence;
pub mod store;
pub mod sync;
pub mod throttle;

pub use presence::{Participants, Roster};
pub use store::CardStore;
pub use sync::{SyncError, SyncSession};
pub use throttle::Throttle;
