//! Wire protocol between the simulation server and its observers.
//!
//! Every message is a JSON object `{"type": .., "payload": ..}`. Snapshots
//! are encoded once per broadcast into a [`SnapshotFrame`] shared by all
//! observers; slow observers receive the same JSON gzip-compressed in a
//! binary frame.

mod error;
mod frame;
mod protocol;

pub use error::NetError;
pub use frame::{decode_binary, decode_text, gunzip, gzip, SnapshotFrame};
pub use protocol::{ControlCommand, NetMessage, StatsPayload};
