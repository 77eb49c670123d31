//! Network module - wire protocol and peer bookkeeping.
//!
//! - `header` / `message` / `wire`: frame layout, variants, signed encoding
//! - `codec` / `connection`: length-prefixed framing over any async stream
//! - `peer` / `peerstore`: node records and the bounded peer set

pub mod codec;
pub mod connection;
pub mod header;
pub mod message;
pub mod peer;
pub mod peerstore;
pub mod registry;
pub mod tcp;
pub mod wire;

pub use connection::Connection;
pub use header::Header;
pub use message::{Disconnect, DisconnectReason, Hello, Message, MessageKind, Peers, RandVal};
pub use peer::{Node, Peer};
pub use peerstore::{PeerKeeper, RandomizedPeerKeeper};
pub use registry::MessageRegistry;
