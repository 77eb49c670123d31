//! Bootstrap node for a peer-to-peer overlay.
//!
//! Accepts inbound peers, authenticates them with a signed Hello/RandVal
//! handshake gated on key difficulty, hands back a sample of known peers and
//! records the newcomer.

pub mod codec;
pub mod crypto;
pub mod network;
pub mod node;
pub mod utils;

pub use node::{Config, PeerSession, Service, ServiceContext};
pub use utils::{BootstrapError, Result};
