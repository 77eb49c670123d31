use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::CryptoError;
use crate::network::message::DisconnectReason;

/// Unified error type for the bootstrap node
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("truncated frame: got {got} bytes, need at least {need}")]
    TruncatedFrame { got: usize, need: usize },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("unsupported msg type {0}")]
    UnsupportedMessageType(u16),

    #[error("duplicated message type {0}")]
    DuplicateMessageType(u16),

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("peer disconnected, reason: {0}")]
    PeerDisconnected(String),

    #[error("not matching protocol ID, remote {remote}, local {local}")]
    ProtocolMismatch { remote: String, local: String },

    #[error("key not difficult enough, got {got}, required {required}")]
    KeyNotDifficult { got: u32, required: u32 },

    #[error("malformed node info: {0}")]
    MalformedNode(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("config error: {0}")]
    Config(String),
}

impl BootstrapError {
    /// Disconnect reason to notify the peer with before closing, if one applies.
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        match self {
            BootstrapError::VerificationFailed
            | BootstrapError::MalformedNode(_)
            | BootstrapError::Crypto(CryptoError::InvalidMac) => Some(DisconnectReason::Unverified),
            BootstrapError::ProtocolMismatch { .. } => Some(DisconnectReason::ProtocolVersion),
            BootstrapError::KeyNotDifficult { .. } => Some(DisconnectReason::KeyNotDifficult),
            _ => None,
        }
    }
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, BootstrapError>;
