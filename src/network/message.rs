//! Message variants and their payload slot schemas.
//!
//! Every variant declares an ordered table of `(slot name, getter, setter)`
//! entries. Slot order is part of the signed hash and must not change.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::codec::{CodecError, Value};
use crate::network::peer::Peer;

pub const MSG_HELLO_TYPE: u16 = 0;
pub const MSG_RAND_VAL_TYPE: u16 = 1;
pub const MSG_DISCONNECT_TYPE: u16 = 2;
pub const MSG_PEERS_TYPE: u16 = 1004;

/// Signature length on the wire.
pub const SIG_LEN: usize = 65;
/// Width of the version text inside the Hello trailing field (after its length byte).
pub const VERSION_FIELD_LEN: usize = 31;

/// State shared by all variants.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    pub timestamp: u64,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub envelope: Envelope,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(kind: impl Into<MessageKind>) -> Self {
        Self { envelope: Envelope::default(), kind: kind.into() }
    }

    pub fn msg_type(&self) -> u16 {
        type_id(&self.kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    Hello(Hello),
    RandVal(RandVal),
    Disconnect(Disconnect),
    Peers(Peers),
}

impl From<Hello> for MessageKind {
    fn from(m: Hello) -> Self {
        MessageKind::Hello(m)
    }
}

impl From<RandVal> for MessageKind {
    fn from(m: RandVal) -> Self {
        MessageKind::RandVal(m)
    }
}

impl From<Disconnect> for MessageKind {
    fn from(m: Disconnect) -> Self {
        MessageKind::Disconnect(m)
    }
}

impl From<Peers> for MessageKind {
    fn from(m: Peers) -> Self {
        MessageKind::Peers(m)
    }
}

/// Opening message of the handshake.
///
/// `golem_messages_version` travels both as the `_version` slot and in the
/// 32-byte trailing field appended after the payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hello {
    pub rand_val: f64,
    pub proto_id: String,
    pub node_name: String,
    /// Node record, as a tagged object or a plain map.
    pub node_info: Value,
    pub port: u64,
    pub client_ver: String,
    pub client_key_id: String,
    pub solve_challenge: bool,
    pub challenge: Value,
    pub difficulty: u64,
    pub metadata: Value,
    pub golem_messages_version: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RandVal {
    pub rand_val: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Disconnect {
    pub reason: DisconnectReason,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Peers {
    /// Peer field maps.
    pub peers: Vec<Value>,
}

impl Peers {
    pub fn from_peers(peers: &[Peer]) -> Self {
        Self { peers: peers.iter().map(Peer::to_value).collect() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    ProtocolVersion,
    Unverified,
    Bootstrap,
    KeyNotDifficult,
    /// Any reason string this node does not know.
    Other(String),
}

impl DisconnectReason {
    pub fn as_str(&self) -> &str {
        match self {
            DisconnectReason::ProtocolVersion => "protocol_version",
            DisconnectReason::Unverified => "unverified",
            DisconnectReason::Bootstrap => "bootstrap",
            DisconnectReason::KeyNotDifficult => "key_not_difficult",
            DisconnectReason::Other(s) => s,
        }
    }
}

impl Default for DisconnectReason {
    fn default() -> Self {
        DisconnectReason::Other(String::new())
    }
}

impl From<String> for DisconnectReason {
    fn from(s: String) -> Self {
        match s.as_str() {
            "protocol_version" => DisconnectReason::ProtocolVersion,
            "unverified" => DisconnectReason::Unverified,
            "bootstrap" => DisconnectReason::Bootstrap,
            "key_not_difficult" => DisconnectReason::KeyNotDifficult,
            _ => DisconnectReason::Other(s),
        }
    }
}

impl From<&str> for DisconnectReason {
    fn from(s: &str) -> Self {
        DisconnectReason::from(s.to_string())
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named payload field of a variant.
pub struct Slot<T> {
    pub name: &'static str,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T, Value) -> Result<(), CodecError>,
}

/// Ordered slot table of a variant.
pub trait SlotSchema: Sized + 'static {
    const SLOTS: &'static [Slot<Self>];
}

impl SlotSchema for Hello {
    const SLOTS: &'static [Slot<Self>] = &[
        Slot {
            name: "rand_val",
            get: |m| Value::from(m.rand_val),
            set: |m, v| {
                m.rand_val = v.to_f64()?;
                Ok(())
            },
        },
        Slot {
            name: "proto_id",
            get: |m| Value::from(m.proto_id.as_str()),
            set: |m, v| {
                m.proto_id = v.into_text()?;
                Ok(())
            },
        },
        Slot {
            name: "node_name",
            get: |m| Value::from(m.node_name.as_str()),
            set: |m, v| {
                m.node_name = v.into_text()?;
                Ok(())
            },
        },
        Slot {
            name: "node_info",
            get: |m| m.node_info.clone(),
            set: |m, v| {
                m.node_info = v;
                Ok(())
            },
        },
        Slot {
            name: "port",
            get: |m| Value::from(m.port),
            set: |m, v| {
                m.port = v.to_u64()?;
                Ok(())
            },
        },
        Slot {
            name: "client_ver",
            get: |m| Value::from(m.client_ver.as_str()),
            set: |m, v| {
                m.client_ver = v.into_text()?;
                Ok(())
            },
        },
        Slot {
            name: "client_key_id",
            get: |m| Value::from(m.client_key_id.as_str()),
            set: |m, v| {
                m.client_key_id = v.into_text()?;
                Ok(())
            },
        },
        Slot {
            name: "solve_challenge",
            get: |m| Value::from(m.solve_challenge),
            set: |m, v| {
                m.solve_challenge = v.to_bool()?;
                Ok(())
            },
        },
        Slot {
            name: "challenge",
            get: |m| m.challenge.clone(),
            set: |m, v| {
                m.challenge = v;
                Ok(())
            },
        },
        Slot {
            name: "difficulty",
            get: |m| Value::from(m.difficulty),
            set: |m, v| {
                m.difficulty = v.to_u64()?;
                Ok(())
            },
        },
        Slot {
            name: "metadata",
            get: |m| m.metadata.clone(),
            set: |m, v| {
                m.metadata = v;
                Ok(())
            },
        },
        Slot {
            name: "_version",
            get: |m| Value::from(m.golem_messages_version.as_str()),
            set: |m, v| {
                m.golem_messages_version = v.into_text()?;
                Ok(())
            },
        },
    ];
}

impl SlotSchema for RandVal {
    const SLOTS: &'static [Slot<Self>] = &[Slot {
        name: "rand_val",
        get: |m| Value::from(m.rand_val),
        set: |m, v| {
            m.rand_val = v.to_f64()?;
            Ok(())
        },
    }];
}

impl SlotSchema for Disconnect {
    const SLOTS: &'static [Slot<Self>] = &[Slot {
        name: "reason",
        get: |m| Value::from(m.reason.as_str()),
        set: |m, v| {
            m.reason = DisconnectReason::from(v.into_text()?);
            Ok(())
        },
    }];
}

impl SlotSchema for Peers {
    const SLOTS: &'static [Slot<Self>] = &[Slot {
        name: "peers",
        get: |m| Value::Array(m.peers.clone()),
        set: |m, v| {
            m.peers = v.into_array()?;
            Ok(())
        },
    }];
}

pub fn type_id(kind: &MessageKind) -> u16 {
    match kind {
        MessageKind::Hello(_) => MSG_HELLO_TYPE,
        MessageKind::RandVal(_) => MSG_RAND_VAL_TYPE,
        MessageKind::Disconnect(_) => MSG_DISCONNECT_TYPE,
        MessageKind::Peers(_) => MSG_PEERS_TYPE,
    }
}

/// RandVal and Peers travel encrypted; Hello and Disconnect in the clear.
pub fn should_encrypt(kind: &MessageKind) -> bool {
    matches!(kind, MessageKind::RandVal(_) | MessageKind::Peers(_))
}

/// Trailing bytes appended after the payload. Only Hello has any:
/// a length byte, the version text, zero padding up to 32 bytes.
pub fn extra_data(kind: &MessageKind) -> Result<Vec<u8>, CodecError> {
    let MessageKind::Hello(hello) = kind else {
        return Ok(Vec::new());
    };
    let version = hello.golem_messages_version.as_bytes();
    if version.len() > VERSION_FIELD_LEN {
        return Err(CodecError::Encode(format!(
            "messages version {:?} longer than {} bytes",
            hello.golem_messages_version, VERSION_FIELD_LEN
        )));
    }
    let mut out = Vec::with_capacity(VERSION_FIELD_LEN + 1);
    out.push(version.len() as u8);
    out.extend_from_slice(version);
    out.resize(VERSION_FIELD_LEN + 1, 0);
    Ok(out)
}

/// Read the Hello trailing version field. The `_version` slot takes precedence.
pub fn apply_extra_data(kind: &mut MessageKind, extra: &[u8]) {
    let MessageKind::Hello(hello) = kind else {
        return;
    };
    if !hello.golem_messages_version.is_empty() {
        return;
    }
    let Some((&len, rest)) = extra.split_first() else {
        return;
    };
    let len = (len as usize).min(VERSION_FIELD_LEN).min(rest.len());
    match std::str::from_utf8(&rest[..len]) {
        Ok(version) => hello.golem_messages_version = version.to_string(),
        Err(e) => warn!("ignoring non-utf8 messages version field: {}", e),
    }
}

fn slots_of<T: SlotSchema>(msg: &T) -> Vec<Value> {
    T::SLOTS
        .iter()
        .map(|slot| Value::Array(vec![Value::from(slot.name), (slot.get)(msg)]))
        .collect()
}

fn assign<T: SlotSchema>(msg: &mut T, slots: &mut HashMap<String, Value>) {
    for slot in T::SLOTS {
        let Some(value) = slots.remove(slot.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Err(e) = (slot.set)(msg, value) {
            warn!(slot = slot.name, "skipping slot: {}", e);
        }
    }
}

/// `[name, value]` pairs in declaration order.
pub fn payload_slots(kind: &MessageKind) -> Vec<Value> {
    match kind {
        MessageKind::Hello(m) => slots_of(m),
        MessageKind::RandVal(m) => slots_of(m),
        MessageKind::Disconnect(m) => slots_of(m),
        MessageKind::Peers(m) => slots_of(m),
    }
}

/// Assign decoded slots to the variant's fields.
///
/// Unknown and null slots are ignored; a slot of the wrong type is skipped with a warning.
/// When a name repeats, the last occurrence wins.
pub fn assign_payload(kind: &mut MessageKind, slots: Vec<(String, Value)>) {
    let mut slots: HashMap<String, Value> = slots.into_iter().collect();
    match kind {
        MessageKind::Hello(m) => assign(m, &mut slots),
        MessageKind::RandVal(m) => assign(m, &mut slots),
        MessageKind::Disconnect(m) => assign(m, &mut slots),
        MessageKind::Peers(m) => assign(m, &mut slots),
    }
}
