//! Message frames: `header(11) || signature(65) || payload || extra`.
//!
//! The payload is the CBOR list of `[slot, value]` pairs, ECIES-encrypted for
//! variants that require it. The signature covers the short hash of the
//! header pair `[type, timestamp]` and the plaintext payload.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::codec::{self, CodecError, Value};
use crate::crypto::{signing_digest, MessageCrypto};
use crate::network::header::{Header, HEADER_LEN};
use crate::network::message::{
    apply_extra_data, assign_payload, extra_data, payload_slots, should_encrypt, type_id, Envelope,
    Message, MessageKind, SIG_LEN,
};
use crate::network::registry::MessageRegistry;
use crate::utils::{BootstrapError, Result};

/// Digest signed for a message of `header` type/timestamp over `kind`'s payload.
pub fn message_digest(header: &Header, kind: &MessageKind) -> Result<[u8; 32]> {
    let header_bytes = codec::serialize(&Value::Array(vec![
        Value::from(header.msg_type),
        Value::from(header.timestamp),
    ]))?;
    let payload = codec::serialize(&Value::Array(payload_slots(kind)))?;
    Ok(signing_digest(&header_bytes, &payload))
}

/// Serialize and sign `msg`, stamping its envelope with the current time and signature.
pub fn serialize(msg: &mut Message, crypto: &dyn MessageCrypto) -> Result<Vec<u8>> {
    let header = Header {
        msg_type: type_id(&msg.kind),
        timestamp: unix_now(),
        encrypted: should_encrypt(&msg.kind),
    };
    msg.envelope.timestamp = header.timestamp;

    let digest = message_digest(&header, &msg.kind)?;
    let signature = crypto.sign(&digest)?;
    if signature.len() != SIG_LEN {
        return Err(BootstrapError::Protocol(format!(
            "signature of {} bytes, expected {}",
            signature.len(),
            SIG_LEN
        )));
    }

    let mut payload = codec::serialize(&Value::Array(payload_slots(&msg.kind)))?;
    if header.encrypted {
        payload = crypto.encrypt(&payload)?;
    }
    let extra = extra_data(&msg.kind)?;

    let mut out = Vec::with_capacity(HEADER_LEN + SIG_LEN + payload.len() + extra.len());
    out.extend_from_slice(&header.serialize());
    out.extend_from_slice(&signature);
    out.extend_from_slice(&payload);
    out.extend_from_slice(&extra);
    msg.envelope.signature = signature;
    Ok(out)
}

/// Decode a frame, decrypting and verifying it through `crypto`.
pub fn deserialize(
    raw: &[u8],
    registry: &MessageRegistry,
    crypto: &dyn MessageCrypto,
) -> Result<Message> {
    let payload_idx = HEADER_LEN + SIG_LEN;
    if raw.len() < payload_idx {
        return Err(BootstrapError::TruncatedFrame { got: raw.len(), need: payload_idx });
    }
    let mut header_bytes = [0u8; HEADER_LEN];
    header_bytes.copy_from_slice(&raw[..HEADER_LEN]);
    let header = Header::deserialize(&header_bytes);
    let signature = raw[HEADER_LEN..payload_idx].to_vec();

    let mut kind = registry.create(header.msg_type)?;

    let decrypted;
    let body = if header.encrypted {
        decrypted = crypto.decrypt(&raw[payload_idx..])?;
        &decrypted[..]
    } else {
        &raw[payload_idx..]
    };

    let (value, extra) = codec::deserialize_prefix(body, registry.objects())?;
    assign_payload(&mut kind, decode_slots(value)?);
    if !extra.is_empty() {
        apply_extra_data(&mut kind, extra);
    }

    let digest = message_digest(&header, &kind)?;
    match crypto.verify(&digest, &signature) {
        Ok(true) => {}
        Ok(false) => return Err(BootstrapError::VerificationFailed),
        Err(e) => {
            debug!("signature check error: {}", e);
            return Err(BootstrapError::VerificationFailed);
        }
    }

    Ok(Message {
        envelope: Envelope { timestamp: header.timestamp, signature },
        kind,
    })
}

/// Split a payload into `(name, value)` slots.
///
/// The payload itself must be a list; malformed entries inside it are skipped.
pub fn decode_slots(payload: Value) -> Result<Vec<(String, Value)>> {
    let items = match payload {
        Value::Array(items) => items,
        _ => return Err(CodecError::UnexpectedType("list of payload slots").into()),
    };
    let mut slots = Vec::with_capacity(items.len());
    for item in items {
        let mut pair = match item {
            Value::Array(pair) => pair,
            other => {
                warn!("couldn't cast slot {:?}", other);
                continue;
            }
        };
        if pair.len() != 2 {
            warn!("slot should be of length 2, got {:?}", pair);
            continue;
        }
        let value = pair.pop().unwrap_or_default();
        match pair.pop() {
            Some(Value::Text(name)) => slots.push((name, value)),
            other => warn!("expected slot name to be a string, got {:?}", other),
        }
    }
    Ok(slots)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
