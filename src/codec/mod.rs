//! Object codec: CBOR documents over the dynamic [`Value`] model.
//!
//! - scalars and containers map one-to-one onto CBOR major types
//! - tag 0xef wraps a foreign object: a text-keyed map with `py/object` + fields
//! - tag 28 marks a shareable value and is unwrapped on decode
//! - floats are always written as 64-bit
//!
//! Encoding drives a `ciborium_ll` encoder directly; decoding goes through
//! `ciborium::Value` and resolves tags while converting to [`Value`].

pub mod object;
pub mod value;

pub use object::{passthrough, Object, ObjectFactory, ObjectRegistry, OBJECT_TAG, OBJECT_TYPE_KEY};
pub use value::Value;

use ciborium::value::Value as Cbor;
use ciborium_io::Write;
use ciborium_ll::{Encoder, Header};
use thiserror::Error;

/// Value that may be referenced elsewhere in the same document.
pub const SHAREABLE_TAG: u64 = 28;

const FLOAT64_HEAD: u8 = 0xfb;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("cbor encode error: {0}")]
    Encode(String),

    #[error("cbor decode error: {0}")]
    Decode(String),

    #[error("integer out of range")]
    IntegerOutOfRange,

    #[error("expected {0}")]
    UnexpectedType(&'static str),

    #[error("unsupported object type {0}")]
    UnsupportedObjectType(String),

    #[error("duplicated object type {0}")]
    DuplicateObjectType(String),

    #[error("malformed object: {0}")]
    MalformedObject(String),

    #[error("unsupported cbor tag {0}")]
    UnsupportedTag(u64),
}

/// Encode a value as a single CBOR item.
pub fn serialize(value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    encode(&mut Encoder::from(&mut out), value)?;
    Ok(out)
}

/// Decode one CBOR item; trailing bytes are ignored.
pub fn deserialize(input: &[u8], registry: &ObjectRegistry) -> Result<Value, CodecError> {
    deserialize_prefix(input, registry).map(|(value, _)| value)
}

/// Decode the first CBOR item of `input` and return it with the unread remainder.
pub fn deserialize_prefix<'a>(
    input: &'a [u8],
    registry: &ObjectRegistry,
) -> Result<(Value, &'a [u8]), CodecError> {
    let mut rest = input;
    let cbor: Cbor =
        ciborium::de::from_reader(&mut rest).map_err(|e| CodecError::Decode(e.to_string()))?;
    let value = Resolver { registry }.resolve(cbor)?;
    Ok((value, rest))
}

fn encode<W: Write>(enc: &mut Encoder<W>, value: &Value) -> Result<(), CodecError>
where
    W::Error: core::fmt::Debug,
{
    let io = |e: W::Error| CodecError::Encode(format!("{:?}", e));
    match value {
        Value::Null => enc.push(Header::Simple(ciborium_ll::simple::NULL)).map_err(io)?,
        Value::Bool(b) => {
            let simple = if *b { ciborium_ll::simple::TRUE } else { ciborium_ll::simple::FALSE };
            enc.push(Header::Simple(simple)).map_err(io)?
        }
        Value::Integer(i) => {
            let header = if *i >= 0 {
                Header::Positive(u64::try_from(*i).map_err(|_| CodecError::IntegerOutOfRange)?)
            } else {
                Header::Negative(u64::try_from(-1 - *i).map_err(|_| CodecError::IntegerOutOfRange)?)
            };
            enc.push(header).map_err(io)?
        }
        // Header::Float would shrink exact values to f16/f32
        Value::Float(f) => {
            enc.write_all(&[FLOAT64_HEAD]).map_err(io)?;
            enc.write_all(&f.to_be_bytes()).map_err(io)?
        }
        Value::Text(s) => enc.text(s, None::<usize>).map_err(io)?,
        Value::Bytes(b) => enc.bytes(b, None::<usize>).map_err(io)?,
        Value::Array(items) => {
            enc.push(Header::Array(Some(items.len()))).map_err(io)?;
            for item in items {
                encode(enc, item)?;
            }
        }
        Value::Map(entries) => {
            enc.push(Header::Map(Some(entries.len()))).map_err(io)?;
            for (k, v) in entries {
                encode(enc, k)?;
                encode(enc, v)?;
            }
        }
        Value::Object(obj) => {
            enc.push(Header::Tag(OBJECT_TAG)).map_err(io)?;
            enc.push(Header::Map(Some(obj.fields.len() + 1))).map_err(io)?;
            enc.text(OBJECT_TYPE_KEY, None::<usize>).map_err(io)?;
            enc.text(&obj.class, None::<usize>).map_err(io)?;
            for (name, v) in &obj.fields {
                enc.text(name, None::<usize>).map_err(io)?;
                encode(enc, v)?;
            }
        }
    }
    Ok(())
}

struct Resolver<'r> {
    registry: &'r ObjectRegistry,
}

impl Resolver<'_> {
    fn resolve(&mut self, cbor: Cbor) -> Result<Value, CodecError> {
        Ok(match cbor {
            Cbor::Null => Value::Null,
            Cbor::Bool(b) => Value::Bool(b),
            Cbor::Integer(i) => Value::Integer(i128::from(i)),
            Cbor::Float(f) => Value::Float(f),
            Cbor::Text(s) => Value::Text(s),
            Cbor::Bytes(b) => Value::Bytes(b),
            Cbor::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|v| self.resolve(v))
                    .collect::<Result<_, _>>()?,
            ),
            Cbor::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((self.resolve(k)?, self.resolve(v)?)))
                    .collect::<Result<_, CodecError>>()?,
            ),
            Cbor::Tag(OBJECT_TAG, inner) => Value::Object(self.object(*inner)?),
            Cbor::Tag(SHAREABLE_TAG, inner) => self.resolve(*inner)?,
            Cbor::Tag(tag, _) => return Err(CodecError::UnsupportedTag(tag)),
            other => return Err(CodecError::Decode(format!("unsupported cbor item {:?}", other))),
        })
    }

    fn object(&mut self, inner: Cbor) -> Result<Object, CodecError> {
        let entries = match inner {
            Cbor::Map(entries) => entries,
            _ => return Err(CodecError::MalformedObject("expected field map".into())),
        };
        let mut class = None;
        let mut fields = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            let name = match k {
                Cbor::Text(name) => name,
                other => {
                    return Err(CodecError::MalformedObject(format!(
                        "non-text field name {:?}",
                        other
                    )))
                }
            };
            if name == OBJECT_TYPE_KEY {
                match v {
                    Cbor::Text(c) => class = Some(c),
                    _ => return Err(CodecError::MalformedObject("type name is not text".into())),
                }
            } else {
                fields.push((name, self.resolve(v)?));
            }
        }
        let class = class.ok_or_else(|| CodecError::MalformedObject(format!("missing {}", OBJECT_TYPE_KEY)))?;
        self.registry.construct(&class, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ObjectRegistry {
        let mut reg = ObjectRegistry::new();
        reg.register("test.Thing", passthrough).unwrap();
        reg
    }

    #[test]
    fn test_nested_document() {
        let doc = Value::Array(vec![
            Value::Array(vec![Value::from("rand_val"), Value::from(0.25)]),
            Value::Array(vec![
                Value::from("metadata"),
                Value::map([("a", Value::from(1u64)), ("b", Value::Null)]),
            ]),
            Value::Bytes(vec![1, 2, 3]),
            Value::Integer(-5),
        ]);
        let bytes = serialize(&doc).unwrap();
        assert_eq!(deserialize(&bytes, &registry()).unwrap(), doc);
    }

    #[test]
    fn test_object_tag_bytes() {
        let obj = Object::new("test.Thing", vec![("x".into(), Value::from(1u64))]);
        let bytes = serialize(&Value::Object(obj.clone())).unwrap();
        // one-byte tag header for 0xef
        assert_eq!(&bytes[..2], &[0xd8, 0xef]);
        assert_eq!(deserialize(&bytes, &registry()).unwrap(), Value::Object(obj));
    }

    #[test]
    fn test_unknown_object_type() {
        let obj = Object::new("other.Thing", vec![]);
        let bytes = serialize(&Value::Object(obj)).unwrap();
        let err = deserialize(&bytes, &registry()).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedObjectType(c) if c == "other.Thing"));
    }

    #[test]
    fn test_object_missing_type_name() {
        let cbor = Cbor::Tag(OBJECT_TAG, Box::new(Cbor::Map(vec![(Cbor::Text("x".into()), Cbor::Null)])));
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&cbor, &mut bytes).unwrap();
        assert!(matches!(
            deserialize(&bytes, &registry()).unwrap_err(),
            CodecError::MalformedObject(_)
        ));
    }

    fn encode_raw(cbor: &Cbor) -> Vec<u8> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(cbor, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_shareable_tag_unwraps() {
        let shared = Cbor::Tag(SHAREABLE_TAG, Box::new(Cbor::Text("node".into())));
        let bytes = encode_raw(&Cbor::Array(vec![shared, Cbor::Null]));
        let value = deserialize(&bytes, &registry()).unwrap();
        assert_eq!(value, Value::Array(vec![Value::from("node"), Value::Null]));
    }

    #[test]
    fn test_shared_reference_rejected() {
        // nested references would otherwise expand a small frame without bound
        let mut level = Cbor::Tag(SHAREABLE_TAG, Box::new(Cbor::Text("x".into())));
        for i in 1..=5u64 {
            let refs = vec![Cbor::Tag(29, Box::new(Cbor::Integer((i - 1).into()))); 16];
            level = Cbor::Tag(SHAREABLE_TAG, Box::new(Cbor::Array(vec![level, Cbor::Array(refs)])));
        }
        let bytes = encode_raw(&level);
        assert!(matches!(
            deserialize(&bytes, &registry()).unwrap_err(),
            CodecError::UnsupportedTag(29)
        ));
    }

    #[test]
    fn test_floats_encode_as_f64() {
        let bytes = serialize(&Value::from(0.5)).unwrap();
        assert_eq!(bytes, [&[0xfb][..], &0.5f64.to_be_bytes()[..]].concat());

        let doc = Value::Array(vec![Value::from(1.0), Value::from(0.1337)]);
        let bytes = serialize(&doc).unwrap();
        assert_eq!(bytes.len(), 1 + 2 * 9);
        assert_eq!(deserialize(&bytes, &registry()).unwrap(), doc);
    }

    #[test]
    fn test_integer_heads_match_ciborium() {
        for i in [0i128, 23, 24, 255, 65_536, -1, -25, -1_000_000, u64::MAX as i128] {
            let ours = serialize(&Value::Integer(i)).unwrap();
            let theirs = encode_raw(&Cbor::Integer(ciborium::value::Integer::try_from(i).unwrap()));
            assert_eq!(ours, theirs, "integer {}", i);
        }
        assert!(matches!(
            serialize(&Value::Integer(u64::MAX as i128 + 1)).unwrap_err(),
            CodecError::IntegerOutOfRange
        ));
    }

    #[test]
    fn test_prefix_leaves_trailing_bytes() {
        let mut bytes = serialize(&Value::from("abc")).unwrap();
        bytes.extend_from_slice(&[9, 9, 9]);
        let (value, rest) = deserialize_prefix(&bytes, &registry()).unwrap();
        assert_eq!(value, Value::from("abc"));
        assert_eq!(rest, &[9, 9, 9]);
    }
}
