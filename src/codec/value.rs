use crate::codec::{CodecError, Object};

/// Dynamic value mirroring the CBOR data model, plus foreign objects.
///
/// Maps keep their entries in wire order; re-encoding a decoded value
/// reproduces the same bytes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i128),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Object(Object),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn to_u64(&self) -> Result<u64, CodecError> {
        match self {
            Value::Integer(i) => u64::try_from(*i).map_err(|_| CodecError::IntegerOutOfRange),
            _ => Err(CodecError::UnexpectedType("unsigned integer")),
        }
    }

    /// Integers are accepted where a float is expected.
    pub fn to_f64(&self) -> Result<f64, CodecError> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            _ => Err(CodecError::UnexpectedType("float")),
        }
    }

    pub fn to_bool(&self) -> Result<bool, CodecError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(CodecError::UnexpectedType("bool")),
        }
    }

    pub fn into_text(self) -> Result<String, CodecError> {
        match self {
            Value::Text(s) => Ok(s),
            _ => Err(CodecError::UnexpectedType("text")),
        }
    }

    pub fn into_array(self) -> Result<Vec<Value>, CodecError> {
        match self {
            Value::Array(items) => Ok(items),
            _ => Err(CodecError::UnexpectedType("array")),
        }
    }

    /// Text-keyed entries of a map or the fields of an object.
    /// Entries with non-text keys are left out.
    pub fn field_entries(&self) -> Option<Vec<(&str, &Value)>> {
        match self {
            Value::Map(entries) => Some(
                entries
                    .iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k, v)))
                    .collect(),
            ),
            Value::Object(obj) => Some(obj.fields.iter().map(|(k, v)| (k.as_str(), v)).collect()),
            _ => None,
        }
    }

    /// Look up a text key in a map or object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            Value::Object(obj) => obj.get(key),
            _ => None,
        }
    }

    /// Build a text-keyed map preserving the given order.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k.into()), v))
                .collect(),
        )
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Integer(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Integer(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}
