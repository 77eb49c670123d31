use std::collections::HashMap;

use crate::codec::{CodecError, Value};

/// CBOR tag number marking a foreign-language object.
pub const OBJECT_TAG: u64 = 0xef;
/// Reserved map key holding the foreign type name.
pub const OBJECT_TYPE_KEY: &str = "py/object";

/// A foreign object: its type name plus an ordered field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub class: String,
    pub fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new(class: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self { class: class.into(), fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// Validates decoded fields and builds the object for a registered type name.
pub type ObjectFactory = fn(&str, Vec<(String, Value)>) -> Result<Object, CodecError>;

/// Registry of foreign types the decoder accepts.
#[derive(Default)]
pub struct ObjectRegistry {
    factories: HashMap<String, ObjectFactory>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a type name may be registered once.
    pub fn register(&mut self, class: &str, factory: ObjectFactory) -> Result<(), CodecError> {
        if self.factories.contains_key(class) {
            return Err(CodecError::DuplicateObjectType(class.to_string()));
        }
        self.factories.insert(class.to_string(), factory);
        Ok(())
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    pub fn construct(&self, class: &str, fields: Vec<(String, Value)>) -> Result<Object, CodecError> {
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| CodecError::UnsupportedObjectType(class.to_string()))?;
        factory(class, fields)
    }
}

/// Factory accepting any field map unchanged.
pub fn passthrough(class: &str, fields: Vec<(String, Value)>) -> Result<Object, CodecError> {
    Ok(Object::new(class, fields))
}
