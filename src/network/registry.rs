use std::collections::HashMap;

use crate::codec::{passthrough, ObjectFactory, ObjectRegistry};
use crate::network::message::{type_id, Disconnect, Hello, MessageKind, Peers, RandVal};
use crate::network::peer::NODE_CLASS;
use crate::utils::{BootstrapError, Result};

/// Builds an empty variant for a type id.
pub type MessageFactory = fn() -> MessageKind;

/// Message type ids and the foreign object types their payloads may carry.
///
/// Built once at startup and shared read-only by every session.
#[derive(Default)]
pub struct MessageRegistry {
    factories: HashMap<u16, MessageFactory>,
    objects: ObjectRegistry,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four bootstrap messages plus the node object type.
    pub fn standard() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(|| Hello::default().into())?;
        registry.register(|| RandVal::default().into())?;
        registry.register(|| Disconnect::default().into())?;
        registry.register(|| Peers::default().into())?;
        registry.register_object(NODE_CLASS, passthrough)?;
        Ok(registry)
    }

    /// Register a constructor under the type id of the variant it builds.
    pub fn register(&mut self, factory: MessageFactory) -> Result<()> {
        let id = type_id(&factory());
        if self.factories.contains_key(&id) {
            return Err(BootstrapError::DuplicateMessageType(id));
        }
        self.factories.insert(id, factory);
        Ok(())
    }

    pub fn register_object(&mut self, class: &str, factory: ObjectFactory) -> Result<()> {
        self.objects.register(class, factory)?;
        Ok(())
    }

    pub fn create(&self, msg_type: u16) -> Result<MessageKind> {
        self.factories
            .get(&msg_type)
            .map(|factory| factory())
            .ok_or(BootstrapError::UnsupportedMessageType(msg_type))
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }
}
