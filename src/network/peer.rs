use crate::codec::{Object, Value};
use crate::crypto::{CryptoError, PublicKey};
use crate::utils::{BootstrapError, Result};

/// Foreign type name of a node record.
pub const NODE_CLASS: &str = "golem.network.p2p.node.Node";

/// Identity and addresses of a network node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub node_name: String,
    /// Hex of the 64-byte `X || Y` public key.
    pub key: String,
    pub prv_port: u64,
    pub pub_port: u64,
    pub p2p_prv_port: u64,
    pub p2p_pub_port: u64,
    pub prv_addr: String,
    pub pub_addr: String,
    pub prv_addresses: Vec<String>,
    /// NAT description, kept as sent.
    pub nat_type: Value,
}

impl Node {
    /// Tagged object form, fields in wire order.
    pub fn to_object(&self) -> Object {
        let fields = vec![
            ("node_name".to_string(), Value::from(self.node_name.as_str())),
            ("key".to_string(), Value::from(self.key.as_str())),
            ("prv_port".to_string(), Value::from(self.prv_port)),
            ("pub_port".to_string(), Value::from(self.pub_port)),
            ("p2p_prv_port".to_string(), Value::from(self.p2p_prv_port)),
            ("p2p_pub_port".to_string(), Value::from(self.p2p_pub_port)),
            ("prv_addr".to_string(), Value::from(self.prv_addr.as_str())),
            ("pub_addr".to_string(), Value::from(self.pub_addr.as_str())),
            (
                "prv_addresses".to_string(),
                Value::Array(self.prv_addresses.iter().map(|a| Value::from(a.as_str())).collect()),
            ),
            ("nat_type".to_string(), self.nat_type.clone()),
        ];
        Object::new(NODE_CLASS, fields)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_object())
    }

    /// Parse a node from a tagged object or a plain text-keyed map.
    /// Missing and null fields keep their defaults; unknown fields are ignored.
    pub fn from_value(value: &Value) -> Result<Self> {
        if let Value::Object(obj) = value {
            if obj.class != NODE_CLASS {
                return Err(BootstrapError::MalformedNode(format!(
                    "unexpected object type {}",
                    obj.class
                )));
            }
        }
        let entries = value
            .field_entries()
            .ok_or_else(|| BootstrapError::MalformedNode("node info is not a map".into()))?;

        let mut node = Node::default();
        for (name, v) in entries {
            if v.is_null() {
                continue;
            }
            let res = match name {
                "node_name" => v.clone().into_text().map(|s| node.node_name = s),
                "key" => v.clone().into_text().map(|s| node.key = s),
                "prv_port" => v.to_u64().map(|p| node.prv_port = p),
                "pub_port" => v.to_u64().map(|p| node.pub_port = p),
                "p2p_prv_port" => v.to_u64().map(|p| node.p2p_prv_port = p),
                "p2p_pub_port" => v.to_u64().map(|p| node.p2p_pub_port = p),
                "prv_addr" => v.clone().into_text().map(|s| node.prv_addr = s),
                "pub_addr" => v.clone().into_text().map(|s| node.pub_addr = s),
                "prv_addresses" => v
                    .clone()
                    .into_array()
                    .and_then(|items| {
                        items
                            .into_iter()
                            .map(Value::into_text)
                            .collect::<std::result::Result<Vec<_>, _>>()
                    })
                    .map(|addrs| node.prv_addresses = addrs),
                "nat_type" => {
                    node.nat_type = v.clone();
                    Ok(())
                }
                _ => Ok(()),
            };
            res.map_err(|e| BootstrapError::MalformedNode(format!("field {}: {}", name, e)))?;
        }
        Ok(node)
    }

    pub fn public_key(&self) -> std::result::Result<PublicKey, CryptoError> {
        PublicKey::from_hex(&self.key)
    }
}

/// An admitted peer as seen by the bootstrap node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Peer {
    /// Remote host, without port.
    pub address: String,
    pub port: u64,
    pub node: Node,
    pub node_name: String,
}

impl Peer {
    pub fn to_value(&self) -> Value {
        Value::map([
            ("address", Value::from(self.address.as_str())),
            ("port", Value::from(self.port)),
            ("node", self.node.to_value()),
            ("node_name", Value::from(self.node_name.as_str())),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let text = |key: &str| -> Result<String> {
            match value.get(key) {
                None | Some(Value::Null) => Ok(String::new()),
                Some(v) => Ok(v.clone().into_text()?),
            }
        };
        let port = match value.get("port") {
            None | Some(Value::Null) => 0,
            Some(v) => v.to_u64()?,
        };
        let node = match value.get("node") {
            Some(v) => Node::from_value(v)?,
            None => Node::default(),
        };
        Ok(Self { address: text("address")?, port, node, node_name: text("node_name")? })
    }
}
