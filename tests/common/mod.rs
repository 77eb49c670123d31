//! Shared helpers: a scripted remote peer and a PeerKeeper that records calls.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};

use overlay_bootstrap::codec::Value;
use overlay_bootstrap::crypto::{generate_difficult_key, PrivateKey, SessionCrypto};
use overlay_bootstrap::network::{
    Connection, Hello, Message, MessageKind, MessageRegistry, Node, Peer, PeerKeeper,
    RandomizedPeerKeeper,
};
use overlay_bootstrap::{Config, Result, ServiceContext};

pub const PROTOCOL_ID: &str = "1337";

/// PeerKeeper wrapper remembering every call.
pub struct RecordingPeerKeeper {
    inner: RandomizedPeerKeeper,
    pub added: Mutex<Vec<String>>,
    pub queried: Mutex<Vec<String>>,
}

impl RecordingPeerKeeper {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RandomizedPeerKeeper::new(capacity),
            added: Mutex::new(Vec::new()),
            queried: Mutex::new(Vec::new()),
        }
    }
}

impl PeerKeeper for RecordingPeerKeeper {
    fn add_peer(&self, id: &str, peer: Peer) {
        self.added.lock().push(id.to_string());
        self.inner.add_peer(id, peer);
    }

    fn get_peers(&self, exclude_id: &str) -> Vec<Peer> {
        self.queried.lock().push(exclude_id.to_string());
        self.inner.get_peers(exclude_id)
    }
}

pub fn bootstrap_context(key_difficulty: u32, keeper: Arc<RecordingPeerKeeper>) -> Arc<ServiceContext> {
    let config = Config {
        name: "test bootstrap".into(),
        protocol_id: PROTOCOL_ID.into(),
        key_difficulty,
        ..Default::default()
    };
    Arc::new(ServiceContext::new(config, PrivateKey::generate(), keeper).unwrap())
}

pub fn duplex_pair() -> (Connection<DuplexStream>, Connection<DuplexStream>) {
    let (a, b) = tokio::io::duplex(64 * 1024);
    let addr: SocketAddr = "192.0.2.7:51234".parse().unwrap();
    (Connection::new(a, addr), Connection::new(b, addr))
}

/// The connecting side of a handshake, driven step by step by a test.
pub struct RemotePeer {
    pub key: PrivateKey,
    pub crypto: SessionCrypto,
    pub registry: MessageRegistry,
    pub client_id: String,
}

impl RemotePeer {
    pub fn new(client_id: &str) -> Self {
        let key = generate_difficult_key(0).unwrap();
        Self {
            crypto: SessionCrypto::new(key.clone()),
            key,
            registry: MessageRegistry::standard().unwrap(),
            client_id: client_id.to_string(),
        }
    }

    pub fn node(&self) -> Node {
        Node {
            node_name: self.client_id.clone(),
            key: self.key.public_key().hex(),
            p2p_prv_port: 40103,
            prv_addr: "10.0.0.7".into(),
            prv_addresses: vec!["10.0.0.7".into()],
            nat_type: Value::Array(vec![]),
            ..Default::default()
        }
    }

    pub fn hello(&self, proto_id: &str, rand_val: f64) -> Hello {
        Hello {
            rand_val,
            proto_id: proto_id.to_string(),
            node_name: self.client_id.clone(),
            node_info: self.node().to_value(),
            port: 40103,
            client_ver: "0.19.0".into(),
            client_key_id: self.client_id.clone(),
            metadata: Value::Map(vec![]),
            golem_messages_version: "2.24.3".into(),
            ..Default::default()
        }
    }

    pub async fn send<S>(&self, conn: &mut Connection<S>, kind: impl Into<MessageKind>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        conn.send(&mut Message::new(kind), &self.crypto).await
    }

    pub async fn recv<S>(&self, conn: &mut Connection<S>) -> Result<MessageKind>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Ok(conn.receive(&self.registry, &self.crypto).await?.kind)
    }

    /// Read the bootstrap Hello and trust the key it announces.
    pub async fn recv_hello<S>(&mut self, conn: &mut Connection<S>) -> Hello
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.recv(conn).await.unwrap() {
            MessageKind::Hello(hello) => {
                let key = Node::from_value(&hello.node_info).unwrap().public_key().unwrap();
                self.crypto.set_remote(key);
                hello
            }
            other => panic!("expected Hello, got {:?}", other),
        }
    }
}
