//! Accept loop and the state shared by every session.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::codec::Value;
use crate::crypto::PrivateKey;
use crate::network::{tcp, Connection, Hello, MessageRegistry, Node, PeerKeeper};
use crate::node::config::Config;
use crate::node::service_handle::ServiceHandle;
use crate::node::session::PeerSession;
use crate::utils::metrics::{CONNECTIONS_ACCEPTED, SESSIONS_FAILED};
use crate::utils::{Result, METRICS};

/// Read-only state handed to each session.
pub struct ServiceContext {
    pub config: Config,
    key: PrivateKey,
    pub_key_hex: String,
    pub peer_keeper: Arc<dyn PeerKeeper>,
    pub registry: MessageRegistry,
}

impl ServiceContext {
    /// An empty `config.id` is replaced by the node public key hex.
    pub fn new(mut config: Config, key: PrivateKey, peer_keeper: Arc<dyn PeerKeeper>) -> Result<Self> {
        config.validate()?;
        let pub_key_hex = key.public_key().hex();
        if config.id.is_empty() {
            config.id = pub_key_hex.clone();
        }
        Ok(Self { config, key, pub_key_hex, peer_keeper, registry: MessageRegistry::standard()? })
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }

    /// This node's record as announced in Hello.
    pub fn local_node(&self) -> Node {
        let cfg = &self.config;
        Node {
            node_name: cfg.name.clone(),
            key: self.pub_key_hex.clone(),
            prv_port: 0,
            pub_port: 0,
            p2p_prv_port: cfg.port,
            p2p_pub_port: 0,
            prv_addr: cfg.prv_addr.clone(),
            pub_addr: cfg.pub_addr.clone(),
            prv_addresses: cfg.prv_addresses.clone(),
            nat_type: Value::Array(cfg.nat_type.iter().map(|n| Value::from(n.as_str())).collect()),
        }
    }

    /// A fresh Hello with a new random challenge value.
    pub fn gen_hello(&self) -> Hello {
        let cfg = &self.config;
        Hello {
            rand_val: rand::random::<f64>(),
            proto_id: cfg.protocol_id.clone(),
            node_name: cfg.name.clone(),
            node_info: self.local_node().to_value(),
            port: cfg.port,
            client_ver: cfg.golem_version.clone(),
            client_key_id: cfg.id.clone(),
            solve_challenge: false,
            challenge: Value::Null,
            difficulty: 0,
            metadata: Value::Map(Vec::new()),
            golem_messages_version: cfg.golem_messages_version.clone(),
        }
    }
}

/// Bootstrap service: one session task per accepted connection.
#[derive(Clone)]
pub struct Service {
    ctx: Arc<ServiceContext>,
}

impl Service {
    pub fn new(config: Config, key: PrivateKey, peer_keeper: Arc<dyn PeerKeeper>) -> Result<Self> {
        Ok(Self { ctx: Arc::new(ServiceContext::new(config, key, peer_keeper)?) })
    }

    pub fn context(&self) -> Arc<ServiceContext> {
        self.ctx.clone()
    }

    /// Bind, spawn the accept loop, and return a handle to stop it.
    pub async fn start(self) -> Result<ServiceHandle> {
        let listener = tcp::bind(&self.ctx.config.listen_addr()).await?;
        self.start_with(listener)
    }

    pub fn start_with(self, listener: TcpListener) -> Result<ServiceHandle> {
        let local_addr = listener.local_addr()?;
        let (mut handle, shutdown_rx) = ServiceHandle::new(local_addr);
        let task = tokio::spawn(async move { self.serve(listener, shutdown_rx).await });
        handle.attach(task);
        Ok(handle)
    }

    /// Accept connections sequentially; sessions run on their own tasks.
    pub async fn serve(&self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(addr = %listener.local_addr()?, "listening");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("accept loop observed shutdown");
                        return Ok(());
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        METRICS.inc_counter(CONNECTIONS_ACCEPTED);
                        self.spawn_session(stream, addr);
                    }
                    Err(e) => warn!("error accepting: {}", e),
                },
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, addr: SocketAddr) {
        let ctx = self.ctx.clone();
        tokio::spawn(
            async move {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("set_nodelay: {}", e);
                }
                let conn = Connection::new(stream, addr);
                match PeerSession::new(ctx, conn).run().await {
                    Ok(()) => debug!("session finished"),
                    Err(e) => {
                        METRICS.inc_counter(SESSIONS_FAILED);
                        warn!("peer session error: {}", e);
                    }
                }
            }
            .instrument(info_span!("session", peer = %addr)),
        );
    }
}
