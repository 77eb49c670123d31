//! Per-connection handshake state machine.
//!
//! `Start -> AwaitingRemoteHello -> AwaitingRemoteRandVal -> Verified -> PeerExchange -> Closed`,
//! or `Aborted` on any violation. The first remote Hello cannot be verified: the
//! remote key only becomes trusted once it passes the difficulty check.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::crypto::SessionCrypto;
use crate::network::message::{
    type_id, Disconnect, DisconnectReason, Message, MessageKind, Peers, RandVal,
};
use crate::network::{Connection, Node, Peer};
use crate::node::service::ServiceContext;
use crate::utils::metrics::HANDSHAKES_COMPLETED;
use crate::utils::{BootstrapError, Result, METRICS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Start,
    AwaitingRemoteHello,
    AwaitingRemoteRandVal,
    Verified,
    PeerExchange,
    Closed,
    Aborted,
}

pub struct PeerSession<S> {
    ctx: Arc<ServiceContext>,
    conn: Connection<S>,
    crypto: SessionCrypto,
    state: SessionState,
    id: String,
    peer: Option<Peer>,
}

impl<S> PeerSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(ctx: Arc<ServiceContext>, conn: Connection<S>) -> Self {
        let crypto = SessionCrypto::new(ctx.private_key().clone());
        Self { ctx, conn, crypto, state: SessionState::Start, id: String::new(), peer: None }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle the connection to completion and close it, whatever the outcome.
    pub async fn run(mut self) -> Result<()> {
        let res = self.handle().await;
        if let Err(e) = self.conn.close().await {
            debug!("closing connection: {}", e);
        }
        res
    }

    /// Handshake, then hand out peers and say goodbye.
    ///
    /// Errors that carry a disconnect reason are reported to the peer first.
    pub async fn handle(&mut self) -> Result<()> {
        info!(peer = %self.conn.remote_addr(), "peer connection");
        if let Err(e) = self.perform_handshake().await {
            self.state = SessionState::Aborted;
            if let Some(reason) = e.disconnect_reason() {
                if let Err(send_err) = self.send_disconnect(reason).await {
                    debug!("couldn't notify peer: {}", send_err);
                }
            }
            return Err(e);
        }
        METRICS.inc_counter(HANDSHAKES_COMPLETED);

        if let Err(e) = self.exchange_peers().await {
            self.state = SessionState::Aborted;
            return Err(e);
        }
        self.state = SessionState::Closed;
        Ok(())
    }

    pub async fn perform_handshake(&mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let config = &ctx.config;
        let my_hello = ctx.gen_hello();
        let my_rand_val = my_hello.rand_val;
        self.send(my_hello.into()).await?;

        self.state = SessionState::AwaitingRemoteHello;
        let hello = match self.receive().await?.kind {
            MessageKind::Hello(hello) => hello,
            MessageKind::Disconnect(d) => return Err(BootstrapError::PeerDisconnected(d.reason.to_string())),
            other => {
                return Err(BootstrapError::Protocol(format!(
                    "unexpected msg type {}, was expecting Hello",
                    type_id(&other)
                )))
            }
        };

        if hello.proto_id != config.protocol_id {
            return Err(BootstrapError::ProtocolMismatch {
                remote: hello.proto_id,
                local: config.protocol_id.clone(),
            });
        }

        let node = Node::from_value(&hello.node_info)?;
        let remote_key = node.public_key().map_err(|e| {
            BootstrapError::MalformedNode(format!("couldn't decode remote public key: {}", e))
        })?;
        let difficulty = remote_key.difficulty();
        if difficulty < config.key_difficulty {
            return Err(BootstrapError::KeyNotDifficult {
                got: difficulty,
                required: config.key_difficulty,
            });
        }
        self.crypto.set_remote(remote_key);

        self.state = SessionState::AwaitingRemoteRandVal;
        let rand_val = match self.receive().await?.kind {
            MessageKind::RandVal(r) => r,
            MessageKind::Disconnect(d) => return Err(BootstrapError::PeerDisconnected(d.reason.to_string())),
            other => {
                return Err(BootstrapError::Protocol(format!(
                    "unexpected msg type {}, was expecting RandVal",
                    type_id(&other)
                )))
            }
        };
        if rand_val.rand_val != my_rand_val {
            return Err(BootstrapError::Protocol("incorrect RandVal value".into()));
        }

        self.state = SessionState::Verified;
        self.send(RandVal { rand_val: hello.rand_val }.into()).await?;

        self.peer = Some(Peer {
            address: self.conn.remote_addr().ip().to_string(),
            port: hello.port,
            node,
            node_name: hello.node_name,
        });
        self.id = hello.client_key_id;
        debug!(id = %self.id, "handshake complete");
        Ok(())
    }

    /// Send the known peers, admit this one, then disconnect with `bootstrap`.
    pub async fn exchange_peers(&mut self) -> Result<()> {
        self.state = SessionState::PeerExchange;
        let peer = self
            .peer
            .clone()
            .ok_or_else(|| BootstrapError::Protocol("no verified peer to exchange".into()))?;

        let keeper = self.ctx.peer_keeper.clone();
        let peers = keeper.get_peers(&self.id);
        debug!(count = peers.len(), "sending peers");
        self.send(Peers::from_peers(&peers).into()).await?;
        keeper.add_peer(&self.id, peer);

        self.send_disconnect(DisconnectReason::Bootstrap).await
    }

    async fn send_disconnect(&mut self, reason: DisconnectReason) -> Result<()> {
        self.send(Disconnect { reason }.into()).await
    }

    async fn send(&mut self, kind: MessageKind) -> Result<()> {
        let mut msg = Message::new(kind);
        self.conn.send(&mut msg, &self.crypto).await
    }

    async fn receive(&mut self) -> Result<Message> {
        self.conn.receive(&self.ctx.registry, &self.crypto).await
    }
}
