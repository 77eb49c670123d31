use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::trace;

use crate::crypto::MessageCrypto;
use crate::network::codec::FrameCodec;
use crate::network::message::Message;
use crate::network::registry::MessageRegistry;
use crate::network::wire;
use crate::utils::{BootstrapError, Result};

/// A framed byte stream to one peer.
pub struct Connection<S> {
    framed: Framed<S, FrameCodec>,
    remote_addr: SocketAddr,
}

impl Connection<TcpStream> {
    pub fn from_tcp(stream: TcpStream) -> Result<Self> {
        let remote_addr = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, remote_addr))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, remote_addr: SocketAddr) -> Self {
        Self { framed: Framed::new(stream, FrameCodec::new()), remote_addr }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Sign, encrypt if required, and write one message.
    pub async fn send(&mut self, msg: &mut Message, crypto: &dyn MessageCrypto) -> Result<()> {
        let raw = wire::serialize(msg, crypto)?;
        trace!(peer = %self.remote_addr, msg_type = msg.msg_type(), len = raw.len(), "sending frame");
        self.send_frame(Bytes::from(raw)).await
    }

    /// Read one message; fails with `ConnectionClosed` when the stream ends between frames.
    pub async fn receive(
        &mut self,
        registry: &MessageRegistry,
        crypto: &dyn MessageCrypto,
    ) -> Result<Message> {
        let frame = self.receive_frame().await?;
        wire::deserialize(&frame, registry, crypto)
    }

    pub async fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        self.framed.send(frame).await?;
        Ok(())
    }

    pub async fn receive_frame(&mut self) -> Result<Bytes> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(e)) => Err(e.into()),
            None => Err(BootstrapError::ConnectionClosed),
        }
    }

    /// Flush pending frames and shut down the write side.
    pub async fn close(&mut self) -> Result<()> {
        self.framed.close().await?;
        Ok(())
    }
}
