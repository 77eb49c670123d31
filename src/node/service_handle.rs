use std::net::SocketAddr;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::utils::Result;

/// Running accept loop plus its shutdown channel.
/// Call `shutdown()` to stop accepting; sessions in flight finish on their own.
pub struct ServiceHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    join_handles: Vec<JoinHandle<Result<()>>>,
}

impl ServiceHandle {
    /// Create a handle and the receiver the accept loop observes.
    pub fn new(local_addr: SocketAddr) -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let handle = ServiceHandle { local_addr, shutdown_tx: tx, join_handles: vec![] };
        (handle, rx)
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn attach(&mut self, h: JoinHandle<Result<()>>) {
        self.join_handles.push(h);
    }

    /// Signal shutdown and wait for attached tasks.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);

        for h in self.join_handles {
            match h.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("service task returned error: {:?}", e),
                Err(e) => tracing::error!("task join error: {:?}", e),
            }
        }
        Ok(())
    }
}
