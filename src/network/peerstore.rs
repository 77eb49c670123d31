use std::collections::HashMap;

use parking_lot::Mutex;
use rand::seq::IteratorRandom;
use tracing::debug;

use crate::network::peer::Peer;

/// Set of admitted peers shared by all sessions.
pub trait PeerKeeper: Send + Sync {
    /// Record `peer` under `id`; re-adding a known id is a no-op.
    fn add_peer(&self, id: &str, peer: Peer);

    /// Every known peer except the one stored under `exclude_id`.
    fn get_peers(&self, exclude_id: &str) -> Vec<Peer>;
}

/// Bounded peer set; when full, a random entry makes room for the new one.
#[derive(Debug)]
pub struct RandomizedPeerKeeper {
    capacity: usize,
    peers: Mutex<HashMap<String, Peer>>,
}

impl RandomizedPeerKeeper {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, peers: Mutex::new(HashMap::with_capacity(capacity)) }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.peers.lock().len()
    }
}

impl PeerKeeper for RandomizedPeerKeeper {
    fn add_peer(&self, id: &str, peer: Peer) {
        if self.capacity == 0 {
            return;
        }
        let mut peers = self.peers.lock();
        if peers.contains_key(id) {
            return;
        }
        if peers.len() >= self.capacity {
            let evicted = peers.keys().choose(&mut rand::thread_rng()).cloned();
            if let Some(evicted) = evicted {
                debug!(peer = %evicted, "evicting peer");
                peers.remove(&evicted);
            }
        }
        peers.insert(id.to_string(), peer);
    }

    fn get_peers(&self, exclude_id: &str) -> Vec<Peer> {
        self.peers
            .lock()
            .iter()
            .filter(|(id, _)| id.as_str() != exclude_id)
            .map(|(_, peer)| peer.clone())
            .collect()
    }
}
