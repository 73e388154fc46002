//! Live peer discovery contract used by broadcast fan-out.

use crate::messaging::MessagingResult;
use async_trait::async_trait;
use parking_lot::RwLock;

/// Source of the currently live node ids
#[async_trait]
pub trait PeerRegistry: Send + Sync {
    /// Ordered live node ids; may or may not include the caller
    async fn list_live_peer_ids(&self) -> MessagingResult<Vec<String>>;
}

/// Peer list maintained by the host process
#[derive(Debug, Default)]
pub struct StaticPeerRegistry {
    peers: RwLock<Vec<String>>,
}

impl StaticPeerRegistry {
    pub fn new<I, S>(peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            peers: RwLock::new(peers.into_iter().map(Into::into).collect()),
        }
    }

    /// Replace the whole peer list
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.peers.write() = peers.into_iter().map(Into::into).collect();
    }

    /// Add a peer if not already present
    pub fn add_peer(&self, peer: impl Into<String>) {
        let peer = peer.into();
        let mut peers = self.peers.write();
        if !peers.contains(&peer) {
            peers.push(peer);
        }
    }

    pub fn remove_peer(&self, peer: &str) {
        self.peers.write().retain(|p| p != peer);
    }

    pub fn peers(&self) -> Vec<String> {
        self.peers.read().clone()
    }
}

#[async_trait]
impl PeerRegistry for StaticPeerRegistry {
    async fn list_live_peer_ids(&self) -> MessagingResult<Vec<String>> {
        Ok(self.peers())
    }
}
