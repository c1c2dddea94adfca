#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Registry of connected peers and the send surface the pool gossips through.

use async_trait::async_trait;
use elc_eth_wire::EthVersion;
use elc_primitives::{PeerId, TransactionSigned, TxHash};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::warn;

/// Errors surfaced by a peer handle.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// The session behind the handle is gone.
    #[error("peer disconnected")]
    Disconnected,
    /// The peer did not answer a request in time.
    #[error("request timed out")]
    Timeout,
    /// The negotiated version does not carry the requested message.
    #[error("message not supported by {0}")]
    UnsupportedVersion(EthVersion),
}

/// The `eth` sub-protocol surface of a connected peer, as the pool sees it.
///
/// Implementations forward to the session task driving the peer's
/// [`EthStream`](elc_eth_wire::EthStream); the handle holds no session state of its own, so no
/// cyclic ownership arises between peers and protocols.
#[async_trait]
pub trait EthPeer: Send + Sync {
    /// The peer's public identity.
    fn peer_id(&self) -> PeerId;

    /// The negotiated `eth` version.
    fn version(&self) -> EthVersion;

    /// Sends full transaction bodies to the peer.
    async fn send_transactions(&self, txs: Vec<Arc<TransactionSigned>>) -> Result<(), PeerError>;

    /// Announces transaction hashes to the peer.
    async fn announce_hashes(&self, hashes: Vec<TxHash>) -> Result<(), PeerError>;

    /// Requests transaction bodies for the given hashes and awaits the response correlated by
    /// request id.
    async fn get_pooled_transactions(
        &self,
        hashes: Vec<TxHash>,
    ) -> Result<Vec<TransactionSigned>, PeerError>;
}

/// The set of connected peers, keyed by peer id.
#[derive(Default)]
pub struct PeerPool {
    peers: RwLock<HashMap<PeerId, Arc<dyn EthPeer>>>,
    opened: AtomicBool,
}

impl std::fmt::Debug for PeerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerPool").field("peers", &self.peers.read().len()).finish()
    }
}

impl PeerPool {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the registry. Returns `false` if it was already open.
    pub fn open(&self) -> bool {
        !self.opened.swap(true, Ordering::SeqCst)
    }

    /// Closes the registry and drops all peers.
    pub fn close(&self) {
        self.opened.store(false, Ordering::SeqCst);
        self.peers.write().clear();
    }

    /// Adds a peer. Returns `false` if a peer with this id is already connected.
    pub fn add(&self, peer: Arc<dyn EthPeer>) -> bool {
        let mut peers = self.peers.write();
        match peers.entry(peer.peer_id()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(peer);
                true
            }
        }
    }

    /// Removes and returns the peer with the given id.
    pub fn remove(&self, peer_id: &PeerId) -> Option<Arc<dyn EthPeer>> {
        self.peers.write().remove(peer_id)
    }

    /// Returns the peer with the given id.
    pub fn get(&self, peer_id: &PeerId) -> Option<Arc<dyn EthPeer>> {
        self.peers.read().get(peer_id).cloned()
    }

    /// Returns all connected peers.
    pub fn peers(&self) -> Vec<Arc<dyn EthPeer>> {
        self.peers.read().values().cloned().collect()
    }

    /// Number of connected peers.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Sends the transactions to every connected peer. Individual send failures are logged and
    /// skipped, a dead peer must never stall the broadcast.
    pub async fn broadcast_transactions(&self, txs: Vec<Arc<TransactionSigned>>) {
        for peer in self.peers() {
            if let Err(err) = peer.send_transactions(txs.clone()).await {
                warn!(peer = %peer.peer_id(), %err, "failed to broadcast transactions");
            }
        }
    }

    /// Announces the hashes to every connected peer. Individual failures are logged and
    /// skipped.
    pub async fn broadcast_hashes(&self, hashes: Vec<TxHash>) {
        for peer in self.peers() {
            if let Err(err) = peer.announce_hashes(hashes.clone()).await {
                warn!(peer = %peer.peer_id(), %err, "failed to announce hashes");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MockPeer {
        id: PeerId,
        fail_sends: bool,
        sent: Mutex<Vec<Vec<TxHash>>>,
    }

    impl MockPeer {
        fn new(id_byte: u8) -> Self {
            Self { id: PeerId::repeat_byte(id_byte), ..Default::default() }
        }
    }

    #[async_trait]
    impl EthPeer for MockPeer {
        fn peer_id(&self) -> PeerId {
            self.id
        }
        fn version(&self) -> EthVersion {
            EthVersion::Eth68
        }
        async fn send_transactions(
            &self,
            _txs: Vec<Arc<TransactionSigned>>,
        ) -> Result<(), PeerError> {
            if self.fail_sends {
                return Err(PeerError::Disconnected)
            }
            Ok(())
        }
        async fn announce_hashes(&self, hashes: Vec<TxHash>) -> Result<(), PeerError> {
            if self.fail_sends {
                return Err(PeerError::Disconnected)
            }
            self.sent.lock().push(hashes);
            Ok(())
        }
        async fn get_pooled_transactions(
            &self,
            _hashes: Vec<TxHash>,
        ) -> Result<Vec<TransactionSigned>, PeerError> {
            Ok(vec![])
        }
    }

    #[test]
    fn add_remove_get() {
        let pool = PeerPool::new();
        assert!(pool.open());
        assert!(!pool.open());

        let peer = Arc::new(MockPeer::new(0x01));
        assert!(pool.add(peer.clone()));
        assert!(!pool.add(peer.clone()));
        assert_eq!(pool.len(), 1);
        assert!(pool.get(&peer.peer_id()).is_some());

        assert!(pool.remove(&peer.peer_id()).is_some());
        assert!(pool.is_empty());
    }

    #[test]
    fn close_clears_peers() {
        let pool = PeerPool::new();
        pool.open();
        pool.add(Arc::new(MockPeer::new(0x01)));
        pool.close();
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn broadcast_survives_failing_peer() {
        let pool = PeerPool::new();
        pool.open();

        let bad = Arc::new(MockPeer { fail_sends: true, ..MockPeer::new(0x01) });
        let good = Arc::new(MockPeer::new(0x02));
        pool.add(bad);
        pool.add(good.clone());

        pool.broadcast_hashes(vec![B256::repeat_byte(0xaa)]).await;
        assert_eq!(good.sent.lock().len(), 1);
    }
}
