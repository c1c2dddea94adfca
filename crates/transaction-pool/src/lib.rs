#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! The transaction pool: an admission-controlled, per-sender nonce-ordered buffer of pending
//! transactions with replace-by-fee, block reconciliation and gossip fan-out.
//!
//! All collaborators (state, chain info, clock, peers) are injected, so tests run the pool
//! against fakes without touching global state. Mutations are serialized behind one async lock;
//! the lock spans the account lookup of the acceptance pipeline, so no two admissions ever
//! observe an intermediate state.

pub mod error;
pub mod pool;

mod config;
mod maintain;
mod ordering;
mod traits;

pub use config::{
    PoolConfig, HANDLED_CLEANUP_TIME_LIMIT, MAX_DATA_BYTES, MAX_PER_SENDER,
    POOLED_STORAGE_TIME_LIMIT, POOL_MAX_SIZE, REPLACEMENT_BUMP_PERCENT, TX_RETRIEVAL_LIMIT,
};
pub use error::{PoolError, PoolResult};
pub use pool::PoolEntry;
pub use traits::{ChainInfo, Clock, StateView, SystemClock};

use crate::pool::TxPool;
use elc_peers::{EthPeer, PeerPool};
use elc_primitives::{Block, PeerId, TransactionSigned, TxHash};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, warn};

/// The transaction pool handle. Cheap to clone, all clones share the same pool.
pub struct Pool<S, C = SystemClock> {
    inner: Arc<PoolInner<S, C>>,
}

impl<S, C> Clone for Pool<S, C> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<S, C> std::fmt::Debug for Pool<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").finish_non_exhaustive()
    }
}

struct PoolInner<S, C> {
    config: PoolConfig,
    state: S,
    chain: Arc<dyn ChainInfo>,
    clock: C,
    pool: Mutex<TxPool>,
    opened: AtomicBool,
    maintenance: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<S, C> Pool<S, C>
where
    S: StateView + 'static,
    C: Clock,
{
    /// Creates a new pool over the injected collaborators.
    pub fn new(config: PoolConfig, state: S, chain: Arc<dyn ChainInfo>, clock: C) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                pool: Mutex::new(TxPool::new(config.clone())),
                config,
                state,
                chain,
                clock,
                opened: AtomicBool::new(false),
                maintenance: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// The configuration in force.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Opens the pool. Returns `false` if it was already open.
    pub fn open(&self) -> bool {
        !self.inner.opened.swap(true, Ordering::SeqCst)
    }

    /// Whether the pool is open.
    pub fn is_open(&self) -> bool {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Arms the cleanup and re-announcement timers. A second `start` while running is a no-op.
    pub fn start(&self, peers: Arc<PeerPool>) {
        let mut maintenance = self.inner.maintenance.lock();
        if maintenance.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return
        }
        *maintenance = Some(maintain::spawn_maintenance(self.clone(), peers));
    }

    /// Disarms the timers. Returns `false` if they were not running. In-flight retrievals
    /// driven by peer tasks finish on their own; their results are simply no longer
    /// re-announced by the timer.
    pub fn stop(&self) -> bool {
        match self.inner.maintenance.lock().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Stops the timers and clears all pool state.
    pub async fn close(&self) {
        self.stop();
        self.inner.pool.lock().await.clear();
        self.inner.opened.store(false, Ordering::SeqCst);
    }

    /// Number of pooled transactions.
    pub async fn len(&self) -> usize {
        self.inner.pool.lock().await.len()
    }

    /// Whether the pool is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether the hash is pooled.
    pub async fn contains(&self, hash: &TxHash) -> bool {
        self.inner.pool.lock().await.contains(hash)
    }

    /// Returns the pooled transaction with the given hash.
    pub async fn get(&self, hash: &TxHash) -> Option<Arc<TransactionSigned>> {
        self.inner.pool.lock().await.get(hash).map(|entry| entry.transaction.clone())
    }

    /// Returns the pooled transactions for the given hashes, skipping unknown ones. This is
    /// what serves `GetPooledTransactions`.
    pub async fn get_all(&self, hashes: &[TxHash]) -> Vec<Arc<TransactionSigned>> {
        let pool = self.inner.pool.lock().await;
        hashes.iter().filter_map(|hash| pool.get(hash).map(|e| e.transaction.clone())).collect()
    }

    /// Number of remembered handled hashes, exposed for tests and ops.
    pub async fn handled_len(&self) -> usize {
        self.inner.pool.lock().await.handled_len()
    }

    /// Runs the acceptance pipeline for a single candidate transaction.
    ///
    /// The pool lock is held across the account lookup: admissions are fully serialized, a
    /// concurrent candidate from the same sender cannot slip past the balance or nonce checks.
    pub async fn add_transaction(
        &self,
        transaction: TransactionSigned,
    ) -> PoolResult<Arc<TransactionSigned>> {
        let mut pool = self.inner.pool.lock().await;
        let sender = transaction.recover_signer().ok_or(PoolError::InvalidSender)?;
        let account = self.inner.state.account(sender).await.unwrap_or_default();
        let now = self.inner.clock.now_ms();
        pool.insert(
            transaction,
            sender,
            account,
            self.inner.chain.base_fee(),
            self.inner.chain.block_gas_limit(),
            now,
        )
    }

    /// Runs the acceptance pipeline for a batch, as delivered by a `Transactions` broadcast.
    /// Rejections are logged per transaction and never fail the batch.
    pub async fn add_transactions(
        &self,
        transactions: Vec<TransactionSigned>,
    ) -> Vec<Arc<TransactionSigned>> {
        let mut added = Vec::new();
        for transaction in transactions {
            let hash = transaction.hash();
            match self.add_transaction(transaction).await {
                Ok(tx) => added.push(tx),
                Err(err) => debug!(?hash, %err, "rejected incoming transaction"),
            }
        }
        added
    }

    /// Handles a `NewPooledTransactionHashes` announcement from a peer.
    ///
    /// Hashes already handled or already known to the peer are filtered; everything announced
    /// is recorded as known to the peer so it is never echoed back. The remainder is fetched
    /// in batches of at most `tx_retrieval_limit`, run through the acceptance pipeline and the
    /// new additions are re-announced to every other peer that has not seen them. Failed
    /// retrievals are not retried, the hashes will be re-learned from a later announcement.
    pub async fn handle_announced_hashes(
        &self,
        announced: Vec<TxHash>,
        peer: &dyn EthPeer,
        peers: &PeerPool,
    ) -> Vec<Arc<TransactionSigned>> {
        let peer_id = peer.peer_id();

        let to_request: Vec<TxHash> = {
            let mut pool = self.inner.pool.lock().await;
            let now = self.inner.clock.now_ms();
            let mut wanted = Vec::new();
            for hash in announced {
                let fresh = !pool.is_handled(&hash) && !pool.is_known_by(&peer_id, &hash);
                pool.note_known_by(peer_id, hash, now);
                if fresh {
                    wanted.push(hash);
                }
            }
            wanted
        };

        let mut added = Vec::new();
        for batch in to_request.chunks(self.inner.config.tx_retrieval_limit) {
            match peer.get_pooled_transactions(batch.to_vec()).await {
                Ok(transactions) => {
                    for transaction in transactions {
                        let hash = transaction.hash();
                        match self.add_transaction(transaction).await {
                            Ok(tx) => added.push(tx),
                            Err(err) => debug!(?hash, %err, "rejected retrieved transaction"),
                        }
                    }
                }
                Err(err) => {
                    warn!(peer = %peer_id, %err, "failed to retrieve pooled transactions")
                }
            }
        }

        if !added.is_empty() {
            self.announce_to_peers(&added, Some(peer_id), peers).await;
        }
        added
    }

    /// Announces the given transactions to every peer not known to have them, excluding the
    /// peer they came from. Each announced hash is recorded in the target peer's knowledge.
    async fn announce_to_peers(
        &self,
        transactions: &[Arc<TransactionSigned>],
        exclude: Option<PeerId>,
        peers: &PeerPool,
    ) {
        for other in peers.peers() {
            let other_id = other.peer_id();
            if Some(other_id) == exclude {
                continue
            }

            let hashes: Vec<TxHash> = {
                let mut pool = self.inner.pool.lock().await;
                let now = self.inner.clock.now_ms();
                let mut fresh = Vec::new();
                for transaction in transactions {
                    let hash = transaction.hash();
                    if !pool.is_known_by(&other_id, &hash) {
                        pool.note_known_by(other_id, hash, now);
                        fresh.push(hash);
                    }
                }
                fresh
            };

            if hashes.is_empty() {
                continue
            }
            if let Err(err) = other.announce_hashes(hashes).await {
                warn!(peer = %other_id, %err, "failed to announce transactions");
            }
        }
    }

    /// Re-announces the whole pool content, used by the re-announcement timer.
    pub(crate) async fn reannounce(&self, peers: &PeerPool) {
        let transactions = self.inner.pool.lock().await.all();
        if transactions.is_empty() {
            return
        }
        self.announce_to_peers(&transactions, None, peers).await;
    }

    /// Drops every `(sender, nonce)` pair included in the given blocks from the pool.
    ///
    /// This must complete before the next admission observes the post-block nonces, which the
    /// shared pool lock guarantees.
    pub async fn remove_new_block_txs(&self, blocks: &[Block]) {
        let mut pool = self.inner.pool.lock().await;
        for block in blocks {
            for transaction in &block.transactions {
                let Some(sender) = transaction.recover_signer() else { continue };
                if pool.remove_mined(sender, transaction.nonce()).is_some() {
                    debug!(hash = ?transaction.hash(), "removed included transaction");
                }
            }
        }
    }

    /// Drops all bookkeeping for a departed peer.
    pub async fn on_peer_disconnected(&self, peer: &PeerId) {
        self.inner.pool.lock().await.forget_peer(peer);
    }

    /// Runs one cleanup sweep now; the same sweep the timer runs periodically.
    pub async fn cleanup(&self) {
        let now = self.inner.clock.now_ms();
        self.inner.pool.lock().await.cleanup(now);
    }

    /// The pool content ordered for block construction: highest effective price at `base_fee`
    /// first, per-sender nonce order preserved, price ties broken by ascending sender address.
    /// The result is deterministic.
    pub async fn ordered_transactions(&self, base_fee: u128) -> Vec<Arc<TransactionSigned>> {
        self.inner.pool.lock().await.ordered(base_fee)
    }

    /// All pooled hashes.
    pub async fn pooled_hashes(&self) -> Vec<TxHash> {
        self.inner.pool.lock().await.hashes()
    }
}
