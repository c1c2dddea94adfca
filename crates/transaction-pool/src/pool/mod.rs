//! The internal transaction pool implementation: admission, per-sender nonce ordering,
//! replacement, reconciliation, gossip bookkeeping and cleanup.

use crate::{
    config::PoolConfig,
    error::{PoolError, PoolResult},
    ordering::ordered_transactions,
};
use alloy_primitives::Address;
use elc_primitives::{Account, PeerId, TransactionSigned, TxHash};
use fnv::FnvHashMap;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

/// A transaction resident in the pool.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    /// The transaction itself, shared with everyone the pool hands it to.
    pub transaction: Arc<TransactionSigned>,
    /// The recovered sender.
    pub sender: Address,
    /// When the entry was admitted, in clock milliseconds.
    pub added_at: u64,
}

impl PoolEntry {
    /// The transaction hash.
    pub fn hash(&self) -> TxHash {
        self.transaction.hash()
    }
}

/// The pool's tables. Purely synchronous; the async facade serializes access.
#[derive(Debug)]
pub(crate) struct TxPool {
    config: PoolConfig,
    /// Pending transactions grouped by sender, each group in ascending nonce order.
    by_sender: HashMap<Address, Vec<PoolEntry>>,
    /// Reverse index from hash to sender for O(1) lookups.
    by_hash: FnvHashMap<TxHash, Address>,
    /// Recently observed hashes (admitted or rejected) with their observation time, kept to
    /// suppress re-announcement loops.
    handled: FnvHashMap<TxHash, u64>,
    /// Which hashes each peer is known to have seen, with the time we learned it.
    known_by_peer: HashMap<PeerId, Vec<(TxHash, u64)>>,
}

impl TxPool {
    pub(crate) fn new(config: PoolConfig) -> Self {
        Self {
            config,
            by_sender: Default::default(),
            by_hash: Default::default(),
            handled: Default::default(),
            known_by_peer: Default::default(),
        }
    }

    /// The pool configuration in force.
    pub(crate) fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of pooled transactions.
    pub(crate) fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Whether the hash is currently pooled.
    pub(crate) fn contains(&self, hash: &TxHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Returns the entry for the given hash.
    pub(crate) fn get(&self, hash: &TxHash) -> Option<&PoolEntry> {
        let sender = self.by_hash.get(hash)?;
        self.by_sender.get(sender)?.iter().find(|entry| entry.hash() == *hash)
    }

    /// The sender's pending transactions, ascending by nonce.
    pub(crate) fn by_sender(&self, sender: &Address) -> &[PoolEntry] {
        self.by_sender.get(sender).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct senders.
    pub(crate) fn sender_count(&self) -> usize {
        self.by_sender.len()
    }

    /// Runs the acceptance pipeline and inserts the transaction on success.
    ///
    /// The caller has already recovered the sender and fetched the account; both happen outside
    /// this synchronous structure. Every rejection is a [`PoolError`] naming the rule that
    /// fired.
    pub(crate) fn insert(
        &mut self,
        transaction: TransactionSigned,
        sender: Address,
        account: Account,
        base_fee: u128,
        block_gas_limit: u64,
        now: u64,
    ) -> PoolResult<Arc<TransactionSigned>> {
        let hash = transaction.hash();
        let res = self.validate_and_insert(
            transaction,
            sender,
            account,
            base_fee,
            block_gas_limit,
            now,
        );
        // both outcomes suppress further retrieval of this hash for a while
        self.handled.insert(hash, now);
        res
    }

    fn validate_and_insert(
        &mut self,
        transaction: TransactionSigned,
        sender: Address,
        account: Account,
        base_fee: u128,
        block_gas_limit: u64,
        now: u64,
    ) -> PoolResult<Arc<TransactionSigned>> {
        let hash = transaction.hash();
        let entries = self.by_sender.get(&sender).map(Vec::as_slice).unwrap_or(&[]);

        if entries.len() >= self.config.max_per_sender {
            return Err(PoolError::PerSenderLimit(sender))
        }
        if self.by_hash.len() >= self.config.max_pool_size {
            return Err(PoolError::PoolFull)
        }
        if self.by_hash.contains_key(&hash) {
            return Err(PoolError::AlreadyKnown(hash))
        }
        if transaction.input().len() > self.config.max_data_bytes {
            return Err(PoolError::OversizedData {
                got: transaction.input().len(),
                limit: self.config.max_data_bytes,
            })
        }
        if transaction.nonce() < account.nonce {
            return Err(PoolError::NonceTooLow { tx: transaction.nonce(), state: account.nonce })
        }
        let upfront = transaction.upfront_cost(base_fee);
        if account.balance < upfront {
            return Err(PoolError::InsufficientFunds { cost: upfront, balance: account.balance })
        }
        if transaction.gas_limit() > block_gas_limit {
            return Err(PoolError::ExceedsBlockGasLimit {
                got: transaction.gas_limit(),
                limit: block_gas_limit,
            })
        }
        let effective = transaction.effective_gas_price(base_fee);
        if effective < self.config.min_gas_price {
            return Err(PoolError::Underpriced { effective, min: self.config.min_gas_price })
        }

        let transaction = Arc::new(transaction);
        let entry = PoolEntry { transaction: transaction.clone(), sender, added_at: now };
        let queue = self.by_sender.entry(sender).or_default();

        match queue.binary_search_by_key(&entry.transaction.nonce(), |e| e.transaction.nonce()) {
            Ok(position) => {
                // same (sender, nonce): replace-by-fee, the newcomer must out-price the
                // incumbent by the configured bump
                let existing = &queue[position];
                let existing_price = existing.transaction.effective_gas_price(base_fee);
                let required = existing_price +
                    existing_price * self.config.replacement_bump_percent / 100;
                if effective < required {
                    return Err(PoolError::ReplacementUnderpriced)
                }

                let replaced = std::mem::replace(&mut queue[position], entry);
                self.by_hash.remove(&replaced.hash());
                trace!(old = ?replaced.hash(), new = ?hash, "replaced pooled transaction");
            }
            Err(position) => queue.insert(position, entry),
        }

        self.by_hash.insert(hash, sender);
        Ok(transaction)
    }

    /// Whether the hash was recently observed (admitted or rejected).
    pub(crate) fn is_handled(&self, hash: &TxHash) -> bool {
        self.handled.contains_key(hash)
    }

    /// Number of remembered handled hashes.
    pub(crate) fn handled_len(&self) -> usize {
        self.handled.len()
    }

    /// Records that the peer has seen the hash.
    pub(crate) fn note_known_by(&mut self, peer: PeerId, hash: TxHash, now: u64) {
        let known = self.known_by_peer.entry(peer).or_default();
        if !known.iter().any(|(h, _)| *h == hash) {
            known.push((hash, now));
        }
    }

    /// Whether the peer is known to have seen the hash.
    pub(crate) fn is_known_by(&self, peer: &PeerId, hash: &TxHash) -> bool {
        self.known_by_peer
            .get(peer)
            .is_some_and(|known| known.iter().any(|(h, _)| h == hash))
    }

    /// Drops all bookkeeping for a departed peer.
    pub(crate) fn forget_peer(&mut self, peer: &PeerId) {
        self.known_by_peer.remove(peer);
    }

    /// Removes the entry with the given hash.
    pub(crate) fn remove_by_hash(&mut self, hash: &TxHash) -> Option<PoolEntry> {
        let sender = self.by_hash.remove(hash)?;
        let queue = self.by_sender.get_mut(&sender)?;
        let position = queue.iter().position(|entry| entry.hash() == *hash)?;
        let removed = queue.remove(position);
        if queue.is_empty() {
            self.by_sender.remove(&sender);
        }
        Some(removed)
    }

    /// Removes a mined `(sender, nonce)` entry. Removing the last entry of a sender drops the
    /// sender key itself.
    pub(crate) fn remove_mined(&mut self, sender: Address, nonce: u64) -> Option<PoolEntry> {
        let queue = self.by_sender.get_mut(&sender)?;
        let position =
            queue.binary_search_by_key(&nonce, |entry| entry.transaction.nonce()).ok()?;
        let removed = queue.remove(position);
        if queue.is_empty() {
            self.by_sender.remove(&sender);
        }
        self.by_hash.remove(&removed.hash());
        Some(removed)
    }

    /// The periodic sweep: drops pool entries past the storage limit, per-peer knowledge past
    /// the same limit and handled records past the handled limit.
    pub(crate) fn cleanup(&mut self, now: u64) {
        let pooled_limit = self.config.pooled_storage_time_limit.as_millis() as u64;
        let handled_limit = self.config.handled_cleanup_time_limit.as_millis() as u64;

        let stale: Vec<TxHash> = self
            .by_sender
            .values()
            .flatten()
            .filter(|entry| now.saturating_sub(entry.added_at) > pooled_limit)
            .map(PoolEntry::hash)
            .collect();
        for hash in stale {
            trace!(?hash, "dropping stale pooled transaction");
            self.remove_by_hash(&hash);
        }

        for known in self.known_by_peer.values_mut() {
            known.retain(|(_, seen_at)| now.saturating_sub(*seen_at) <= pooled_limit);
        }
        self.known_by_peer.retain(|_, known| !known.is_empty());

        self.handled.retain(|_, seen_at| now.saturating_sub(*seen_at) <= handled_limit);
    }

    /// Clears every table. Used by `close`.
    pub(crate) fn clear(&mut self) {
        self.by_sender.clear();
        self.by_hash.clear();
        self.handled.clear();
        self.known_by_peer.clear();
    }

    /// All pooled transactions ordered for block construction, see
    /// [`ordered_transactions`].
    pub(crate) fn ordered(&self, base_fee: u128) -> Vec<Arc<TransactionSigned>> {
        ordered_transactions(
            self.by_sender.iter().map(|(sender, queue)| (*sender, queue.as_slice())),
            base_fee,
        )
    }

    /// All pooled hashes.
    pub(crate) fn hashes(&self) -> Vec<TxHash> {
        self.by_hash.keys().copied().collect()
    }

    /// All pooled transactions, in no particular order.
    pub(crate) fn all(&self) -> Vec<Arc<TransactionSigned>> {
        self.by_sender
            .values()
            .flatten()
            .map(|entry| entry.transaction.clone())
            .collect()
    }
}
