//! End-to-end pool behavior against injected fakes: announcement handling, gossip fan-out,
//! lifecycle and cleanup.

use async_trait::async_trait;
use elc_eth_wire::EthVersion;
use elc_peers::{EthPeer, PeerError, PeerPool};
use elc_primitives::{
    Account, Address, Block, PeerId, Transaction, TransactionKind, TransactionSigned, TxEip1559,
    TxHash, B256, U256,
};
use elc_transaction_pool::{ChainInfo, Clock, Pool, PoolConfig, PoolError, StateView};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

#[derive(Default)]
struct MockState {
    accounts: Mutex<HashMap<Address, Account>>,
}

impl MockState {
    fn fund(&self, address: Address) {
        self.accounts.lock().insert(
            address,
            Account { nonce: 0, balance: U256::MAX, bytecode_hash: None },
        );
    }
}

#[async_trait]
impl StateView for Arc<MockState> {
    async fn account(&self, address: Address) -> Option<Account> {
        self.accounts.lock().get(&address).copied()
    }
}

struct MockChain;

impl ChainInfo for MockChain {
    fn base_fee(&self) -> u128 {
        7
    }
    fn block_gas_limit(&self) -> u64 {
        30_000_000
    }
}

#[derive(Default)]
struct MockClock(AtomicU64);

impl MockClock {
    fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for Arc<MockClock> {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// A peer that serves a fixed set of transactions and records what it was asked and told.
struct MockPeer {
    id: PeerId,
    served: HashMap<TxHash, TransactionSigned>,
    requests: Mutex<Vec<Vec<TxHash>>>,
    announced_to: Mutex<Vec<Vec<TxHash>>>,
}

impl MockPeer {
    fn new(id_byte: u8, txs: impl IntoIterator<Item = TransactionSigned>) -> Arc<Self> {
        Arc::new(Self {
            id: PeerId::repeat_byte(id_byte),
            served: txs.into_iter().map(|tx| (tx.hash(), tx)).collect(),
            requests: Mutex::new(Vec::new()),
            announced_to: Mutex::new(Vec::new()),
        })
    }

    fn request_batches(&self) -> Vec<usize> {
        self.requests.lock().iter().map(Vec::len).collect()
    }

    fn hashes_announced(&self) -> Vec<TxHash> {
        self.announced_to.lock().iter().flatten().copied().collect()
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
        Ok(())
    }
    async fn announce_hashes(&self, hashes: Vec<TxHash>) -> Result<(), PeerError> {
        self.announced_to.lock().push(hashes);
        Ok(())
    }
    async fn get_pooled_transactions(
        &self,
        hashes: Vec<TxHash>,
    ) -> Result<Vec<TransactionSigned>, PeerError> {
        self.requests.lock().push(hashes.clone());
        Ok(hashes.iter().filter_map(|hash| self.served.get(hash).cloned()).collect())
    }
}

fn signed_tx(secret_byte: u8, nonce: u64, max_fee: u128) -> TransactionSigned {
    let secret = B256::repeat_byte(secret_byte);
    Transaction::Eip1559(TxEip1559 {
        chain_id: 1,
        nonce,
        gas_limit: 21_000,
        max_fee_per_gas: max_fee,
        max_priority_fee_per_gas: max_fee / 2,
        to: TransactionKind::Call(Address::repeat_byte(0xaa)),
        value: U256::from(1),
        ..Default::default()
    })
    .into_signed(secret)
    .expect("valid test key")
}

struct Harness {
    pool: Pool<Arc<MockState>, Arc<MockClock>>,
    state: Arc<MockState>,
    clock: Arc<MockClock>,
    peers: Arc<PeerPool>,
}

fn harness(config: PoolConfig) -> Harness {
    let state = Arc::new(MockState::default());
    let clock = Arc::new(MockClock::default());
    let pool = Pool::new(config, state.clone(), Arc::new(MockChain), clock.clone());
    let peers = Arc::new(PeerPool::new());
    peers.open();
    Harness { pool, state, clock, peers }
}

fn fund_sender(harness: &Harness, secret_byte: u8) {
    let secret = B256::repeat_byte(secret_byte);
    let signer = {
        let key = secp256k1::SecretKey::from_slice(secret.as_ref()).unwrap();
        elc_primitives::public_key_to_address(key.public_key(secp256k1::SECP256K1))
    };
    harness.state.fund(signer);
}

#[tokio::test]
async fn lifecycle() {
    let h = harness(PoolConfig::default());

    assert!(h.pool.open());
    assert!(!h.pool.open());

    h.pool.start(h.peers.clone());
    assert!(h.pool.stop());
    assert!(!h.pool.stop());

    fund_sender(&h, 0x01);
    h.pool.add_transaction(signed_tx(0x01, 0, 1000)).await.unwrap();
    assert_eq!(h.pool.len().await, 1);

    h.pool.close().await;
    assert!(!h.pool.is_open());
    assert_eq!(h.pool.len().await, 0);
}

#[tokio::test]
async fn announced_hashes_are_fetched_admitted_and_fanned_out() {
    let h = harness(PoolConfig::default());
    h.pool.open();
    fund_sender(&h, 0x01);

    let txs: Vec<TransactionSigned> =
        (0..3).map(|nonce| signed_tx(0x01, nonce, 1000)).collect();
    let hashes: Vec<TxHash> = txs.iter().map(|tx| tx.hash()).collect();

    let source = MockPeer::new(0x01, txs);
    let other = MockPeer::new(0x02, Vec::new());
    h.peers.add(source.clone());
    h.peers.add(other.clone());

    let added =
        h.pool.handle_announced_hashes(hashes.clone(), source.as_ref(), &h.peers).await;
    assert_eq!(added.len(), 3);
    assert_eq!(h.pool.len().await, 3);

    // the retrieval went to the announcing peer
    assert_eq!(source.request_batches(), vec![3]);
    // the additions were re-announced to the other peer only
    assert_eq!(other.hashes_announced(), hashes);
    assert!(source.hashes_announced().is_empty());

    // re-running the same announcement is a no-op: nothing new is requested or admitted
    let handled_before = h.pool.handled_len().await;
    let added =
        h.pool.handle_announced_hashes(hashes.clone(), source.as_ref(), &h.peers).await;
    assert!(added.is_empty());
    assert_eq!(h.pool.len().await, 3);
    assert_eq!(h.pool.handled_len().await, handled_before);
    assert_eq!(source.request_batches(), vec![3]);
}

#[tokio::test]
async fn retrieval_requests_are_batched() {
    let config = PoolConfig { tx_retrieval_limit: 2, ..Default::default() };
    let h = harness(config);
    h.pool.open();
    fund_sender(&h, 0x01);

    let txs: Vec<TransactionSigned> =
        (0..5).map(|nonce| signed_tx(0x01, nonce, 1000)).collect();
    let hashes: Vec<TxHash> = txs.iter().map(|tx| tx.hash()).collect();

    let source = MockPeer::new(0x01, txs);
    h.peers.add(source.clone());

    let added = h.pool.handle_announced_hashes(hashes, source.as_ref(), &h.peers).await;
    assert_eq!(added.len(), 5);
    assert_eq!(source.request_batches(), vec![2, 2, 1]);
}

#[tokio::test]
async fn replacement_by_fee_over_the_facade() {
    let h = harness(PoolConfig::default());
    h.pool.open();
    fund_sender(&h, 0x01);

    let base = 1_000_000_000u128;
    h.pool.add_transaction(signed_tx(0x01, 0, base)).await.unwrap();

    let res = h.pool.add_transaction(signed_tx(0x01, 0, base + base * 9 / 100)).await;
    assert_eq!(res.unwrap_err(), PoolError::ReplacementUnderpriced);

    h.pool.add_transaction(signed_tx(0x01, 0, base + base * 10 / 100)).await.unwrap();
    assert_eq!(h.pool.len().await, 1);
}

#[tokio::test]
async fn unfunded_sender_is_rejected() {
    let h = harness(PoolConfig::default());
    h.pool.open();

    let res = h.pool.add_transaction(signed_tx(0x02, 0, 1000)).await;
    assert!(matches!(res, Err(PoolError::InsufficientFunds { .. })));
}

#[tokio::test]
async fn block_reconciliation() {
    let h = harness(PoolConfig::default());
    h.pool.open();
    fund_sender(&h, 0x01);

    let tx0 = signed_tx(0x01, 0, 1000);
    let tx1 = signed_tx(0x01, 1, 1000);
    h.pool.add_transaction(tx0.clone()).await.unwrap();
    h.pool.add_transaction(tx1.clone()).await.unwrap();

    let block = Block { transactions: vec![tx0], ..Default::default() };
    h.pool.remove_new_block_txs(&[block]).await;
    assert_eq!(h.pool.len().await, 1);
    assert!(h.pool.contains(&tx1.hash()).await);

    let block = Block { transactions: vec![tx1.clone()], ..Default::default() };
    h.pool.remove_new_block_txs(&[block]).await;
    assert!(h.pool.is_empty().await);
}

#[tokio::test]
async fn cleanup_uses_injected_clock() {
    let h = harness(PoolConfig::default());
    h.pool.open();
    fund_sender(&h, 0x01);

    h.pool.add_transaction(signed_tx(0x01, 0, 1000)).await.unwrap();
    assert_eq!(h.pool.len().await, 1);

    let limit = h.pool.config().pooled_storage_time_limit.as_millis() as u64;
    h.clock.advance(limit + 1);
    h.pool.cleanup().await;
    assert!(h.pool.is_empty().await);
}

#[tokio::test]
async fn ordered_transactions_prefer_highest_effective_price() {
    let h = harness(PoolConfig::default());
    h.pool.open();
    fund_sender(&h, 0x01);
    fund_sender(&h, 0x02);

    h.pool.add_transaction(signed_tx(0x01, 0, 2_000)).await.unwrap();
    h.pool.add_transaction(signed_tx(0x02, 0, 4_000)).await.unwrap();

    let ordered = h.pool.ordered_transactions(7).await;
    let fees: Vec<u128> = ordered.iter().map(|tx| tx.max_fee_per_gas()).collect();
    assert_eq!(fees, vec![4_000, 2_000]);
}
