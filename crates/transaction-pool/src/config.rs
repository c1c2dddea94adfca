use std::time::Duration;

/// Hard cap on the number of transactions in the pool.
pub const POOL_MAX_SIZE: usize = 5000;

/// Maximum number of pooled transactions from a single sender.
pub const MAX_PER_SENDER: usize = 100;

/// Maximum number of hashes requested from a peer in a single `GetPooledTransactions`.
pub const TX_RETRIEVAL_LIMIT: usize = 256;

/// Maximum size of a transaction's data field.
pub const MAX_DATA_BYTES: usize = 128 * 1024;

/// A replacement transaction must price at least this many percent above the replaced one.
pub const REPLACEMENT_BUMP_PERCENT: u128 = 10;

/// How long a pool entry may sit unincluded before the cleanup sweep drops it.
pub const POOLED_STORAGE_TIME_LIMIT: Duration = Duration::from_secs(20 * 60);

/// How long a handled hash is remembered to suppress re-announcement loops.
pub const HANDLED_CLEANUP_TIME_LIMIT: Duration = Duration::from_secs(60 * 60);

/// Configuration options for the transaction pool.
///
/// The limits are exposed read-only through the pool so tests and operators can assert against
/// the values actually in force.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Max number of transactions in the pool.
    pub max_pool_size: usize,
    /// Max number of transactions per sender.
    pub max_per_sender: usize,
    /// Max number of hashes per retrieval request.
    pub tx_retrieval_limit: usize,
    /// Max size of a transaction's data field in bytes.
    pub max_data_bytes: usize,
    /// Required price bump, in percent, for replace-by-fee.
    pub replacement_bump_percent: u128,
    /// Minimum effective gas price for admission.
    pub min_gas_price: u128,
    /// Lifetime of an unincluded pool entry.
    pub pooled_storage_time_limit: Duration,
    /// Lifetime of a handled-hash record.
    pub handled_cleanup_time_limit: Duration,
    /// Period of the cleanup sweep armed by `start`.
    pub cleanup_interval: Duration,
    /// Period of the re-announcement sweep armed by `start`.
    pub reannounce_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_pool_size: POOL_MAX_SIZE,
            max_per_sender: MAX_PER_SENDER,
            tx_retrieval_limit: TX_RETRIEVAL_LIMIT,
            max_data_bytes: MAX_DATA_BYTES,
            replacement_bump_percent: REPLACEMENT_BUMP_PERCENT,
            min_gas_price: 100,
            pooled_storage_time_limit: POOLED_STORAGE_TIME_LIMIT,
            handled_cleanup_time_limit: HANDLED_CLEANUP_TIME_LIMIT,
            cleanup_interval: Duration::from_secs(60),
            reannounce_interval: Duration::from_secs(60),
        }
    }
}
