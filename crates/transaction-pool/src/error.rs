//! Transaction pool errors.

use alloy_primitives::{Address, TxHash, U256};

/// Transaction pool result type.
pub type PoolResult<T> = Result<T, PoolError>;

/// All the ways the acceptance pipeline can reject a candidate transaction.
///
/// A rejection never aborts the pool; the error describes the rule that fired and is returned
/// to the submitter or logged on the peer path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The signature does not recover to a sender.
    #[error("invalid sender: signature recovery failed")]
    InvalidSender,
    /// The sender is at its per-account slot limit.
    #[error("sender {0} has reached the per-sender transaction limit")]
    PerSenderLimit(Address),
    /// The pool is at capacity.
    #[error("pool is full")]
    PoolFull,
    /// A transaction with this hash is already pooled.
    #[error("[{0:?}] already known")]
    AlreadyKnown(TxHash),
    /// The data field exceeds the configured limit.
    #[error("transaction data of {got} bytes exceeds the limit of {limit}")]
    OversizedData {
        /// The actual data length.
        got: usize,
        /// The configured limit.
        limit: usize,
    },
    /// The nonce is below the sender's account nonce.
    #[error("nonce too low: transaction has {tx}, state is at {state}")]
    NonceTooLow {
        /// The transaction's nonce.
        tx: u64,
        /// The sender's current account nonce.
        state: u64,
    },
    /// The sender cannot pay for the transaction up front.
    #[error("insufficient funds: upfront cost {cost} exceeds balance {balance}")]
    InsufficientFunds {
        /// The required upfront cost.
        cost: U256,
        /// The sender's balance.
        balance: U256,
    },
    /// The gas limit exceeds the current block gas limit.
    #[error("gas limit {got} exceeds the block gas limit {limit}")]
    ExceedsBlockGasLimit {
        /// The transaction's gas limit.
        got: u64,
        /// The current block gas limit.
        limit: u64,
    },
    /// The effective gas price is below the configured floor.
    #[error("effective gas price {effective} is below the minimum of {min}")]
    Underpriced {
        /// The transaction's effective price at the current base fee.
        effective: u128,
        /// The configured minimum.
        min: u128,
    },
    /// A same-nonce transaction exists and the newcomer does not out-price it enough.
    #[error("replacement gas too low")]
    ReplacementUnderpriced,
}
