use crate::TransactionSigned;
use alloy_primitives::{BlockHash, BlockNumber};

/// The parts of a block the pool cares about: identity, gas parameters and the included
/// transactions.
///
/// Sync drivers produce these; full headers and bodies live outside this core.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    /// Block hash.
    pub hash: BlockHash,
    /// Block number.
    pub number: BlockNumber,
    /// Block gas limit.
    pub gas_limit: u64,
    /// The base fee of the block, `None` pre-london.
    pub base_fee_per_gas: Option<u128>,
    /// Transactions included in the block.
    pub transactions: Vec<TransactionSigned>,
}
