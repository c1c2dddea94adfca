//! The state capability the gas layer consults.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

/// Read access to accounts and storage, as needed by the storage-consulting opcodes.
///
/// Every method is a suspension point; implementations typically sit on a state trie. The gas
/// layer borrows the host per message and never writes through it.
#[async_trait]
pub trait Host: Send {
    /// Balance of the given account.
    async fn balance(&mut self, address: Address) -> U256;

    /// Whether the account exists at all (pre [EIP-161](https://eips.ethereum.org/EIPS/eip-161)
    /// semantics).
    async fn account_exists(&mut self, address: Address) -> bool;

    /// Whether the account is empty per EIP-161: zero nonce, zero balance, no code.
    async fn is_empty_account(&mut self, address: Address) -> bool;

    /// The current value of a storage slot. A never-written slot reads as 32 zero bytes.
    async fn storage(&mut self, address: Address, key: B256) -> B256;

    /// The value of a storage slot at the start of the current transaction.
    async fn original_storage(&mut self, address: Address, key: B256) -> B256;
}
