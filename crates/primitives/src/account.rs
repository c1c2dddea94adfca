use alloy_primitives::{B256, U256};

/// An Ethereum account as seen by the transaction pool and the gas layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Account {
    /// Account nonce.
    pub nonce: u64,
    /// Account balance.
    pub balance: U256,
    /// Hash of the account's bytecode, `None` for non-contract accounts.
    pub bytecode_hash: Option<B256>,
}

impl Account {
    /// Whether the account is empty per [EIP-161](https://eips.ethereum.org/EIPS/eip-161):
    /// no nonce, no balance, no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.bytecode_hash.is_none()
    }
}
