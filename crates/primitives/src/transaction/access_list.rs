use alloy_primitives::{Address, B256};
use alloy_rlp::{RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper};

/// A list of addresses and storage keys that the transaction plans to access.
///
/// Accesses outside the list are possible, but become more expensive
/// ([EIP-2930](https://eips.ethereum.org/EIPS/eip-2930)).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, RlpEncodable, RlpDecodable)]
pub struct AccessListItem {
    /// Account address that would be loaded at the start of execution
    pub address: Address,
    /// The storage keys to be loaded at the start of execution.
    ///
    /// Each key is a 32-byte value of the storage slot.
    pub storage_keys: Vec<B256>,
}

/// AccessList as defined in EIP-2930
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct AccessList(pub Vec<AccessListItem>);

impl AccessList {
    /// Returns an iterator over the list's addresses and storage keys.
    pub fn iter(&self) -> impl Iterator<Item = (Address, &[B256])> + '_ {
        self.0.iter().map(|item| (item.address, item.storage_keys.as_slice()))
    }

    /// Returns true if the access list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<AccessListItem>> for AccessList {
    fn from(list: Vec<AccessListItem>) -> Self {
        Self(list)
    }
}
