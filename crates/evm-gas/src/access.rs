//! The per-message warm address and storage sets of
//! [EIP-2929](https://eips.ethereum.org/EIPS/eip-2929).

use alloy_primitives::{Address, B256};
use elc_primitives::AccessList;
use std::collections::{HashMap, HashSet};

/// Journaled warm-access sets.
///
/// First touches are recorded in a journal so a reverting sub-call can undo its warming. The
/// sets are per EVM message and shared down the call tree through checkpoints.
#[derive(Debug, Default)]
pub struct AccessSets {
    addresses: HashSet<Address>,
    storage: HashMap<Address, HashSet<B256>>,
    journal: Vec<JournalEntry>,
}

#[derive(Debug, Clone, Copy)]
enum JournalEntry {
    Address(Address),
    Slot(Address, B256),
}

/// A point in the journal a sub-call can be reverted to.
#[derive(Debug, Clone, Copy)]
pub struct AccessCheckpoint(usize);

impl AccessSets {
    /// Creates empty sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates sets pre-warmed with the transaction's access list and the given always-warm
    /// addresses (origin, target, precompiles).
    pub fn prewarmed(
        access_list: &AccessList,
        warm_addresses: impl IntoIterator<Item = Address>,
    ) -> Self {
        let mut sets = Self::default();
        for address in warm_addresses {
            sets.addresses.insert(address);
        }
        for (address, keys) in access_list.iter() {
            sets.addresses.insert(address);
            sets.storage.entry(address).or_default().extend(keys.iter().copied());
        }
        // pre-warmed entries are part of the transaction environment and never revert
        sets.journal.clear();
        sets
    }

    /// Touches an address, returning `true` if it was cold.
    pub fn touch_address(&mut self, address: Address) -> bool {
        let cold = self.addresses.insert(address);
        if cold {
            self.journal.push(JournalEntry::Address(address));
        }
        cold
    }

    /// Touches a storage slot, returning `true` if it was cold.
    pub fn touch_slot(&mut self, address: Address, key: B256) -> bool {
        let cold = self.storage.entry(address).or_default().insert(key);
        if cold {
            self.journal.push(JournalEntry::Slot(address, key));
        }
        cold
    }

    /// Whether the address is warm.
    pub fn is_warm_address(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    /// Whether the slot is warm.
    pub fn is_warm_slot(&self, address: &Address, key: &B256) -> bool {
        self.storage.get(address).is_some_and(|keys| keys.contains(key))
    }

    /// Marks the current journal position. Touches after this point can be reverted.
    pub fn checkpoint(&self) -> AccessCheckpoint {
        AccessCheckpoint(self.journal.len())
    }

    /// Reverts all touches recorded after the checkpoint. Used when a sub-call reverts.
    pub fn revert(&mut self, checkpoint: AccessCheckpoint) {
        while self.journal.len() > checkpoint.0 {
            match self.journal.pop().expect("journal length was just checked") {
                JournalEntry::Address(address) => {
                    self.addresses.remove(&address);
                }
                JournalEntry::Slot(address, key) => {
                    if let Some(keys) = self.storage.get_mut(&address) {
                        keys.remove(&key);
                        if keys.is_empty() {
                            self.storage.remove(&address);
                        }
                    }
                }
            }
        }
    }

    /// Accepts all touches recorded after the checkpoint. Used when a sub-call returns
    /// successfully; the entries stay warm but can no longer be reverted past this point by the
    /// caller's own checkpoint, so nothing needs to move.
    pub fn commit(&mut self, _checkpoint: AccessCheckpoint) {}
}
