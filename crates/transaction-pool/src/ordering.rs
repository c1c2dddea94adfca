//! Deterministic ordering of pooled transactions for block construction.

use crate::pool::PoolEntry;
use alloy_primitives::Address;
use elc_primitives::TransactionSigned;
use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

/// The head of one sender's queue, scored by effective price at the given base fee.
struct HeadCandidate<'a> {
    price: u128,
    sender: Address,
    queue: &'a [PoolEntry],
    index: usize,
}

impl PartialEq for HeadCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeadCandidate<'_> {}

impl PartialOrd for HeadCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeadCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap on price; equal prices resolve to the lower sender address so the sequence
        // is deterministic
        self.price.cmp(&other.price).then_with(|| other.sender.cmp(&self.sender))
    }
}

/// Flattens per-sender nonce-ordered queues into one sequence: always the highest effective
/// price first, per-sender nonce order preserved, price ties broken by ascending sender
/// address.
pub(crate) fn ordered_transactions<'a>(
    senders: impl Iterator<Item = (Address, &'a [PoolEntry])>,
    base_fee: u128,
) -> Vec<Arc<TransactionSigned>> {
    let mut heap = BinaryHeap::new();
    let mut total = 0;
    for (sender, queue) in senders {
        total += queue.len();
        if let Some(head) = queue.first() {
            heap.push(HeadCandidate {
                price: head.transaction.effective_gas_price(base_fee),
                sender,
                queue,
                index: 0,
            });
        }
    }

    let mut ordered = Vec::with_capacity(total);
    while let Some(candidate) = heap.pop() {
        ordered.push(candidate.queue[candidate.index].transaction.clone());
        let next = candidate.index + 1;
        if let Some(entry) = candidate.queue.get(next) {
            heap.push(HeadCandidate {
                price: entry.transaction.effective_gas_price(base_fee),
                sender: candidate.sender,
                queue: candidate.queue,
                index: next,
            });
        }
    }
    ordered
}
