//! The collaborators the pool needs injected.
//!
//! Everything the pool consults about the outside world comes in through these traits so tests
//! can supply fakes without touching global state.

use async_trait::async_trait;
use elc_primitives::{Account, Address};
use std::time::Instant;

/// Read-only state access for admission checks.
#[async_trait]
pub trait StateView: Send + Sync {
    /// Returns the account behind the address, `None` if it does not exist. This is a
    /// suspension point, the backing trie may be on disk.
    async fn account(&self, address: Address) -> Option<Account>;
}

/// Where the chain currently is, as far as admission is concerned.
pub trait ChainInfo: Send + Sync {
    /// The base fee of the next block.
    fn base_fee(&self) -> u128;
    /// The gas limit of the current block.
    fn block_gas_limit(&self) -> u64;
}

/// Monotonic time, injected so tests control expiry.
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since an arbitrary fixed point.
    fn now_ms(&self) -> u64;
}

/// The production clock.
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { started: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
