//! Call-gas forwarding rules.

use crate::schedule::Spec;
use alloy_primitives::U256;

/// The gas actually forwarded to a callee.
///
/// From Tangerine Whistle on ([EIP-150](https://eips.ethereum.org/EIPS/eip-150)) the caller
/// always retains a 64th: `min(requested, remaining - remaining / 64)`. Before that the
/// requested gas is taken at face value.
pub fn max_call_gas(requested: U256, remaining: U256, spec: &Spec) -> U256 {
    if spec.has_tangerine_call_rules() {
        let ceiling = remaining - remaining / U256::from(64);
        requested.min(ceiling)
    } else {
        requested
    }
}
