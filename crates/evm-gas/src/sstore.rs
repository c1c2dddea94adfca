//! SSTORE cost schedules. Which one applies is a hardfork decision, see
//! [`Spec::sstore_metering`](crate::Spec::sstore_metering).

use crate::schedule::Spec;
use alloy_primitives::{B256, U256};

/// The pre-Constantinople (and Petersburg) schedule: setting a zero slot costs `sstore_set`,
/// everything else `sstore_reset`.
pub(crate) fn legacy_sstore_gas(current: B256, new: B256, spec: &Spec) -> U256 {
    let schedule = spec.schedule();
    if current.is_zero() && !new.is_zero() {
        U256::from(schedule.sstore_set)
    } else {
        // this includes clearing a slot; the clearing refund is the interpreter's concern
        U256::from(schedule.sstore_reset)
    }
}

/// [EIP-1283](https://eips.ethereum.org/EIPS/eip-1283) net gas metering, Constantinople only.
pub(crate) fn eip1283_sstore_gas(current: B256, original: B256, new: B256, spec: &Spec) -> U256 {
    let schedule = spec.schedule();
    if current == new {
        // no-op
        return U256::from(schedule.net_sstore_noop)
    }
    if original == current {
        if original.is_zero() {
            return U256::from(schedule.sstore_set)
        }
        return U256::from(schedule.sstore_reset)
    }
    // dirty slot
    U256::from(schedule.net_sstore_noop)
}

/// [EIP-2200](https://eips.ethereum.org/EIPS/eip-2200) net gas metering, Istanbul and later.
///
/// Under EIP-2929 the no-op/dirty charge is the warm read and the clean reset is discounted by
/// the cold-sload fee; the cold fee itself is charged separately by the handler, after the
/// sentry check.
pub(crate) fn eip2200_sstore_gas(current: B256, original: B256, new: B256, spec: &Spec) -> U256 {
    let schedule = spec.schedule();
    let noop_gas = if spec.has_access_lists() {
        schedule.warm_storage_read
    } else {
        schedule.net_sstore_noop
    };

    if current == new {
        return U256::from(noop_gas)
    }
    if original == current {
        if original.is_zero() {
            return U256::from(schedule.sstore_set)
        }
        let reset = if spec.has_access_lists() {
            schedule.sstore_reset - schedule.cold_sload
        } else {
            schedule.sstore_reset
        };
        return U256::from(reset)
    }
    U256::from(noop_gas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use elc_primitives::Hardfork;

    fn b(v: u8) -> B256 {
        let mut out = B256::ZERO;
        out.0[31] = v;
        out
    }

    #[test]
    fn legacy_set_and_reset() {
        let spec = Spec::new(Hardfork::Byzantium);
        assert_eq!(legacy_sstore_gas(B256::ZERO, b(1), &spec), U256::from(20000));
        assert_eq!(legacy_sstore_gas(b(1), b(2), &spec), U256::from(5000));
        assert_eq!(legacy_sstore_gas(b(1), B256::ZERO, &spec), U256::from(5000));
        assert_eq!(legacy_sstore_gas(B256::ZERO, B256::ZERO, &spec), U256::from(5000));
    }

    #[test]
    fn eip1283_matrix() {
        let spec = Spec::new(Hardfork::Constantinople);
        // no-op
        assert_eq!(eip1283_sstore_gas(b(1), b(1), b(1), &spec), U256::from(200));
        // clean init
        assert_eq!(eip1283_sstore_gas(B256::ZERO, B256::ZERO, b(1), &spec), U256::from(20000));
        // clean reset
        assert_eq!(eip1283_sstore_gas(b(1), b(1), b(2), &spec), U256::from(5000));
        // dirty
        assert_eq!(eip1283_sstore_gas(b(2), b(1), b(3), &spec), U256::from(200));
    }

    #[test]
    fn eip2200_matrix_istanbul() {
        let spec = Spec::new(Hardfork::Istanbul);
        assert_eq!(eip2200_sstore_gas(b(1), b(1), b(1), &spec), U256::from(800));
        assert_eq!(eip2200_sstore_gas(B256::ZERO, B256::ZERO, b(1), &spec), U256::from(20000));
        assert_eq!(eip2200_sstore_gas(b(1), b(1), b(2), &spec), U256::from(5000));
        assert_eq!(eip2200_sstore_gas(b(2), b(1), b(3), &spec), U256::from(800));
    }

    #[test]
    fn eip2200_matrix_berlin() {
        let spec = Spec::new(Hardfork::Berlin);
        // warm read replaces the no-op/dirty charge
        assert_eq!(eip2200_sstore_gas(b(1), b(1), b(1), &spec), U256::from(100));
        assert_eq!(eip2200_sstore_gas(b(2), b(1), b(3), &spec), U256::from(100));
        // clean reset is discounted by the cold sload fee
        assert_eq!(eip2200_sstore_gas(b(1), b(1), b(2), &spec), U256::from(2900));
        // init unchanged
        assert_eq!(eip2200_sstore_gas(B256::ZERO, B256::ZERO, b(1), &spec), U256::from(20000));
    }
}
