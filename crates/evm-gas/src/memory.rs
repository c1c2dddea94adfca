//! Memory expansion accounting.

use crate::{
    error::{GasResult, InstructionTrap},
    host::Host,
    runstate::RunState,
    schedule::Spec,
};
use alloy_primitives::U256;

const WORD: u64 = 32;

/// `memCost(w) = memory * w + w² / quad_coeff_div` for a word count `w`.
///
/// Monotone non-decreasing in `w`; the quadratic term is what makes large frames prohibitive.
pub fn memory_cost(words: U256, spec: &Spec) -> GasResult<U256> {
    let schedule = spec.schedule();
    let linear =
        words.checked_mul(U256::from(schedule.memory)).ok_or(InstructionTrap::OutOfGas)?;
    let quadratic = words.checked_mul(words).ok_or(InstructionTrap::OutOfGas)? /
        U256::from(schedule.quad_coeff_div);
    linear.checked_add(quadratic).ok_or(InstructionTrap::OutOfGas)
}

/// Charges the memory expansion for an access of `length` bytes at `offset` and updates the
/// frame's word count. Zero-length accesses never expand.
///
/// Returns the expansion delta, `memCost(new) - memCost(old)`.
pub fn sub_mem_usage<H: Host + ?Sized>(
    state: &mut RunState<'_, H>,
    offset: U256,
    length: U256,
    spec: &Spec,
) -> GasResult<U256> {
    if length.is_zero() {
        return Ok(U256::ZERO)
    }

    let end = offset.checked_add(length).ok_or(InstructionTrap::OutOfGas)?;
    let new_words = end
        .checked_add(U256::from(WORD - 1))
        .ok_or(InstructionTrap::OutOfGas)? /
        U256::from(WORD);

    // a frame that cannot index its memory with a u64 can never pay for it either
    let new_words_u64 = u64::try_from(new_words).map_err(|_| InstructionTrap::OutOfGas)?;
    if new_words_u64 <= state.memory_words {
        return Ok(U256::ZERO)
    }

    let cost = memory_cost(new_words, spec)?
        .checked_sub(memory_cost(U256::from(state.memory_words), spec)?)
        .ok_or(InstructionTrap::OutOfGas)?;
    state.memory_words = new_words_u64;
    Ok(cost)
}

/// The per-word copy fee for the *COPY family, `ceil(length / 32) * copy_word`, zero for
/// zero-length copies.
pub fn copy_fee(length: U256, spec: &Spec) -> GasResult<U256> {
    word_fee(length, spec.schedule().copy_word)
}

/// The per-word hashing fee for SHA3 and the CREATE2 init-code hash.
pub fn sha3_word_fee(length: U256, spec: &Spec) -> GasResult<U256> {
    word_fee(length, spec.schedule().sha3_word)
}

fn word_fee(length: U256, fee: u64) -> GasResult<U256> {
    if length.is_zero() {
        return Ok(U256::ZERO)
    }
    let words = length
        .checked_add(U256::from(WORD - 1))
        .ok_or(InstructionTrap::OutOfGas)? /
        U256::from(WORD);
    words.checked_mul(U256::from(fee)).ok_or(InstructionTrap::OutOfGas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use elc_primitives::Hardfork;

    #[test]
    fn quadratic_points() {
        let spec = Spec::new(Hardfork::London);
        assert_eq!(memory_cost(U256::ZERO, &spec).unwrap(), U256::ZERO);
        assert_eq!(memory_cost(U256::from(1), &spec).unwrap(), U256::from(3));
        // 3 * 32 + 32² / 512 = 96 + 2
        assert_eq!(memory_cost(U256::from(32), &spec).unwrap(), U256::from(98));
        // 3 * 1024 + 1024² / 512 = 3072 + 2048
        assert_eq!(memory_cost(U256::from(1024), &spec).unwrap(), U256::from(5120));
    }

    #[test]
    fn monotone_in_word_count() {
        let spec = Spec::new(Hardfork::London);
        let mut prev = U256::ZERO;
        for w in 0u64..4096 {
            let cost = memory_cost(U256::from(w), &spec).unwrap();
            assert!(cost >= prev);
            prev = cost;
        }
    }

    #[test]
    fn copy_fee_rounds_up() {
        let spec = Spec::new(Hardfork::London);
        assert_eq!(copy_fee(U256::ZERO, &spec).unwrap(), U256::ZERO);
        assert_eq!(copy_fee(U256::from(1), &spec).unwrap(), U256::from(3));
        assert_eq!(copy_fee(U256::from(32), &spec).unwrap(), U256::from(3));
        assert_eq!(copy_fee(U256::from(33), &spec).unwrap(), U256::from(6));
    }
}
