//! The per-opcode dynamic gas handlers and their dispatch table.
//!
//! The table is a fixed 256-entry array indexed by opcode. Handlers that never consult state
//! are `Sync`; the storage-consulting ones are `Async` and suspend on the [`Host`]. The
//! interpreter charges the static base cost itself and passes it in as `base_gas`; handlers
//! return the total charge for the instruction.

use crate::{
    call::max_call_gas,
    error::{GasResult, InstructionTrap},
    host::Host,
    memory::{copy_fee, sha3_word_fee, sub_mem_usage},
    runstate::RunState,
    schedule::{Spec, SstoreMetering},
    sstore::{eip1283_sstore_gas, eip2200_sstore_gas, legacy_sstore_gas},
};
use alloy_primitives::{Address, B256, U256};

/// The opcodes with a dynamic gas component.
pub mod opcode {
    #![allow(missing_docs)]
    pub const SHA3: u8 = 0x20;
    pub const BALANCE: u8 = 0x31;
    pub const CALLDATACOPY: u8 = 0x37;
    pub const CODECOPY: u8 = 0x39;
    pub const EXTCODESIZE: u8 = 0x3b;
    pub const EXTCODECOPY: u8 = 0x3c;
    pub const RETURNDATACOPY: u8 = 0x3e;
    pub const EXTCODEHASH: u8 = 0x3f;
    pub const MLOAD: u8 = 0x51;
    pub const MSTORE: u8 = 0x52;
    pub const MSTORE8: u8 = 0x53;
    pub const SLOAD: u8 = 0x54;
    pub const SSTORE: u8 = 0x55;
    pub const LOG0: u8 = 0xa0;
    pub const LOG1: u8 = 0xa1;
    pub const LOG2: u8 = 0xa2;
    pub const LOG3: u8 = 0xa3;
    pub const LOG4: u8 = 0xa4;
    pub const CREATE: u8 = 0xf0;
    pub const CALL: u8 = 0xf1;
    pub const CALLCODE: u8 = 0xf2;
    pub const RETURN: u8 = 0xf3;
    pub const DELEGATECALL: u8 = 0xf4;
    pub const CREATE2: u8 = 0xf5;
    pub const AUTH: u8 = 0xf6;
    pub const AUTHCALL: u8 = 0xf7;
    pub const STATICCALL: u8 = 0xfa;
    pub const REVERT: u8 = 0xfd;
    pub const SELFDESTRUCT: u8 = 0xff;
}

/// A dynamic gas handler, or the absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// The opcode has no dynamic component; `base_gas` passes through.
    None,
    /// A handler that never suspends.
    Sync(SyncOp),
    /// A handler that consults the [`Host`].
    Async(AsyncOp),
}

/// The synchronous handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SyncOp {
    Sha3,
    CallDataCopy,
    CodeCopy,
    ReturnDataCopy,
    MLoad,
    MStore,
    MStore8,
    Log(u8),
    Create,
    Create2,
    Auth,
    Return,
    Revert,
}

/// The handlers that suspend on state lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AsyncOp {
    Balance,
    ExtCodeSize,
    ExtCodeCopy,
    ExtCodeHash,
    SLoad,
    SStore,
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    AuthCall,
    SelfDestruct,
}

/// The dispatch table, indexed by opcode.
pub static GAS_HANDLERS: [Handler; 256] = {
    let mut table = [Handler::None; 256];
    table[opcode::SHA3 as usize] = Handler::Sync(SyncOp::Sha3);
    table[opcode::BALANCE as usize] = Handler::Async(AsyncOp::Balance);
    table[opcode::CALLDATACOPY as usize] = Handler::Sync(SyncOp::CallDataCopy);
    table[opcode::CODECOPY as usize] = Handler::Sync(SyncOp::CodeCopy);
    table[opcode::EXTCODESIZE as usize] = Handler::Async(AsyncOp::ExtCodeSize);
    table[opcode::EXTCODECOPY as usize] = Handler::Async(AsyncOp::ExtCodeCopy);
    table[opcode::RETURNDATACOPY as usize] = Handler::Sync(SyncOp::ReturnDataCopy);
    table[opcode::EXTCODEHASH as usize] = Handler::Async(AsyncOp::ExtCodeHash);
    table[opcode::MLOAD as usize] = Handler::Sync(SyncOp::MLoad);
    table[opcode::MSTORE as usize] = Handler::Sync(SyncOp::MStore);
    table[opcode::MSTORE8 as usize] = Handler::Sync(SyncOp::MStore8);
    table[opcode::SLOAD as usize] = Handler::Async(AsyncOp::SLoad);
    table[opcode::SSTORE as usize] = Handler::Async(AsyncOp::SStore);
    table[opcode::LOG0 as usize] = Handler::Sync(SyncOp::Log(0));
    table[opcode::LOG1 as usize] = Handler::Sync(SyncOp::Log(1));
    table[opcode::LOG2 as usize] = Handler::Sync(SyncOp::Log(2));
    table[opcode::LOG3 as usize] = Handler::Sync(SyncOp::Log(3));
    table[opcode::LOG4 as usize] = Handler::Sync(SyncOp::Log(4));
    table[opcode::CREATE as usize] = Handler::Sync(SyncOp::Create);
    table[opcode::CALL as usize] = Handler::Async(AsyncOp::Call);
    table[opcode::CALLCODE as usize] = Handler::Async(AsyncOp::CallCode);
    table[opcode::RETURN as usize] = Handler::Sync(SyncOp::Return);
    table[opcode::DELEGATECALL as usize] = Handler::Async(AsyncOp::DelegateCall);
    table[opcode::CREATE2 as usize] = Handler::Sync(SyncOp::Create2);
    table[opcode::AUTH as usize] = Handler::Sync(SyncOp::Auth);
    table[opcode::AUTHCALL as usize] = Handler::Async(AsyncOp::AuthCall);
    table[opcode::STATICCALL as usize] = Handler::Async(AsyncOp::StaticCall);
    table[opcode::REVERT as usize] = Handler::Sync(SyncOp::Revert);
    table[opcode::SELFDESTRUCT as usize] = Handler::Async(AsyncOp::SelfDestruct);
    table
};

/// Computes the total gas charge of `op`, given the already-determined static `base_gas`.
///
/// Opcodes without a dynamic component return `base_gas` unchanged.
pub async fn dynamic_gas<H: Host + ?Sized>(
    op: u8,
    state: &mut RunState<'_, H>,
    base_gas: U256,
    spec: &Spec,
) -> GasResult<U256> {
    match GAS_HANDLERS[op as usize] {
        Handler::None => Ok(base_gas),
        Handler::Sync(sync_op) => sync_gas(sync_op, state, base_gas, spec),
        Handler::Async(async_op) => async_gas(async_op, state, base_gas, spec).await,
    }
}

#[inline]
fn add(a: U256, b: U256) -> GasResult<U256> {
    a.checked_add(b).ok_or(InstructionTrap::OutOfGas)
}

#[inline]
fn to_address(word: U256) -> Address {
    Address::from_word(B256::from(word))
}

fn sync_gas<H: Host + ?Sized>(
    op: SyncOp,
    state: &mut RunState<'_, H>,
    base_gas: U256,
    spec: &Spec,
) -> GasResult<U256> {
    let mut gas = base_gas;
    match op {
        SyncOp::Sha3 => {
            let offset = state.stack.peek(0)?;
            let length = state.stack.peek(1)?;
            gas = add(gas, sub_mem_usage(state, offset, length, spec)?)?;
            gas = add(gas, sha3_word_fee(length, spec)?)?;
        }
        SyncOp::CallDataCopy | SyncOp::CodeCopy => {
            let mem_offset = state.stack.peek(0)?;
            let length = state.stack.peek(2)?;
            gas = add(gas, sub_mem_usage(state, mem_offset, length, spec)?)?;
            gas = add(gas, copy_fee(length, spec)?)?;
        }
        SyncOp::ReturnDataCopy => {
            let mem_offset = state.stack.peek(0)?;
            let data_offset = state.stack.peek(1)?;
            let length = state.stack.peek(2)?;

            // reading past the return data buffer is a hard trap, not merely expensive
            let end = data_offset.checked_add(length).ok_or(InstructionTrap::OutOfRange)?;
            if end > U256::from(state.return_data_len) {
                return Err(InstructionTrap::OutOfRange)
            }

            gas = add(gas, sub_mem_usage(state, mem_offset, length, spec)?)?;
            gas = add(gas, copy_fee(length, spec)?)?;
        }
        SyncOp::MLoad | SyncOp::MStore => {
            let offset = state.stack.peek(0)?;
            gas = add(gas, sub_mem_usage(state, offset, U256::from(32), spec)?)?;
        }
        SyncOp::MStore8 => {
            let offset = state.stack.peek(0)?;
            gas = add(gas, sub_mem_usage(state, offset, U256::from(1), spec)?)?;
        }
        SyncOp::Log(topics) => {
            if state.is_static {
                return Err(InstructionTrap::StaticStateChange)
            }
            let offset = state.stack.peek(0)?;
            let length = state.stack.peek(1)?;
            let schedule = spec.schedule();
            gas = add(gas, sub_mem_usage(state, offset, length, spec)?)?;
            gas = add(
                gas,
                U256::from(schedule.log_topic)
                    .checked_mul(U256::from(topics))
                    .ok_or(InstructionTrap::OutOfGas)?,
            )?;
            gas = add(
                gas,
                U256::from(schedule.log_data)
                    .checked_mul(length)
                    .ok_or(InstructionTrap::OutOfGas)?,
            )?;
        }
        SyncOp::Create => {
            if state.is_static {
                return Err(InstructionTrap::StaticStateChange)
            }
            let offset = state.stack.peek(1)?;
            let length = state.stack.peek(2)?;
            gas = add(gas, sub_mem_usage(state, offset, length, spec)?)?;
        }
        SyncOp::Create2 => {
            if state.is_static {
                return Err(InstructionTrap::StaticStateChange)
            }
            let offset = state.stack.peek(1)?;
            let length = state.stack.peek(2)?;
            gas = add(gas, sub_mem_usage(state, offset, length, spec)?)?;
            gas = add(gas, sha3_word_fee(length, spec)?)?;
        }
        SyncOp::Auth => {
            // [authority, memOffset, memLength]: the commitment is read from memory
            let offset = state.stack.peek(1)?;
            let length = state.stack.peek(2)?;
            gas = add(gas, sub_mem_usage(state, offset, length, spec)?)?;
        }
        SyncOp::Return | SyncOp::Revert => {
            let offset = state.stack.peek(0)?;
            let length = state.stack.peek(1)?;
            gas = add(gas, sub_mem_usage(state, offset, length, spec)?)?;
        }
    }
    Ok(gas)
}

async fn async_gas<H: Host + ?Sized>(
    op: AsyncOp,
    state: &mut RunState<'_, H>,
    base_gas: U256,
    spec: &Spec,
) -> GasResult<U256> {
    let mut gas = base_gas;
    match op {
        AsyncOp::Balance | AsyncOp::ExtCodeSize | AsyncOp::ExtCodeHash => {
            if spec.has_access_lists() {
                let address = to_address(state.stack.peek(0)?);
                gas = add(gas, account_access_gas(state, address, spec))?;
            }
        }
        AsyncOp::ExtCodeCopy => {
            let address = to_address(state.stack.peek(0)?);
            let mem_offset = state.stack.peek(1)?;
            let length = state.stack.peek(3)?;
            gas = add(gas, sub_mem_usage(state, mem_offset, length, spec)?)?;
            gas = add(gas, copy_fee(length, spec)?)?;
            if spec.has_access_lists() {
                gas = add(gas, account_access_gas(state, address, spec))?;
            }
        }
        AsyncOp::SLoad => {
            if spec.has_access_lists() {
                let key = B256::from(state.stack.peek(0)?);
                let schedule = spec.schedule();
                let fee = if state.access.touch_slot(state.address, key) {
                    schedule.cold_sload
                } else {
                    schedule.warm_storage_read
                };
                gas = add(gas, U256::from(fee))?;
            }
        }
        AsyncOp::SStore => {
            gas = sstore_gas(state, gas, spec).await?;
        }
        AsyncOp::Call |
        AsyncOp::CallCode |
        AsyncOp::DelegateCall |
        AsyncOp::StaticCall |
        AsyncOp::AuthCall => {
            gas = call_gas(op, state, gas, spec).await?;
        }
        AsyncOp::SelfDestruct => {
            if state.is_static {
                return Err(InstructionTrap::StaticStateChange)
            }
            let schedule = spec.schedule();
            let beneficiary = to_address(state.stack.peek(0)?);

            let charge_new_account = if spec.has_empty_account_semantics() {
                let balance = state.host.balance(state.address).await;
                !balance.is_zero() && state.host.is_empty_account(beneficiary).await
            } else if spec.has_tangerine_call_rules() {
                !state.host.account_exists(beneficiary).await
            } else {
                false
            };
            if charge_new_account {
                gas = add(gas, U256::from(schedule.call_new_account))?;
            }

            // EIP-2929: selfdestruct pays the cold fee but has no warm fee
            if spec.has_access_lists() && state.access.touch_address(beneficiary) {
                gas = add(gas, U256::from(schedule.cold_account_access))?;
            }
        }
    }
    Ok(gas)
}

fn account_access_gas<H: Host + ?Sized>(
    state: &mut RunState<'_, H>,
    address: Address,
    spec: &Spec,
) -> U256 {
    let schedule = spec.schedule();
    let fee = if state.access.touch_address(address) {
        schedule.cold_account_access
    } else {
        schedule.warm_storage_read
    };
    U256::from(fee)
}

async fn sstore_gas<H: Host + ?Sized>(
    state: &mut RunState<'_, H>,
    base_gas: U256,
    spec: &Spec,
) -> GasResult<U256> {
    if state.is_static {
        return Err(InstructionTrap::StaticStateChange)
    }

    let mut gas = base_gas;
    let key = B256::from(state.stack.peek(0)?);
    let new = B256::from(state.stack.peek(1)?);

    let current = state.host.storage(state.address, key).await;

    match spec.sstore_metering() {
        SstoreMetering::Legacy => {
            gas = add(gas, legacy_sstore_gas(current, new, spec))?;
        }
        SstoreMetering::Eip1283 => {
            let original = state.host.original_storage(state.address, key).await;
            gas = add(gas, eip1283_sstore_gas(current, original, new, spec))?;
        }
        SstoreMetering::Eip2200 => {
            // the sentry precedes everything else, the access-list fee included, so the 2300
            // gas floor is preserved
            if state.gas_left <= U256::from(spec.schedule().sstore_sentry) {
                return Err(InstructionTrap::OutOfGas)
            }
            let original = state.host.original_storage(state.address, key).await;
            gas = add(gas, eip2200_sstore_gas(current, original, new, spec))?;
        }
    }

    if spec.has_access_lists() && state.access.touch_slot(state.address, key) {
        gas = add(gas, U256::from(spec.schedule().cold_sload))?;
    }

    Ok(gas)
}

async fn call_gas<H: Host + ?Sized>(
    op: AsyncOp,
    state: &mut RunState<'_, H>,
    base_gas: U256,
    spec: &Spec,
) -> GasResult<U256> {
    let schedule = *spec.schedule();
    let mut gas = base_gas;

    let requested = state.stack.peek(0)?;
    let to = to_address(state.stack.peek(1)?);

    let (value, value_ext, in_offset_depth) = match op {
        AsyncOp::Call | AsyncOp::CallCode => (state.stack.peek(2)?, U256::ZERO, 3),
        AsyncOp::AuthCall => (state.stack.peek(2)?, state.stack.peek(3)?, 4),
        AsyncOp::DelegateCall | AsyncOp::StaticCall => (U256::ZERO, U256::ZERO, 2),
        _ => return Err(InstructionTrap::OutOfRange),
    };

    let in_offset = state.stack.peek(in_offset_depth)?;
    let in_length = state.stack.peek(in_offset_depth + 1)?;
    let out_offset = state.stack.peek(in_offset_depth + 2)?;
    let out_length = state.stack.peek(in_offset_depth + 3)?;

    gas = add(gas, sub_mem_usage(state, in_offset, in_length, spec)?)?;
    gas = add(gas, sub_mem_usage(state, out_offset, out_length, spec)?)?;

    if matches!(op, AsyncOp::AuthCall) {
        if state.auth.is_none() {
            return Err(InstructionTrap::AuthCallUnset)
        }
        if !value_ext.is_zero() {
            return Err(InstructionTrap::AuthCallNonzeroValueExt)
        }
    }

    if !value.is_zero() && state.is_static && matches!(op, AsyncOp::Call | AsyncOp::AuthCall) {
        return Err(InstructionTrap::StaticStateChange)
    }

    if spec.has_access_lists() {
        gas = add(gas, account_access_gas(state, to, spec))?;
    }

    if !value.is_zero() {
        gas = add(gas, U256::from(schedule.call_value_transfer))?;
    }

    // the new-account surcharge only applies to CALL; the other variants execute against an
    // existing account
    if matches!(op, AsyncOp::Call) {
        let charge = if spec.has_empty_account_semantics() {
            !value.is_zero() && state.host.is_empty_account(to).await
        } else {
            !state.host.account_exists(to).await
        };
        if charge {
            gas = add(gas, U256::from(schedule.call_new_account))?;
        }
    }

    // what is left after the dynamic part determines the forwarding ceiling
    let remaining = state.gas_left.checked_sub(gas).ok_or(InstructionTrap::OutOfGas)?;

    let forwarded = if matches!(op, AsyncOp::AuthCall) {
        // AUTHCALL takes the requested gas literally: zero means "everything forwardable",
        // anything above the ceiling is a hard failure
        let ceiling = remaining - remaining / U256::from(64);
        if requested.is_zero() {
            ceiling
        } else if requested <= ceiling {
            requested
        } else {
            return Err(InstructionTrap::OutOfGas)
        }
    } else {
        max_call_gas(requested, remaining, spec)
    };

    gas = add(gas, forwarded)?;

    // the stipend subsidizes the callee, it is never charged to the caller
    let mut message_gas = forwarded;
    if !value.is_zero() && matches!(op, AsyncOp::Call | AsyncOp::CallCode) {
        message_gas = message_gas
            .checked_add(U256::from(schedule.call_stipend))
            .ok_or(InstructionTrap::OutOfGas)?;
    }
    state.message_gas_limit = Some(message_gas);

    Ok(gas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessSets;
    use crate::stack::Stack;
    use async_trait::async_trait;
    use elc_primitives::Hardfork;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct MockHost {
        balances: HashMap<Address, U256>,
        exists: HashSet<Address>,
        empty: HashSet<Address>,
        storage: HashMap<(Address, B256), B256>,
        original: HashMap<(Address, B256), B256>,
    }

    #[async_trait]
    impl Host for MockHost {
        async fn balance(&mut self, address: Address) -> U256 {
            self.balances.get(&address).copied().unwrap_or_default()
        }
        async fn account_exists(&mut self, address: Address) -> bool {
            self.exists.contains(&address)
        }
        async fn is_empty_account(&mut self, address: Address) -> bool {
            self.empty.contains(&address)
        }
        async fn storage(&mut self, address: Address, key: B256) -> B256 {
            self.storage.get(&(address, key)).copied().unwrap_or_default()
        }
        async fn original_storage(&mut self, address: Address, key: B256) -> B256 {
            self.original.get(&(address, key)).copied().unwrap_or_default()
        }
    }

    struct Frame {
        stack: Stack,
        access: AccessSets,
        host: MockHost,
        gas_left: U256,
        is_static: bool,
        auth: Option<Address>,
        return_data_len: u64,
        memory_words: u64,
        message_gas_limit: Option<U256>,
    }

    impl Frame {
        fn new(stack_bottom_up: Vec<u64>) -> Self {
            Self {
                stack: Stack::from(
                    stack_bottom_up.into_iter().map(U256::from).collect::<Vec<_>>(),
                ),
                access: AccessSets::new(),
                host: MockHost::default(),
                gas_left: U256::from(1_000_000u64),
                is_static: false,
                auth: None,
                return_data_len: 0,
                memory_words: 0,
                message_gas_limit: None,
            }
        }

        async fn run(&mut self, op: u8, base: u64, spec: &Spec) -> GasResult<U256> {
            let mut state = RunState {
                address: Address::repeat_byte(0xee),
                stack: &mut self.stack,
                memory_words: self.memory_words,
                return_data_len: self.return_data_len,
                gas_left: self.gas_left,
                is_static: self.is_static,
                auth: self.auth,
                message_gas_limit: None,
                access: &mut self.access,
                host: &mut self.host,
            };
            let res = dynamic_gas(op, &mut state, U256::from(base), spec).await;
            self.memory_words = state.memory_words;
            self.message_gas_limit = state.message_gas_limit;
            res
        }
    }

    #[test]
    fn table_shape() {
        assert_eq!(GAS_HANDLERS[opcode::SHA3 as usize], Handler::Sync(SyncOp::Sha3));
        assert_eq!(GAS_HANDLERS[opcode::SSTORE as usize], Handler::Async(AsyncOp::SStore));
        assert_eq!(GAS_HANDLERS[opcode::LOG4 as usize], Handler::Sync(SyncOp::Log(4)));
        // ADD has no dynamic component
        assert_eq!(GAS_HANDLERS[0x01], Handler::None);
    }

    #[tokio::test]
    async fn unhandled_opcode_passes_base_through() {
        let spec = Spec::new(Hardfork::London);
        let mut frame = Frame::new(vec![]);
        assert_eq!(frame.run(0x01, 3, &spec).await.unwrap(), U256::from(3));
    }

    #[tokio::test]
    async fn sha3_charges_memory_and_words() {
        let spec = Spec::new(Hardfork::London);
        // stack (bottom up): length=64, offset=0
        let mut frame = Frame::new(vec![64, 0]);
        // 2 words of expansion (6) + 2 hashed words (12)
        assert_eq!(frame.run(opcode::SHA3, 30, &spec).await.unwrap(), U256::from(30 + 6 + 12));
    }

    #[tokio::test]
    async fn mload_expansion_is_charged_once() {
        let spec = Spec::new(Hardfork::London);
        let mut frame = Frame::new(vec![0]);
        assert_eq!(frame.run(opcode::MLOAD, 3, &spec).await.unwrap(), U256::from(3 + 3));
        // same offset again: memory is already that large
        assert_eq!(frame.run(opcode::MLOAD, 3, &spec).await.unwrap(), U256::from(3));
    }

    #[tokio::test]
    async fn balance_cold_then_warm() {
        let spec = Spec::new(Hardfork::Berlin);
        let mut frame = Frame::new(vec![0x99]);
        assert_eq!(frame.run(opcode::BALANCE, 0, &spec).await.unwrap(), U256::from(2600));
        assert_eq!(frame.run(opcode::BALANCE, 0, &spec).await.unwrap(), U256::from(100));
    }

    #[tokio::test]
    async fn balance_has_no_dynamic_part_pre_berlin() {
        let spec = Spec::new(Hardfork::Istanbul);
        let mut frame = Frame::new(vec![0x99]);
        assert_eq!(frame.run(opcode::BALANCE, 700, &spec).await.unwrap(), U256::from(700));
    }

    #[tokio::test]
    async fn sload_cold_then_warm() {
        let spec = Spec::new(Hardfork::Berlin);
        let mut frame = Frame::new(vec![0x01]);
        assert_eq!(frame.run(opcode::SLOAD, 0, &spec).await.unwrap(), U256::from(2100));
        assert_eq!(frame.run(opcode::SLOAD, 0, &spec).await.unwrap(), U256::from(100));
    }

    #[tokio::test]
    async fn access_revert_recools() {
        let spec = Spec::new(Hardfork::Berlin);
        let mut frame = Frame::new(vec![0x99]);
        assert_eq!(frame.run(opcode::BALANCE, 0, &spec).await.unwrap(), U256::from(2600));
        let checkpoint = frame.access.checkpoint();
        assert_eq!(frame.run(opcode::BALANCE, 0, &spec).await.unwrap(), U256::from(100));
        frame.access.revert(checkpoint);
        // warmed before the checkpoint, so it stays warm
        assert_eq!(frame.run(opcode::BALANCE, 0, &spec).await.unwrap(), U256::from(100));
    }

    #[tokio::test]
    async fn sstore_sentry_traps() {
        let spec = Spec::new(Hardfork::London);
        // stack: value=1, key=1
        let mut frame = Frame::new(vec![1, 1]);
        frame.gas_left = U256::from(2300);
        assert_eq!(
            frame.run(opcode::SSTORE, 0, &spec).await,
            Err(InstructionTrap::OutOfGas)
        );
    }

    #[tokio::test]
    async fn sstore_cold_fee_added_after_metering() {
        let spec = Spec::new(Hardfork::London);
        let address = Address::repeat_byte(0xee);
        let key = B256::from(U256::from(1u64));
        // clean reset: current == original == 2, new = 1
        let mut frame = Frame::new(vec![1, 1]);
        frame.host.storage.insert((address, key), B256::from(U256::from(2u64)));
        frame.host.original.insert((address, key), B256::from(U256::from(2u64)));

        // 2900 (discounted reset) + 2100 (cold slot)
        assert_eq!(frame.run(opcode::SSTORE, 0, &spec).await.unwrap(), U256::from(5000));
        // warm now: only the discounted reset
        assert_eq!(frame.run(opcode::SSTORE, 0, &spec).await.unwrap(), U256::from(2900));
    }

    #[tokio::test]
    async fn sstore_static_traps() {
        let spec = Spec::new(Hardfork::London);
        let mut frame = Frame::new(vec![1, 1]);
        frame.is_static = true;
        assert_eq!(
            frame.run(opcode::SSTORE, 0, &spec).await,
            Err(InstructionTrap::StaticStateChange)
        );
    }

    #[tokio::test]
    async fn log_charges_topics_and_data() {
        let spec = Spec::new(Hardfork::London);
        // stack (bottom up): length=10, offset=0
        let mut frame = Frame::new(vec![10, 0]);
        // 1 word of memory (3) + 2 topics (750) + 10 data bytes (80)
        assert_eq!(
            frame.run(opcode::LOG2, 375, &spec).await.unwrap(),
            U256::from(375 + 3 + 750 + 80)
        );
    }

    #[tokio::test]
    async fn log_in_static_traps() {
        let spec = Spec::new(Hardfork::London);
        let mut frame = Frame::new(vec![0, 0]);
        frame.is_static = true;
        assert_eq!(
            frame.run(opcode::LOG0, 375, &spec).await,
            Err(InstructionTrap::StaticStateChange)
        );
    }

    #[tokio::test]
    async fn returndatacopy_range_traps() {
        let spec = Spec::new(Hardfork::London);
        // stack (bottom up): length=32, dataOffset=1, memOffset=0
        let mut frame = Frame::new(vec![32, 1, 0]);
        frame.return_data_len = 32;
        assert_eq!(
            frame.run(opcode::RETURNDATACOPY, 3, &spec).await,
            Err(InstructionTrap::OutOfRange)
        );

        let mut frame = Frame::new(vec![32, 0, 0]);
        frame.return_data_len = 32;
        // 1 word expansion (3) + 1 word copied (3)
        assert_eq!(
            frame.run(opcode::RETURNDATACOPY, 3, &spec).await.unwrap(),
            U256::from(3 + 3 + 3)
        );
    }

    #[tokio::test]
    async fn call_forwards_63_64ths() {
        let spec = Spec::new(Hardfork::Berlin);
        // stack (bottom up): outLen, outOff, inLen, inOff, value, to, gas
        let mut frame = Frame::new(vec![0, 0, 0, 0, 0, 0x42, u64::MAX]);
        frame.gas_left = U256::from(6400);

        // cold account (2600), remaining 3800, forwarded 3800 - 59
        let total = frame.run(opcode::CALL, 0, &spec).await.unwrap();
        assert_eq!(total, U256::from(2600 + 3741));
        assert_eq!(frame.message_gas_limit, Some(U256::from(3741)));
    }

    #[tokio::test]
    async fn call_value_adds_stipend_to_callee_only() {
        let spec = Spec::new(Hardfork::Berlin);
        let to = 0x42u64;
        let mut frame = Frame::new(vec![0, 0, 0, 0, 1, to, 100]);
        frame.gas_left = U256::from(100_000);

        let total = frame.run(opcode::CALL, 0, &spec).await.unwrap();
        // cold (2600) + value transfer (9000) + forwarded (100)
        assert_eq!(total, U256::from(2600 + 9000 + 100));
        // the callee budget additionally gets the uncharged stipend
        assert_eq!(frame.message_gas_limit, Some(U256::from(100 + 2300)));
    }

    #[tokio::test]
    async fn call_new_account_surcharge_spurious_dragon() {
        let spec = Spec::new(Hardfork::Berlin);
        let to = Address::from_word(B256::from(U256::from(0x42u64)));
        let mut frame = Frame::new(vec![0, 0, 0, 0, 1, 0x42, 100]);
        frame.gas_left = U256::from(100_000);
        frame.host.empty.insert(to);

        let total = frame.run(opcode::CALL, 0, &spec).await.unwrap();
        assert_eq!(total, U256::from(2600 + 9000 + 25000 + 100));
    }

    #[tokio::test]
    async fn call_new_account_surcharge_pre_spurious() {
        let spec = Spec::new(Hardfork::Tangerine);
        // account does not exist, and pre-spurious the surcharge applies even without value
        let mut frame = Frame::new(vec![0, 0, 0, 0, 0, 0x42, 100]);
        frame.gas_left = U256::from(100_000);

        let total = frame.run(opcode::CALL, 0, &spec).await.unwrap();
        assert_eq!(total, U256::from(25000 + 100));
    }

    #[tokio::test]
    async fn value_call_in_static_traps() {
        let spec = Spec::new(Hardfork::Berlin);
        let mut frame = Frame::new(vec![0, 0, 0, 0, 1, 0x42, 100]);
        frame.is_static = true;
        assert_eq!(
            frame.run(opcode::CALL, 0, &spec).await,
            Err(InstructionTrap::StaticStateChange)
        );

        // without value the call is fine in a static frame
        let mut frame = Frame::new(vec![0, 0, 0, 0, 0, 0x42, 100]);
        frame.is_static = true;
        assert!(frame.run(opcode::CALL, 0, &spec).await.is_ok());
    }

    #[tokio::test]
    async fn authcall_requires_auth() {
        let spec = Spec::new(Hardfork::London);
        // stack (bottom up): outLen, outOff, inLen, inOff, valueExt, value, to, gas
        let mut frame = Frame::new(vec![0, 0, 0, 0, 0, 0, 0x42, 100]);
        assert_eq!(
            frame.run(opcode::AUTHCALL, 0, &spec).await,
            Err(InstructionTrap::AuthCallUnset)
        );
    }

    #[tokio::test]
    async fn authcall_rejects_value_ext() {
        let spec = Spec::new(Hardfork::London);
        let mut frame = Frame::new(vec![0, 0, 0, 0, 7, 0, 0x42, 100]);
        frame.auth = Some(Address::repeat_byte(0x01));
        assert_eq!(
            frame.run(opcode::AUTHCALL, 0, &spec).await,
            Err(InstructionTrap::AuthCallNonzeroValueExt)
        );
    }

    #[tokio::test]
    async fn authcall_gas_rules() {
        let spec = Spec::new(Hardfork::London);
        // requested gas above the ceiling is a hard failure
        let mut frame = Frame::new(vec![0, 0, 0, 0, 0, 0, 0x42, u64::MAX]);
        frame.auth = Some(Address::repeat_byte(0x01));
        frame.gas_left = U256::from(6400);
        assert_eq!(frame.run(opcode::AUTHCALL, 0, &spec).await, Err(InstructionTrap::OutOfGas));

        // zero means forward the whole ceiling; the address access is charged cold
        let mut frame = Frame::new(vec![0, 0, 0, 0, 0, 0, 0x42, 0]);
        frame.auth = Some(Address::repeat_byte(0x01));
        frame.gas_left = U256::from(6400);
        let total = frame.run(opcode::AUTHCALL, 0, &spec).await.unwrap();
        let remaining = 6400 - 2600;
        let ceiling = remaining - remaining / 64;
        assert_eq!(total, U256::from(2600 + ceiling));
        assert_eq!(frame.message_gas_limit, Some(U256::from(ceiling)));
    }

    #[tokio::test]
    async fn selfdestruct_rules() {
        let spec = Spec::new(Hardfork::Berlin);
        let me = Address::repeat_byte(0xee);
        let beneficiary = Address::from_word(B256::from(U256::from(0x42u64)));

        let mut frame = Frame::new(vec![0x42]);
        frame.host.balances.insert(me, U256::from(1));
        frame.host.empty.insert(beneficiary);
        // new-account surcharge + cold access
        assert_eq!(
            frame.run(opcode::SELFDESTRUCT, 5000, &spec).await.unwrap(),
            U256::from(5000 + 25000 + 2600)
        );

        // static frames cannot selfdestruct
        let mut frame = Frame::new(vec![0x42]);
        frame.is_static = true;
        assert_eq!(
            frame.run(opcode::SELFDESTRUCT, 5000, &spec).await,
            Err(InstructionTrap::StaticStateChange)
        );
    }

    #[tokio::test]
    async fn create2_charges_hash_words() {
        let spec = Spec::new(Hardfork::London);
        // stack (bottom up): salt, length=64, offset=0, value=0
        let mut frame = Frame::new(vec![7, 64, 0, 0]);
        // 2 words memory (6) + 2 hashed words (12)
        assert_eq!(
            frame.run(opcode::CREATE2, 32000, &spec).await.unwrap(),
            U256::from(32000 + 6 + 12)
        );
    }
}
