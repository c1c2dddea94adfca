use crate::{access::AccessSets, host::Host, stack::Stack};
use alloy_primitives::{Address, U256};

/// The slice of interpreter state the gas handlers read, and the few fields they write.
///
/// One of these exists per EVM message call. Handlers mutate only the memory word count, the
/// warm-access sets and the call-forwarding output; everything else is read-only.
#[derive(Debug)]
pub struct RunState<'a, H: Host + ?Sized> {
    /// The executing account; the storage target of SLOAD/SSTORE.
    pub address: Address,
    /// The operand stack. Operands are peeked, the interpreter pops them later.
    pub stack: &'a mut Stack,
    /// The highest memory word the frame has touched so far.
    pub memory_words: u64,
    /// Size of the return data buffer of the last completed sub-call.
    pub return_data_len: u64,
    /// Gas remaining in the frame before the current instruction's charge.
    pub gas_left: U256,
    /// Whether the frame executes in a static context.
    pub is_static: bool,
    /// The authority installed by a prior AUTH, consumed by AUTHCALL.
    pub auth: Option<Address>,
    /// Output of the call-family handlers: the gas budget forwarded to the callee.
    pub message_gas_limit: Option<U256>,
    /// The per-message warm address/slot sets.
    pub access: &'a mut AccessSets,
    /// The state capability.
    pub host: &'a mut H,
}
