#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Dynamic gas accounting for the EVM interpreter.
//!
//! The interpreter charges static base costs from its own tables; everything data-dependent
//! (memory expansion, copy and hashing fees, cold/warm access, SSTORE schedules, call-gas
//! forwarding) lives here, dispatched through a fixed per-opcode table.

mod access;
mod call;
mod error;
mod host;
mod memory;
mod runstate;
mod schedule;
mod sstore;
mod stack;
mod table;

pub use access::{AccessCheckpoint, AccessSets};
pub use call::max_call_gas;
pub use error::{GasResult, InstructionTrap};
pub use host::Host;
pub use memory::{copy_fee, memory_cost, sha3_word_fee, sub_mem_usage};
pub use runstate::RunState;
pub use schedule::{GasSchedule, Spec, SstoreMetering};
pub use stack::Stack;
pub use table::{dynamic_gas, opcode, AsyncOp, Handler, SyncOp, GAS_HANDLERS};
