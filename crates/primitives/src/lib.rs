#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Commonly used types for the execution-layer core: transactions, accounts, hardforks.

mod account;
mod block;
mod hardfork;
mod transaction;

pub use account::Account;
pub use block::Block;
pub use hardfork::Hardfork;
pub use transaction::{
    public_key_to_address, sign_message, AccessList, AccessListItem, Signature, Transaction,
    TransactionKind, TransactionSigned, TxEip1559, TxEip2930, TxLegacy, TxType,
    EIP1559_TX_TYPE_ID, EIP2930_TX_TYPE_ID, LEGACY_TX_TYPE_ID,
};

pub use alloy_primitives::{
    self, hex, keccak256, Address, BlockHash, BlockNumber, Bytes, TxHash, B128, B256, B512, U256,
};

/// The public identity of a peer: the uncompressed secp256k1 public key without the `0x04` tag.
pub type PeerId = B512;
