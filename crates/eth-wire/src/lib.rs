#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Implementation of the `eth` wire protocol.

pub mod capability;
mod disconnect;
pub mod errors;
mod ethstream;
mod hello;
mod p2pstream;
mod pinger;
pub mod types;
mod version;

pub use types::*;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::{
    capability::{Capability, SharedCapabilities, SharedCapability},
    disconnect::DisconnectReason,
    ethstream::{CoreStream, EthStream, UnauthedEthStream, MAX_MESSAGE_SIZE},
    hello::HelloMessage,
    p2pstream::{P2PMessage, P2PMessageID, P2PStream, UnauthedP2PStream, PING_INTERVAL},
    pinger::PingerError,
    version::{EthVersion, ParseVersionError, ProtocolVersion},
};
