use crate::EthVersion;
use alloy_primitives::{B256, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use std::fmt::{Debug, Display};

/// The status message is used in the eth protocol handshake to ensure that peers are on the same
/// network and are following the same fork.
///
/// The total difficulty and best block fields are carried for peers that still gossip them; fork
/// filtering is the sync driver's concern and happens above this layer.
#[derive(Copy, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Status {
    /// The current protocol version. For example, peers running `eth/66` would have a version of
    /// 66.
    pub version: u8,

    /// The chain id, as introduced in
    /// [EIP-155](https://eips.ethereum.org/EIPS/eip-155#list-of-chain-ids).
    pub chain: u64,

    /// Total difficulty of the best chain.
    pub total_difficulty: U256,

    /// The highest difficulty block hash the peer has seen
    pub blockhash: B256,

    /// The genesis hash of the peer's chain.
    pub genesis: B256,
}

impl Status {
    /// Creates a status for the given version, chain and genesis.
    pub fn new(version: EthVersion, chain: u64, genesis: B256) -> Self {
        Self {
            version: version as u8,
            chain,
            total_difficulty: U256::ZERO,
            blockhash: genesis,
            genesis,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Status {{ version: {}, chain: {}, total_difficulty: {}, blockhash: {}, genesis: {} }}",
            self.version, self.chain, self.total_difficulty, self.blockhash, self.genesis,
        )
    }
}

impl Debug for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Status")
            .field("version", &self.version)
            .field("chain", &self.chain)
            .field("total_difficulty", &self.total_difficulty)
            .field("blockhash", &self.blockhash)
            .field("genesis", &self.genesis)
            .finish()
    }
}
