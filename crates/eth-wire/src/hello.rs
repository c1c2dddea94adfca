use crate::{capability::Capability, version::ProtocolVersion};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use elc_primitives::PeerId;

/// Message used in the `p2p` handshake, containing information about the supported RLPx protocol
/// version and capabilities.
#[derive(Clone, Debug, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct HelloMessage {
    /// The version of the `p2p` protocol.
    pub protocol_version: ProtocolVersion,
    /// Specifies the client software identity, as a human-readable string (e.g.
    /// "Ethereum(++)/1.0.0").
    pub client_version: String,
    /// The list of supported capabilities and their versions.
    pub capabilities: Vec<Capability>,
    /// The port that the client is listening on, zero indicates the client is not listening.
    pub port: u16,
    /// The secp256k1 public key corresponding to the node's private key.
    pub id: PeerId,
}

impl HelloMessage {
    /// Creates a hello message with the default protocol version, this client's version string
    /// and the latest `eth` capability.
    pub fn new(id: PeerId) -> Self {
        Self {
            protocol_version: ProtocolVersion::V5,
            client_version: concat!("elc/v", env!("CARGO_PKG_VERSION")).to_string(),
            capabilities: vec![Capability::eth_68()],
            port: 30303,
            id,
        }
    }
}
