//! Capability negotiation between two `p2p` peers.

use crate::{
    errors::{P2PHandshakeError, P2PStreamError},
    version::ParseVersionError,
    EthVersion,
};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use std::collections::{HashMap, HashSet};

/// The lowest message id available to negotiated capabilities; everything below is reserved for
/// the `p2p` subprotocol itself.
const SUBPROTOCOL_OFFSET_BASE: u8 = 0x10;

/// A message indicating a supported capability and capability version.
#[derive(Clone, Debug, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
pub struct Capability {
    /// The name of the subprotocol
    pub name: String,
    /// The version of the subprotocol
    pub version: usize,
}

impl Capability {
    /// Create a new `Capability` with the given name and version.
    pub fn new(name: String, version: usize) -> Self {
        Self { name, version }
    }

    /// A capability for the given `eth` version.
    pub fn eth(version: EthVersion) -> Self {
        Self::new("eth".to_string(), version as usize)
    }

    /// Whether this is an `eth` capability.
    pub fn is_eth(&self) -> bool {
        self.name == "eth"
    }

    /// The `eth/66` capability.
    pub fn eth_66() -> Self {
        Self::new("eth".to_string(), EthVersion::Eth66 as usize)
    }

    /// The `eth/67` capability.
    pub fn eth_67() -> Self {
        Self::new("eth".to_string(), EthVersion::Eth67 as usize)
    }

    /// The `eth/68` capability.
    pub fn eth_68() -> Self {
        Self::new("eth".to_string(), EthVersion::Eth68 as usize)
    }
}

/// This represents a shared capability, its version, and its message id offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SharedCapability {
    /// The `eth` capability.
    Eth {
        /// The negotiated version
        version: EthVersion,
        /// The message id offset assigned during the hello exchange
        offset: u8,
    },

    /// The `les` capability.
    Les {
        /// The negotiated version
        version: u8,
        /// The message id offset assigned during the hello exchange
        offset: u8,
    },

    /// An unknown capability.
    UnknownCapability {
        /// The name of the capability
        name: String,
        /// The negotiated version
        version: u8,
        /// The message id offset assigned during the hello exchange
        offset: u8,
    },
}

impl SharedCapability {
    /// Creates a new [`SharedCapability`] based on the given name, offset, and version.
    pub(crate) fn new(name: &str, version: u8, offset: u8) -> Result<Self, SharedCapabilityError> {
        match name {
            "eth" => Ok(Self::Eth { version: EthVersion::try_from(version)?, offset }),
            "les" => Ok(Self::Les { version, offset }),
            _ => Ok(Self::UnknownCapability { name: name.to_string(), version, offset }),
        }
    }

    /// Returns the name of the capability.
    pub fn name(&self) -> &str {
        match self {
            SharedCapability::Eth { .. } => "eth",
            SharedCapability::Les { .. } => "les",
            SharedCapability::UnknownCapability { name, .. } => name,
        }
    }

    /// Returns the version of the capability.
    pub fn version(&self) -> u8 {
        match self {
            SharedCapability::Eth { version, .. } => *version as u8,
            SharedCapability::Les { version, .. } => *version,
            SharedCapability::UnknownCapability { version, .. } => *version,
        }
    }

    /// Returns the message ID offset of the current capability.
    pub fn offset(&self) -> u8 {
        match self {
            SharedCapability::Eth { offset, .. } => *offset,
            SharedCapability::Les { offset, .. } => *offset,
            SharedCapability::UnknownCapability { offset, .. } => *offset,
        }
    }

    /// Returns the number of protocol messages supported by this capability.
    pub(crate) fn num_messages(&self) -> Result<u8, SharedCapabilityError> {
        match self {
            SharedCapability::Eth { version, .. } => Ok(version.total_messages()),
            // les/2..4 all carry 23 message ids
            SharedCapability::Les { .. } => Ok(23),
            _ => Err(SharedCapabilityError::UnknownCapability),
        }
    }
}

/// The set of capabilities negotiated with a peer, with assigned message id offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedCapabilities(Vec<SharedCapability>);

impl SharedCapabilities {
    /// Negotiates the shared capabilities between the local and the peer capabilities.
    ///
    /// For every shared name the highest shared version wins; offsets are assigned from 0x10
    /// upwards in lexicographic order of capability name. An empty intersection is an error, the
    /// peer is useless to us.
    pub fn try_new(
        local: Vec<Capability>,
        peer: Vec<Capability>,
    ) -> Result<Self, P2PStreamError> {
        shared_capability_offsets(local, peer).map(Self)
    }

    /// Returns an iterator over the shared capabilities.
    pub fn iter(&self) -> impl Iterator<Item = &SharedCapability> {
        self.0.iter()
    }

    /// Returns the shared `eth` capability, if negotiated.
    pub fn eth(&self) -> Result<&SharedCapability, P2PStreamError> {
        self.0
            .iter()
            .find(|c| matches!(c, SharedCapability::Eth { .. }))
            .ok_or(P2PStreamError::CapabilityNotShared)
    }

    /// Returns the negotiated `eth` version, if any.
    pub fn eth_version(&self) -> Result<EthVersion, P2PStreamError> {
        match self.eth()? {
            SharedCapability::Eth { version, .. } => Ok(*version),
            _ => unreachable!("eth() only returns the eth variant"),
        }
    }

    /// Returns the capability that covers the given absolute message id, if any.
    pub fn find_by_offset(&self, id: u8) -> Option<&SharedCapability> {
        self.0.iter().rev().find(|cap| id >= cap.offset())
    }
}

/// Determines the offsets for each shared capability between the input list of peer
/// capabilities and the input list of locally supported capabilities.
fn shared_capability_offsets(
    local: Vec<Capability>,
    peer: Vec<Capability>,
) -> Result<Vec<SharedCapability>, P2PStreamError> {
    let our_capabilities: HashSet<Capability> = local.into_iter().collect();

    // map of capability name => highest version shared by both sides
    let mut shared_capabilities = HashMap::<String, u8>::new();
    for cap in peer {
        if our_capabilities.contains(&cap) {
            let version = cap.version as u8;
            let entry = shared_capabilities.entry(cap.name).or_insert(version);
            if *entry < version {
                *entry = version;
            }
        }
    }

    if shared_capabilities.is_empty() {
        return Err(P2PStreamError::HandshakeError(P2PHandshakeError::NoSharedCapabilities))
    }

    // alphabetic order of capability name determines offset assignment
    let mut names: Vec<String> = shared_capabilities.keys().cloned().collect();
    names.sort();

    let mut shared_with_offsets = Vec::new();
    let mut offset = SUBPROTOCOL_OFFSET_BASE;
    for name in names {
        let version = shared_capabilities[&name];
        let shared = SharedCapability::new(&name, version, offset)?;
        // a shared capability we cannot dispatch for does not get message ids assigned
        match shared.num_messages() {
            Ok(n) => {
                shared_with_offsets.push(shared);
                offset += n;
            }
            Err(_) => continue,
        }
    }

    if shared_with_offsets.is_empty() {
        return Err(P2PStreamError::HandshakeError(P2PHandshakeError::NoSharedCapabilities))
    }
    Ok(shared_with_offsets)
}

/// An error that may occur while creating a [`SharedCapability`].
#[derive(Debug, thiserror::Error)]
pub enum SharedCapabilityError {
    /// Unsupported `eth` version.
    #[error(transparent)]
    UnsupportedVersion(#[from] ParseVersionError),
    /// Cannot determine the number of messages for unknown capabilities.
    #[error("cannot determine the number of messages for unknown capabilities")]
    UnknownCapability,
}
