//! Error types for the `p2p` stream.

use crate::{
    capability::SharedCapabilityError, pinger::PingerError, version::ProtocolVersion,
    DisconnectReason,
};
use std::io;

/// Errors when sending/receiving `p2p` messages. These should result in kicking the peer.
#[derive(thiserror::Error, Debug)]
pub enum P2PStreamError {
    /// Error during IO
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Error when decoding RLP data
    #[error(transparent)]
    Rlp(#[from] alloy_rlp::Error),
    /// Error when compressing or decompressing a message with snappy
    #[error(transparent)]
    Snap(#[from] snap::Error),
    /// Error during the `p2p` handshake
    #[error(transparent)]
    HandshakeError(#[from] P2PHandshakeError),
    /// Message size exceeds the limit of [EIP-706](https://eips.ethereum.org/EIPS/eip-706)
    #[error("message size ({0}) exceeds max length (16MB)")]
    MessageTooBig(usize),
    /// An unknown reserved `p2p` message id was received
    #[error("unknown reserved p2p message id: {0}")]
    UnknownReservedMessageId(u8),
    /// An empty message was received
    #[error("empty protocol message received")]
    EmptyProtocolMessage,
    /// Error in the keepalive state machine
    #[error(transparent)]
    PingerError(#[from] PingerError),
    /// The peer did not respond to a ping in time
    #[error("ping timed out")]
    PingTimeout,
    /// Error while negotiating shared capabilities
    #[error(transparent)]
    ParseSharedCapability(#[from] SharedCapabilityError),
    /// A message for a capability that was not negotiated with this peer
    #[error("capability not supported on stream to this peer")]
    CapabilityNotShared,
    /// The peer sent a disconnect message
    #[error("disconnected by peer: {0}")]
    Disconnected(DisconnectReason),
    /// The disconnect reason byte could not be mapped to a known reason
    #[error("unknown disconnect reason: {0}")]
    UnknownDisconnectReason(u8),
    /// A message was sent while the stream is shutting down
    #[error("started disconnect process")]
    Disconnecting,
}

// === impl P2PStreamError ===

impl P2PStreamError {
    /// Returns the [`DisconnectReason`] if it is the `Disconnected` variant.
    pub fn as_disconnected(&self) -> Option<DisconnectReason> {
        let reason = match self {
            P2PStreamError::HandshakeError(P2PHandshakeError::Disconnected(reason)) => reason,
            P2PStreamError::Disconnected(reason) => reason,
            _ => return None,
        };

        Some(*reason)
    }
}

/// Errors when conducting a `p2p` handshake.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum P2PHandshakeError {
    /// The protocol versions are incompatible
    #[error("hello message protocol version mismatch: got {got}, expected {expected}")]
    MismatchedProtocolVersion {
        /// The version we received in the peer's hello
        got: ProtocolVersion,
        /// The version we expected
        expected: ProtocolVersion,
    },
    /// A hello message was received or sent outside of the handshake
    #[error("hello message can only be recv/sent in handshake")]
    HelloNotInHandshake,
    /// Received a message other than hello during the handshake
    #[error("received non-hello message when trying to handshake")]
    NonHelloMessageInHandshake,
    /// The capability intersection is empty
    #[error("no capabilities shared with peer")]
    NoSharedCapabilities,
    /// The peer never answered our hello
    #[error("no response received when sending out handshake")]
    NoResponse,
    /// The handshake did not complete within the configured bound
    #[error("handshake timed out")]
    Timeout,
    /// The peer answered the hello with a disconnect
    #[error("disconnected by peer: {0}")]
    Disconnected(DisconnectReason),
    /// Error while decoding the peer's hello
    #[error("error decoding a message during handshake: {0}")]
    DecodeError(#[from] alloy_rlp::Error),
}
