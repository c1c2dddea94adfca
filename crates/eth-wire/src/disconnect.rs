//! RLPx disconnect reasons.

use alloy_rlp::{Decodable, Encodable, Error as RlpError, Header};
use std::fmt::Display;

/// The reason a peer gives when it tears a connection down, with the code assignments of the
/// [devp2p spec](https://github.com/ethereum/devp2p/blob/master/rlpx.md#disconnect-0x01).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// One side asked for the disconnect without giving a specific cause.
    DisconnectRequested = 0x00,
    /// The underlying TCP connection failed.
    TcpSubsystemError = 0x01,
    /// The other side violated the transport or `p2p` rules, e.g. sent unparseable RLP.
    ProtocolBreach = 0x02,
    /// The capability intersection came up empty, there is nothing to talk about.
    UselessPeer = 0x03,
    /// One side is at its connection limit.
    TooManyPeers = 0x04,
    /// A connection to this peer already exists.
    AlreadyConnected = 0x05,
    /// The two sides run incompatible `p2p` protocol versions.
    IncompatibleP2PProtocolVersion = 0x06,
    /// The peer presented a null identity.
    NullNodeIdentity = 0x07,
    /// The disconnecting side is shutting down.
    ClientQuitting = 0x08,
    /// The identity in the handshake is not the one that was dialed.
    UnexpectedHandshakeIdentity = 0x09,
    /// The connection loops back to the local node's own identity.
    ConnectedToSelf = 0x0a,
    /// A ping went unanswered for too long.
    PingTimeout = 0x0b,
    /// A subprotocol rule was violated; which one is the subprotocol's business.
    SubprotocolSpecific = 0x10,
}

impl Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            DisconnectReason::DisconnectRequested => "disconnect requested",
            DisconnectReason::TcpSubsystemError => "TCP subsystem error",
            DisconnectReason::ProtocolBreach => "transport or p2p protocol breach",
            DisconnectReason::UselessPeer => "no capabilities in common",
            DisconnectReason::TooManyPeers => "connection limit reached",
            DisconnectReason::AlreadyConnected => "duplicate connection",
            DisconnectReason::IncompatibleP2PProtocolVersion => {
                "incompatible p2p protocol version"
            }
            DisconnectReason::NullNodeIdentity => "null node identity",
            DisconnectReason::ClientQuitting => "client shutting down",
            DisconnectReason::UnexpectedHandshakeIdentity => {
                "handshake identity differs from the dialed identity"
            }
            DisconnectReason::ConnectedToSelf => "connected to self",
            DisconnectReason::PingTimeout => "ping timed out",
            DisconnectReason::SubprotocolSpecific => "subprotocol-specific reason",
        };

        write!(f, "{message}")
    }
}

/// A disconnect code outside the assigned range.
#[derive(Debug, Clone)]
pub struct UnknownDisconnectReason(pub u8);

/// Mapping back from the wire byte. An unassigned code is worth logging and disconnecting
/// over, never crashing.
impl TryFrom<u8> for DisconnectReason {
    type Error = UnknownDisconnectReason;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let reason = match value {
            0x00 => Self::DisconnectRequested,
            0x01 => Self::TcpSubsystemError,
            0x02 => Self::ProtocolBreach,
            0x03 => Self::UselessPeer,
            0x04 => Self::TooManyPeers,
            0x05 => Self::AlreadyConnected,
            0x06 => Self::IncompatibleP2PProtocolVersion,
            0x07 => Self::NullNodeIdentity,
            0x08 => Self::ClientQuitting,
            0x09 => Self::UnexpectedHandshakeIdentity,
            0x0a => Self::ConnectedToSelf,
            0x0b => Self::PingTimeout,
            0x10 => Self::SubprotocolSpecific,
            other => return Err(UnknownDisconnectReason(other)),
        };
        Ok(reason)
    }
}

/// The [devp2p spec](https://github.com/ethereum/devp2p/blob/master/rlpx.md#disconnect-0x01)
/// encodes the disconnect reason as a single-element rlp list.
impl Encodable for DisconnectReason {
    fn encode(&self, out: &mut dyn bytes::BufMut) {
        out.put_u8(0xc1);
        (*self as u8).encode(out);
    }

    fn length(&self) -> usize {
        2
    }
}

/// Accepts both the canonical single-element list and the bare reason byte some clients send.
impl Decodable for DisconnectReason {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        if buf.is_empty() {
            return Err(RlpError::InputTooShort)
        } else if buf.len() > 2 {
            return Err(RlpError::Overflow)
        }

        if buf.len() > 1 {
            // this should be a list, so decode the list header. this should advance the buffer
            // so buf[0] is the first (and only) element of the list.
            let header = Header::decode(buf)?;

            if !header.list {
                return Err(RlpError::UnexpectedString)
            }

            if header.payload_length != 1 {
                return Err(RlpError::ListLengthMismatch {
                    expected: 1,
                    got: header.payload_length,
                })
            }
        }

        // geth rarely sends the disconnect reason as a bare byte
        let reason = u8::decode(buf)?;
        DisconnectReason::try_from(reason)
            .map_err(|_| RlpError::Custom("unknown disconnect reason"))
    }
}

/// All known disconnect reasons, useful for tests.
#[cfg(test)]
pub(crate) fn all_reasons() -> Vec<DisconnectReason> {
    vec![
        DisconnectReason::DisconnectRequested,
        DisconnectReason::TcpSubsystemError,
        DisconnectReason::ProtocolBreach,
        DisconnectReason::UselessPeer,
        DisconnectReason::TooManyPeers,
        DisconnectReason::AlreadyConnected,
        DisconnectReason::IncompatibleP2PProtocolVersion,
        DisconnectReason::NullNodeIdentity,
        DisconnectReason::ClientQuitting,
        DisconnectReason::UnexpectedHandshakeIdentity,
        DisconnectReason::ConnectedToSelf,
        DisconnectReason::PingTimeout,
        DisconnectReason::SubprotocolSpecific,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_round_trip() {
        for reason in all_reasons() {
            let mut encoded = Vec::new();
            reason.encode(&mut encoded);

            let decoded = DisconnectReason::decode(&mut &encoded[..]).unwrap();
            assert_eq!(reason, decoded);
        }
    }

    #[test]
    fn disconnect_encoding_length() {
        for reason in all_reasons() {
            let mut encoded = Vec::new();
            reason.encode(&mut encoded);
            assert_eq!(encoded.len(), reason.length());
        }
    }

    #[test]
    fn decode_bare_reason_byte() {
        // some clients skip the list wrapper
        let decoded = DisconnectReason::decode(&mut &[0x04u8][..]).unwrap();
        assert_eq!(decoded, DisconnectReason::TooManyPeers);
    }

    #[test]
    fn test_reason_too_short() {
        assert!(DisconnectReason::decode(&mut &[][..]).is_err())
    }

    #[test]
    fn canonical_reason_codes() {
        assert_eq!(DisconnectReason::DisconnectRequested as u8, 0x00);
        assert_eq!(DisconnectReason::ProtocolBreach as u8, 0x02);
        assert_eq!(DisconnectReason::UselessPeer as u8, 0x03);
        assert_eq!(DisconnectReason::PingTimeout as u8, 0x0b);
        assert_eq!(DisconnectReason::SubprotocolSpecific as u8, 0x10);
    }
}
