//! Typed `eth` protocol messages and the id framing around them.

use super::{
    broadcast::{NewBlockHashes, NewPooledTransactionHashes66, NewPooledTransactionHashes68},
    GetPooledTransactions, PooledTransactions, Status, Transactions,
};
use crate::{errors::EthStreamError, EthVersion};
use alloy_primitives::Bytes;
use alloy_rlp::{length_of_length, Decodable, Encodable, Header};

/// An `eth` protocol message, containing a message ID and payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolMessage {
    /// The unique identifier representing the type of the Ethereum message.
    pub message_type: EthMessageID,
    /// The content of the message, including specific data based on the message type.
    pub message: EthMessage,
}

impl ProtocolMessage {
    /// Create a new ProtocolMessage from a message type and message rlp bytes.
    pub fn decode_message(version: EthVersion, buf: &mut &[u8]) -> Result<Self, EthStreamError> {
        let message_type = EthMessageID::decode(buf)?;

        let message = match message_type {
            EthMessageID::Status => EthMessage::Status(Status::decode(buf)?),
            EthMessageID::NewBlockHashes => {
                EthMessage::NewBlockHashes(NewBlockHashes::decode(buf)?)
            }
            EthMessageID::Transactions => EthMessage::Transactions(Transactions::decode(buf)?),
            EthMessageID::NewPooledTransactionHashes => {
                if version >= EthVersion::Eth68 {
                    let msg = NewPooledTransactionHashes68::decode(buf)?;
                    if !msg.has_consistent_lengths() {
                        return Err(EthStreamError::TransactionHashesInvalidLenOfFields {
                            hashes_len: msg.hashes.len(),
                            types_len: msg.types.len(),
                            sizes_len: msg.sizes.len(),
                        })
                    }
                    EthMessage::NewPooledTransactionHashes68(msg)
                } else {
                    EthMessage::NewPooledTransactionHashes66(NewPooledTransactionHashes66::decode(
                        buf,
                    )?)
                }
            }
            EthMessageID::GetPooledTransactions => {
                let request_pair = RequestPair::<GetPooledTransactions>::decode(buf)?;
                EthMessage::GetPooledTransactions(request_pair)
            }
            EthMessageID::PooledTransactions => {
                let request_pair = RequestPair::<PooledTransactions>::decode(buf)?;
                EthMessage::PooledTransactions(request_pair)
            }
            // the remaining ids are part of the protocol but not consumed by this core, their
            // payloads pass through untouched
            other => EthMessage::Other(RawEthMessage {
                id: other,
                payload: Bytes::copy_from_slice(buf),
            }),
        };
        Ok(Self { message_type, message })
    }
}

impl Encodable for ProtocolMessage {
    /// Encodes the protocol message into bytes. The message type is encoded as a single byte and
    /// prepended to the message.
    fn encode(&self, out: &mut dyn bytes::BufMut) {
        self.message_type.encode(out);
        self.message.encode(out);
    }

    fn length(&self) -> usize {
        self.message_type.length() + self.message.length()
    }
}

impl From<EthMessage> for ProtocolMessage {
    fn from(message: EthMessage) -> Self {
        ProtocolMessage { message_type: message.message_id(), message }
    }
}

/// Represents a message in the eth wire protocol, versions 66, 67 and 68.
///
/// The `Status`, `NewBlockHashes` and `Transactions` message types are broadcast messages; the
/// `GetPooledTransactions`/`PooledTransactions` pair carries a `request_id` to correlate
/// responses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EthMessage {
    /// Represents a Status message required for the protocol handshake.
    Status(Status),
    /// Represents a NewBlockHashes message broadcast to the network.
    NewBlockHashes(NewBlockHashes),
    /// Represents a Transactions message broadcast to the network.
    Transactions(Transactions),
    /// Represents a NewPooledTransactionHashes message for eth/66 and eth/67.
    NewPooledTransactionHashes66(NewPooledTransactionHashes66),
    /// Represents a NewPooledTransactionHashes message for eth/68.
    NewPooledTransactionHashes68(NewPooledTransactionHashes68),
    /// Represents a GetPooledTransactions request-response pair.
    GetPooledTransactions(RequestPair<GetPooledTransactions>),
    /// Represents a PooledTransactions request-response pair.
    PooledTransactions(RequestPair<PooledTransactions>),
    /// A message this core does not interpret; the payload is the undecoded message body.
    Other(RawEthMessage),
}

impl EthMessage {
    /// Returns the message's ID.
    pub fn message_id(&self) -> EthMessageID {
        match self {
            EthMessage::Status(_) => EthMessageID::Status,
            EthMessage::NewBlockHashes(_) => EthMessageID::NewBlockHashes,
            EthMessage::Transactions(_) => EthMessageID::Transactions,
            EthMessage::NewPooledTransactionHashes66(_) |
            EthMessage::NewPooledTransactionHashes68(_) => {
                EthMessageID::NewPooledTransactionHashes
            }
            EthMessage::GetPooledTransactions(_) => EthMessageID::GetPooledTransactions,
            EthMessage::PooledTransactions(_) => EthMessageID::PooledTransactions,
            EthMessage::Other(raw) => raw.id,
        }
    }
}

impl Encodable for EthMessage {
    fn encode(&self, out: &mut dyn bytes::BufMut) {
        match self {
            EthMessage::Status(status) => status.encode(out),
            EthMessage::NewBlockHashes(new_block_hashes) => new_block_hashes.encode(out),
            EthMessage::Transactions(transactions) => transactions.encode(out),
            EthMessage::NewPooledTransactionHashes66(hashes) => hashes.encode(out),
            EthMessage::NewPooledTransactionHashes68(hashes) => hashes.encode(out),
            EthMessage::GetPooledTransactions(request) => request.encode(out),
            EthMessage::PooledTransactions(response) => response.encode(out),
            EthMessage::Other(raw) => out.put_slice(&raw.payload),
        }
    }

    fn length(&self) -> usize {
        match self {
            EthMessage::Status(status) => status.length(),
            EthMessage::NewBlockHashes(new_block_hashes) => new_block_hashes.length(),
            EthMessage::Transactions(transactions) => transactions.length(),
            EthMessage::NewPooledTransactionHashes66(hashes) => hashes.length(),
            EthMessage::NewPooledTransactionHashes68(hashes) => hashes.length(),
            EthMessage::GetPooledTransactions(request) => request.length(),
            EthMessage::PooledTransactions(response) => response.length(),
            EthMessage::Other(raw) => raw.payload.len(),
        }
    }
}

/// A message whose payload this core leaves undecoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEthMessage {
    /// The message id.
    pub id: EthMessageID,
    /// The undecoded message body.
    pub payload: Bytes,
}

/// Represents message IDs for eth protocol messages.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EthMessageID {
    /// Status message.
    Status = 0x00,
    /// New block hashes message.
    NewBlockHashes = 0x01,
    /// Transactions message.
    Transactions = 0x02,
    /// Get block headers message.
    GetBlockHeaders = 0x03,
    /// Block headers message.
    BlockHeaders = 0x04,
    /// Get block bodies message.
    GetBlockBodies = 0x05,
    /// Block bodies message.
    BlockBodies = 0x06,
    /// New block message.
    NewBlock = 0x07,
    /// New pooled transaction hashes message.
    NewPooledTransactionHashes = 0x08,
    /// Requests pooled transactions.
    GetPooledTransactions = 0x09,
    /// Represents pooled transactions.
    PooledTransactions = 0x0a,
    /// Requests node data (removed in eth/67).
    GetNodeData = 0x0d,
    /// Represents node data (removed in eth/67).
    NodeData = 0x0e,
    /// Requests receipts.
    GetReceipts = 0x0f,
    /// Represents receipts.
    Receipts = 0x10,
}

impl Encodable for EthMessageID {
    fn encode(&self, out: &mut dyn bytes::BufMut) {
        out.put_u8(*self as u8);
    }
    fn length(&self) -> usize {
        1
    }
}

impl Decodable for EthMessageID {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let id = buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        let id = Self::try_from(*id).map_err(|_| alloy_rlp::Error::Custom("invalid message id"))?;
        *buf = &buf[1..];
        Ok(id)
    }
}

impl TryFrom<u8> for EthMessageID {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(EthMessageID::Status),
            0x01 => Ok(EthMessageID::NewBlockHashes),
            0x02 => Ok(EthMessageID::Transactions),
            0x03 => Ok(EthMessageID::GetBlockHeaders),
            0x04 => Ok(EthMessageID::BlockHeaders),
            0x05 => Ok(EthMessageID::GetBlockBodies),
            0x06 => Ok(EthMessageID::BlockBodies),
            0x07 => Ok(EthMessageID::NewBlock),
            0x08 => Ok(EthMessageID::NewPooledTransactionHashes),
            0x09 => Ok(EthMessageID::GetPooledTransactions),
            0x0a => Ok(EthMessageID::PooledTransactions),
            0x0d => Ok(EthMessageID::GetNodeData),
            0x0e => Ok(EthMessageID::NodeData),
            0x0f => Ok(EthMessageID::GetReceipts),
            0x10 => Ok(EthMessageID::Receipts),
            _ => Err("Invalid message ID"),
        }
    }
}

/// This is used for all request-response style `eth` protocol messages.
///
/// This can represent either a request or a response, since both include a message payload and
/// request id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestPair<T> {
    /// id for the contained request or response message
    pub request_id: u64,

    /// the request or response message payload
    pub message: T,
}

/// Allows messages with request ids to be serialized into RLP bytes.
impl<T> Encodable for RequestPair<T>
where
    T: Encodable,
{
    fn encode(&self, out: &mut dyn bytes::BufMut) {
        let header =
            Header { list: true, payload_length: self.request_id.length() + self.message.length() };
        header.encode(out);
        self.request_id.encode(out);
        self.message.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.request_id.length() + self.message.length();
        payload_length + length_of_length(payload_length)
    }
}

/// Allows messages with request ids to be deserialized into RLP bytes.
impl<T> Decodable for RequestPair<T>
where
    T: Decodable,
{
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let _header = Header::decode(buf)?;
        Ok(Self { request_id: u64::decode(buf)?, message: T::decode(buf)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn roundtrip(message: EthMessage, version: EthVersion) {
        let protocol = ProtocolMessage::from(message);
        let mut encoded = Vec::new();
        protocol.encode(&mut encoded);
        assert_eq!(encoded.len(), protocol.length());

        let decoded = ProtocolMessage::decode_message(version, &mut &encoded[..]).unwrap();
        assert_eq!(decoded, protocol);
    }

    #[test]
    fn request_pair_roundtrip() {
        let pair = RequestPair::<GetPooledTransactions> {
            request_id: 1337,
            message: GetPooledTransactions(vec![B256::repeat_byte(0xaa)]),
        };

        let mut encoded = Vec::new();
        pair.encode(&mut encoded);
        assert_eq!(encoded.len(), pair.length());
        let decoded = RequestPair::<GetPooledTransactions>::decode(&mut &encoded[..]).unwrap();
        assert_eq!(decoded, pair);
    }

    #[test]
    fn eth_message_roundtrips() {
        roundtrip(
            EthMessage::NewPooledTransactionHashes66(NewPooledTransactionHashes66(vec![
                B256::repeat_byte(0x02),
            ])),
            EthVersion::Eth66,
        );
        roundtrip(
            EthMessage::NewPooledTransactionHashes68(NewPooledTransactionHashes68 {
                types: vec![0x02],
                sizes: vec![222],
                hashes: vec![B256::repeat_byte(0x02)],
            }),
            EthVersion::Eth68,
        );
        roundtrip(
            EthMessage::GetPooledTransactions(RequestPair {
                request_id: 7,
                message: GetPooledTransactions(vec![B256::repeat_byte(0x11)]),
            }),
            EthVersion::Eth66,
        );
    }

    #[test]
    fn eth68_inconsistent_arity_is_rejected() {
        let msg = EthMessage::NewPooledTransactionHashes68(NewPooledTransactionHashes68 {
            types: vec![0x02, 0x02],
            sizes: vec![222],
            hashes: vec![B256::repeat_byte(0x02)],
        });
        let mut encoded = Vec::new();
        ProtocolMessage::from(msg).encode(&mut encoded);

        let err = ProtocolMessage::decode_message(EthVersion::Eth68, &mut &encoded[..]);
        assert!(matches!(
            err,
            Err(EthStreamError::TransactionHashesInvalidLenOfFields { .. })
        ));
    }
}
