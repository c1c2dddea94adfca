use crate::IngressECIESValue;
use std::io;

/// An error that occurs while reading or writing to an ECIES stream.
#[derive(Debug, thiserror::Error)]
pub enum ECIESError {
    /// Error during IO
    #[error(transparent)]
    IO(#[from] io::Error),
    /// Error when checking the HMAC tag against the tag on the message being decrypted
    #[error("tag check failure for a handshake message")]
    TagCheckDecryptFailed,
    /// Error when checking the HMAC tag against the tag on the header
    #[error("tag check failure in read_header")]
    TagCheckHeaderFailed,
    /// Error when checking the HMAC tag against the tag on the body
    #[error("tag check failure in read_body")]
    TagCheckBodyFailed,
    /// Error when parsing AUTH data
    #[error("invalid auth data")]
    InvalidAuthData,
    /// Error when parsing ACK data
    #[error("invalid ack data")]
    InvalidAckData,
    /// Error when reading the header if its length is less than the payload
    #[error("invalid body data")]
    InvalidHeader,
    /// Error when interacting with secp256k1
    #[error(transparent)]
    Secp256k1(#[from] secp256k1::Error),
    /// Error when decoding RLP data
    #[error(transparent)]
    RLPDecoding(#[from] alloy_rlp::Error),
    /// Error when the initial handshake message is deemed too large before decoding
    #[error("body size ({0}) exceeds limit")]
    BodySizeTooLarge(usize),
    /// Error when the stream was closed while waiting for a handshake message
    #[error("stream closed due to not being readable")]
    UnreadableStream,
    /// Error when the remote sent an unexpected message during the handshake
    #[error("invalid handshake: expected {expected:?}, got {msg:?} instead")]
    InvalidHandshake {
        /// The expected value
        expected: IngressECIESValue,
        /// The received value
        msg: Option<IngressECIESValue>,
    },
}

impl From<ECIESError> for io::Error {
    fn from(source: ECIESError) -> Self {
        io::Error::new(io::ErrorKind::Other, format!("ECIES error: {source:?}"))
    }
}
