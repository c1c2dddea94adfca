//! The RLPx `p2p` stream: hello exchange, keepalive, snappy compression and demuxing of
//! subprotocol messages.

use crate::{
    capability::SharedCapabilities,
    disconnect::DisconnectReason,
    errors::{P2PHandshakeError, P2PStreamError},
    hello::HelloMessage,
    pinger::{Pinger, PingerEvent},
    version::ProtocolVersion,
};
use alloy_primitives::hex;
use alloy_rlp::{Decodable, Encodable, Error as RlpError};
use bytes::{Buf, Bytes, BytesMut};
use futures::{Sink, SinkExt, StreamExt};
use pin_project::pin_project;
use std::{
    collections::VecDeque,
    io,
    pin::Pin,
    task::{ready, Context, Poll},
    time::Duration,
};
use tokio_stream::Stream;
use tracing::{debug, trace};

/// [`MAX_PAYLOAD_SIZE`] is the maximum size of an uncompressed message payload.
/// This is defined in [EIP-706](https://eips.ethereum.org/EIPS/eip-706).
const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// [`MAX_RESERVED_MESSAGE_ID`] is the maximum message ID reserved for the `p2p` subprotocol. If
/// there are any incoming messages with an ID greater than this, they are subprotocol messages.
const MAX_RESERVED_MESSAGE_ID: u8 = 0x0f;

/// [`HANDSHAKE_TIMEOUT`] determines the amount of time to wait before determining that a `p2p`
/// handshake has timed out.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// The interval at which we send pings to the remote peer.
pub const PING_INTERVAL: Duration = Duration::from_secs(15);

/// A pending ping that is not answered within this bound disconnects the peer.
const PING_TIMEOUT: Duration = Duration::from_secs(15);

/// The amount of time we give the remote peer to drain a disconnect reason before the socket is
/// shut down.
const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// The snappy encoding of the empty-string rlp payload that ping and pong messages carry for
/// `p2p` protocol version 5.
const SNAPPY_EMPTY_PAYLOAD: [u8; 3] = [0x01, 0x00, 0x80];

/// An un-authenticated `P2PStream`. This is consumed and returns a [`P2PStream`] after the
/// `Hello` handshake is completed.
#[pin_project]
#[derive(Debug)]
pub struct UnauthedP2PStream<S> {
    #[pin]
    inner: S,
}

impl<S> UnauthedP2PStream<S> {
    /// Create a new `UnauthedP2PStream` from a type `S` which implements `Stream` and `Sink`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Returns a reference to the inner stream.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> UnauthedP2PStream<S>
where
    S: Stream<Item = io::Result<BytesMut>> + Sink<Bytes, Error = io::Error> + Unpin,
{
    /// Consumes the `UnauthedP2PStream` and returns a `P2PStream` after the `Hello` handshake is
    /// completed successfully. This also returns the `Hello` message sent by the remote peer.
    pub async fn handshake(
        mut self,
        hello: HelloMessage,
    ) -> Result<(P2PStream<S>, HelloMessage), P2PStreamError> {
        trace!(?hello, "sending p2p hello to peer");

        // the hello message is never compressed, the remote's protocol version is unknown until
        // it arrives
        let mut raw_hello_bytes = BytesMut::new();
        P2PMessage::Hello(hello.clone()).encode(&mut raw_hello_bytes);
        self.inner.send(raw_hello_bytes.freeze()).await?;

        trace!("waiting for p2p hello from peer");
        let first_message_bytes = tokio::time::timeout(HANDSHAKE_TIMEOUT, self.inner.next())
            .await
            .or(Err(P2PStreamError::HandshakeError(P2PHandshakeError::Timeout)))?
            .ok_or(P2PStreamError::HandshakeError(P2PHandshakeError::NoResponse))??;

        // let's check the compressed length first, we will need to check again once confirming
        // that it contains snappy-compressed data (this will be the case for all non-p2p
        // messages).
        if first_message_bytes.len() > MAX_PAYLOAD_SIZE {
            return Err(P2PStreamError::MessageTooBig(first_message_bytes.len()))
        }

        // the first message sent MUST be a hello OR disconnect message
        let their_hello = match P2PMessage::decode(&mut &first_message_bytes[..]) {
            Ok(P2PMessage::Hello(hello)) => Ok(hello),
            Ok(P2PMessage::Disconnect(reason)) => {
                debug!(%reason, "disconnected by peer during handshake");
                Err(P2PStreamError::HandshakeError(P2PHandshakeError::Disconnected(reason)))
            }
            Err(err) => {
                debug!(?err, msg=%hex::encode(&first_message_bytes), "failed to decode first message from peer");
                Err(P2PStreamError::HandshakeError(err.into()))
            }
            Ok(msg) => {
                debug!(?msg, "expected hello message but received another message");
                Err(P2PStreamError::HandshakeError(P2PHandshakeError::NonHelloMessageInHandshake))
            }
        }?;

        if (hello.protocol_version as u8) != (their_hello.protocol_version as u8) {
            // TODO: do we want to send a `Disconnect` message here?
            return Err(P2PStreamError::HandshakeError(
                P2PHandshakeError::MismatchedProtocolVersion {
                    got: their_hello.protocol_version,
                    expected: hello.protocol_version,
                },
            ))
        }

        // determine shared capabilities (currently returns only one capability)
        let capability_res = SharedCapabilities::try_new(
            hello.capabilities.clone(),
            their_hello.capabilities.clone(),
        );

        let shared_capabilities = match capability_res {
            Err(err) => {
                // we don't share any capabilities, send a disconnect message
                self.send_disconnect(DisconnectReason::UselessPeer).await?;
                Err(err)
            }
            Ok(shared_capabilities) => Ok(shared_capabilities),
        }?;

        let stream = P2PStream::new(self.inner, shared_capabilities, hello.protocol_version);

        Ok((stream, their_hello))
    }

    /// Send a disconnect message during the handshake. This is sent without snappy compression.
    pub async fn send_disconnect(
        &mut self,
        reason: DisconnectReason,
    ) -> Result<(), P2PStreamError> {
        let mut buf = BytesMut::new();
        P2PMessage::Disconnect(reason).encode(&mut buf);
        trace!(%reason, "sending disconnect message during the handshake");
        self.inner.send(buf.freeze()).await.map_err(P2PStreamError::Io)
    }
}

/// A P2PStream wraps over any `Stream` that yields bytes and makes it compatible with `p2p`
/// protocol messages.
///
/// This stream supports multiple shared capabilities, and demuxes the `eth` subprotocol: the
/// message ids of yielded and accepted subprotocol messages are relative to the negotiated `eth`
/// offset.
#[pin_project]
#[derive(Debug)]
pub struct P2PStream<S> {
    #[pin]
    inner: S,

    /// The snappy encoder used for compressing outgoing messages
    encoder: snap::raw::Encoder,

    /// The snappy decoder used for decompressing incoming messages
    decoder: snap::raw::Decoder,

    /// The state machine used for keeping track of the peer's ping status.
    pinger: Pinger,

    /// The supported capability for this stream.
    shared_capabilities: SharedCapabilities,

    /// Whether snappy compression applies to message bodies, negotiated with
    /// `protocolVersion >= 5`. The hello message is always uncompressed.
    compression_enabled: bool,

    /// Outgoing messages buffered for sending to the underlying stream.
    outgoing_messages: VecDeque<Bytes>,

    /// Whether this stream is about to disconnect.
    disconnecting: bool,
}

impl<S> P2PStream<S> {
    /// Create a new [`P2PStream`] from the provided stream. New [`P2PStream`]s are expected to
    /// have completed the `p2p` handshake.
    pub fn new(
        inner: S,
        shared_capabilities: SharedCapabilities,
        protocol_version: ProtocolVersion,
    ) -> Self {
        Self {
            inner,
            encoder: snap::raw::Encoder::new(),
            decoder: snap::raw::Decoder::new(),
            pinger: Pinger::new(PING_INTERVAL, PING_TIMEOUT),
            shared_capabilities,
            compression_enabled: (protocol_version as u8) >= (ProtocolVersion::V5 as u8),
            outgoing_messages: VecDeque::new(),
            disconnecting: false,
        }
    }

    /// Returns the shared capabilities for this stream.
    pub fn shared_capabilities(&self) -> &SharedCapabilities {
        &self.shared_capabilities
    }

    /// Returns `true` if the connection is about to disconnect.
    pub fn is_disconnecting(&self) -> bool {
        self.disconnecting
    }

    fn disconnect_bytes(&self, reason: DisconnectReason) -> Result<Bytes, P2PStreamError> {
        let mut payload = Vec::with_capacity(2);
        reason.encode(&mut payload);

        let mut bytes = Vec::with_capacity(5);
        bytes.push(P2PMessageID::Disconnect as u8);
        if self.compression_enabled {
            bytes.extend_from_slice(&snap::raw::Encoder::new().compress_vec(&payload)?);
        } else {
            bytes.extend_from_slice(&payload);
        }
        Ok(bytes.into())
    }
}

impl<S> P2PStream<S>
where
    S: Sink<Bytes, Error = io::Error> + Unpin,
{
    /// Queues a disconnect message with the given reason and marks the stream as disconnecting.
    /// No further messages are accepted afterwards.
    pub fn start_disconnect(&mut self, reason: DisconnectReason) -> Result<(), P2PStreamError> {
        let message = self.disconnect_bytes(reason)?;
        self.outgoing_messages.push_back(message);
        self.disconnecting = true;
        Ok(())
    }

    /// Disconnects the stream: flushes the reason, waits out a grace period so the peer can
    /// drain it, then closes the underlying stream.
    pub async fn disconnect(&mut self, reason: DisconnectReason) -> Result<(), P2PStreamError> {
        self.start_disconnect(reason)?;
        self.flush().await?;
        tokio::time::sleep(GRACE_PERIOD).await;
        self.close().await
    }
}

// S must also be `Sink` because we need to be able to respond with ping messages to follow the
// protocol
impl<S> Stream for P2PStream<S>
where
    S: Stream<Item = io::Result<BytesMut>> + Sink<Bytes, Error = io::Error> + Unpin,
{
    type Item = Result<BytesMut, P2PStreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.disconnecting {
            return Poll::Ready(None)
        }

        // poll the pinger first so keepalives go out even while the peer is quiet
        match this.pinger.poll_ping(cx) {
            Poll::Ready(Ok(PingerEvent::Ping)) => {
                let mut bytes = Vec::with_capacity(4);
                bytes.push(P2PMessageID::Ping as u8);
                if *this.compression_enabled {
                    bytes.extend_from_slice(&SNAPPY_EMPTY_PAYLOAD);
                } else {
                    bytes.push(alloy_rlp::EMPTY_STRING_CODE);
                }
                this.outgoing_messages.push_back(bytes.into());
            }
            Poll::Ready(Ok(PingerEvent::Timeout)) => {
                // the peer stopped answering our pings, issue an orderly disconnect and end the
                // stream
                debug!("ping timed out, disconnecting peer");
                let mut payload = Vec::with_capacity(2);
                DisconnectReason::PingTimeout.encode(&mut payload);
                let mut bytes = Vec::with_capacity(5);
                bytes.push(P2PMessageID::Disconnect as u8);
                if *this.compression_enabled {
                    match snap::raw::Encoder::new().compress_vec(&payload) {
                        Ok(compressed) => bytes.extend_from_slice(&compressed),
                        Err(err) => return Poll::Ready(Some(Err(err.into()))),
                    }
                } else {
                    bytes.extend_from_slice(&payload);
                }
                this.outgoing_messages.push_back(bytes.into());
                *this.disconnecting = true;
            }
            Poll::Ready(Err(err)) => return Poll::Ready(Some(Err(err.into()))),
            Poll::Pending => {}
        }

        // drain queued control messages; back-pressure here just delays them to the next poll
        while this.outgoing_messages.front().is_some() {
            match this.inner.as_mut().poll_ready(cx) {
                Poll::Ready(Ok(())) => {
                    let message =
                        this.outgoing_messages.pop_front().expect("front was just checked");
                    if let Err(err) = this.inner.as_mut().start_send(message) {
                        return Poll::Ready(Some(Err(err.into())))
                    }
                }
                Poll::Ready(Err(err)) => return Poll::Ready(Some(Err(err.into()))),
                Poll::Pending => break,
            }
        }
        if let Poll::Ready(Err(err)) = this.inner.as_mut().poll_flush(cx) {
            return Poll::Ready(Some(Err(err.into())))
        }

        if *this.disconnecting {
            return Poll::Ready(None)
        }

        // we should loop here to ensure we don't return Poll::Pending if we have a message to
        // return behind any pings we need to respond to
        while let Poll::Ready(res) = this.inner.as_mut().poll_next(cx) {
            let bytes = match res {
                Some(Ok(bytes)) => bytes,
                Some(Err(err)) => return Poll::Ready(Some(Err(err.into()))),
                None => return Poll::Ready(None),
            };

            if bytes.is_empty() {
                return Poll::Ready(Some(Err(P2PStreamError::EmptyProtocolMessage)))
            }

            let id = bytes[0];
            if id == P2PMessageID::Ping as u8 {
                trace!("received ping from peer");
                let mut pong = Vec::with_capacity(4);
                pong.push(P2PMessageID::Pong as u8);
                if *this.compression_enabled {
                    pong.extend_from_slice(&SNAPPY_EMPTY_PAYLOAD);
                } else {
                    pong.push(alloy_rlp::EMPTY_STRING_CODE);
                }
                this.outgoing_messages.push_back(pong.into());

                // continue to the next message if there is one
            } else if id == P2PMessageID::Disconnect as u8 {
                let reason = match decode_disconnect_payload(&bytes[1..]) {
                    Ok(reason) => reason,
                    Err(err) => {
                        debug!(
                            ?err,
                            msg=%hex::encode(&bytes[1..]),
                            "failed to decode disconnect message from peer"
                        );
                        return Poll::Ready(Some(Err(err)))
                    }
                };
                debug!(%reason, "disconnected by peer");
                return Poll::Ready(Some(Err(P2PStreamError::Disconnected(reason))))
            } else if id == P2PMessageID::Hello as u8 {
                // we have received a hello message outside of the handshake, so we will return
                // an error
                return Poll::Ready(Some(Err(P2PStreamError::HandshakeError(
                    P2PHandshakeError::HelloNotInHandshake,
                ))))
            } else if id == P2PMessageID::Pong as u8 {
                // if we were waiting for a pong, this will reset the pinger state
                if let Err(err) = this.pinger.on_pong() {
                    return Poll::Ready(Some(Err(err.into())))
                }
            } else if id <= MAX_RESERVED_MESSAGE_ID {
                // we have received an unknown reserved message
                return Poll::Ready(Some(Err(P2PStreamError::UnknownReservedMessageId(id))))
            } else {
                // first, check that the message id is for a capability we negotiated; the `eth`
                // capability is the only one we dispatch, everything else is dropped here
                let eth_offset = match this.shared_capabilities.eth() {
                    Ok(cap) => cap.offset(),
                    Err(err) => return Poll::Ready(Some(Err(err))),
                };
                let Some(cap) = this.shared_capabilities.find_by_offset(id) else {
                    return Poll::Ready(Some(Err(P2PStreamError::UnknownReservedMessageId(id))))
                };
                if cap.offset() != eth_offset {
                    trace!(id, cap=%cap.name(), "dropping message for undispatched capability");
                    continue
                }

                // switch the message id based on the offset so the next layer can decode it
                // without being aware of the p2p stream's message id space
                if *this.compression_enabled {
                    let decompressed_len = match snap::raw::decompress_len(&bytes[1..]) {
                        Ok(len) => len,
                        Err(err) => return Poll::Ready(Some(Err(err.into()))),
                    };
                    if decompressed_len > MAX_PAYLOAD_SIZE {
                        return Poll::Ready(Some(Err(P2PStreamError::MessageTooBig(
                            decompressed_len,
                        ))))
                    }

                    let mut decompress_buf = BytesMut::zeroed(decompressed_len + 1);
                    if let Err(err) =
                        this.decoder.decompress(&bytes[1..], &mut decompress_buf[1..])
                    {
                        return Poll::Ready(Some(Err(err.into())))
                    }
                    decompress_buf[0] = id - eth_offset;
                    return Poll::Ready(Some(Ok(decompress_buf)))
                }

                let mut bytes = bytes;
                bytes[0] = id - eth_offset;
                return Poll::Ready(Some(Ok(bytes)))
            }
        }

        Poll::Pending
    }
}

impl<S> Sink<Bytes> for P2PStream<S>
where
    S: Sink<Bytes, Error = io::Error> + Unpin,
{
    type Error = P2PStreamError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let mut this = self.project();

        // drain buffered control messages first so keepalives are not starved by back-pressure
        while this.outgoing_messages.front().is_some() {
            ready!(this.inner.as_mut().poll_ready(cx))?;
            let message = this.outgoing_messages.pop_front().expect("front was just checked");
            this.inner.as_mut().start_send(message)?;
        }

        this.inner.poll_ready(cx).map_err(Into::into)
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
        if self.disconnecting {
            return Err(P2PStreamError::Disconnecting)
        }
        if item.is_empty() {
            return Err(P2PStreamError::EmptyProtocolMessage)
        }
        if item.len() > MAX_PAYLOAD_SIZE {
            return Err(P2PStreamError::MessageTooBig(item.len()))
        }

        let this = self.project();
        let offset = this.shared_capabilities.eth()?.offset();

        if *this.compression_enabled {
            let mut compressed = BytesMut::zeroed(1 + snap::raw::max_compress_len(item.len() - 1));
            let compressed_size = this.encoder.compress(&item[1..], &mut compressed[1..])?;
            compressed.truncate(compressed_size + 1);
            compressed[0] = item[0] + offset;
            this.inner.start_send(compressed.freeze())?;
        } else {
            let mut out = BytesMut::from(&item[..]);
            out[0] = item[0] + offset;
            this.inner.start_send(out.freeze())?;
        }

        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let mut this = self.project();

        while this.outgoing_messages.front().is_some() {
            ready!(this.inner.as_mut().poll_ready(cx))?;
            let message = this.outgoing_messages.pop_front().expect("front was just checked");
            this.inner.as_mut().start_send(message)?;
        }

        this.inner.poll_flush(cx).map_err(Into::into)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        ready!(self.as_mut().poll_flush(cx))?;
        self.project().inner.poll_close(cx).map_err(Into::into)
    }
}

/// Decodes the payload of a DISCONNECT message.
///
/// A disconnect may arrive before the hello exchange settled whether the session compresses
/// bodies, so the payload may or may not be snappy-compressed. We try the plain rlp payload
/// first and retry on the decompressed payload. This mirrors a hotfix in the original
/// implementation; see the `disconnect_fallback` tests before attempting to clean this up.
pub(crate) fn decode_disconnect_payload(buf: &[u8]) -> Result<DisconnectReason, P2PStreamError> {
    DisconnectReason::decode(&mut &buf[..]).map_err(P2PStreamError::Rlp).or_else(|_| {
        let decompressed = snap::raw::Decoder::new().decompress_vec(buf)?;
        DisconnectReason::decode(&mut &decompressed[..]).map_err(P2PStreamError::Rlp)
    })
}

/// This represents only the reserved `p2p` subprotocol messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum P2PMessage {
    /// The first packet sent over the connection, and sent once by both sides.
    Hello(HelloMessage),

    /// Inform the peer that a disconnection is imminent; if received, a peer should disconnect
    /// immediately.
    Disconnect(DisconnectReason),

    /// Requests an immediate reply of [`P2PMessage::Pong`] from the peer.
    Ping,

    /// Reply to the peer's [`P2PMessage::Ping`] packet.
    Pong,
}

impl P2PMessage {
    /// Gets the [`P2PMessageID`] for the given message.
    pub fn message_id(&self) -> P2PMessageID {
        match self {
            P2PMessage::Hello(_) => P2PMessageID::Hello,
            P2PMessage::Disconnect(_) => P2PMessageID::Disconnect,
            P2PMessage::Ping => P2PMessageID::Ping,
            P2PMessage::Pong => P2PMessageID::Pong,
        }
    }
}

/// The [`Encodable`] implementation for [`P2PMessage::Ping`], [`P2PMessage::Pong`] and
/// [`P2PMessage::Disconnect`] encodes the `p2p` protocol version 5 wire form, where the payload
/// is snappy-compressed. The hello message is never compressed.
impl Encodable for P2PMessage {
    fn encode(&self, out: &mut dyn bytes::BufMut) {
        out.put_u8(self.message_id() as u8);
        match self {
            P2PMessage::Hello(msg) => msg.encode(out),
            P2PMessage::Disconnect(msg) => {
                // the snappy raw encoding of the 2-byte rlp list: length, literal tag, payload
                out.put_u8(0x02);
                out.put_u8(0x04);
                msg.encode(out);
            }
            P2PMessage::Ping | P2PMessage::Pong => {
                // the payload is the empty rlp string, snappy compressed
                out.put_slice(&SNAPPY_EMPTY_PAYLOAD);
            }
        }
    }

    fn length(&self) -> usize {
        let payload_len = match self {
            P2PMessage::Hello(msg) => msg.length(),
            // snappy header (2) + rlp list (2)
            P2PMessage::Disconnect(_) => 4,
            P2PMessage::Ping | P2PMessage::Pong => SNAPPY_EMPTY_PAYLOAD.len(),
        };
        payload_len + 1 // (1 for length of p2p message id)
    }
}

impl Decodable for P2PMessage {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = buf.first().ok_or(RlpError::InputTooShort)?;
        let id = P2PMessageID::try_from(*first)
            .or(Err(RlpError::Custom("unknown p2p message id")))?;
        buf.advance(1);
        match id {
            P2PMessageID::Hello => Ok(P2PMessage::Hello(HelloMessage::decode(buf)?)),
            P2PMessageID::Disconnect => {
                let reason = decode_disconnect_payload(buf)
                    .map_err(|_| RlpError::Custom("invalid disconnect message"))?;
                buf.advance(buf.len());
                Ok(P2PMessage::Disconnect(reason))
            }
            P2PMessageID::Ping => {
                buf.advance(buf.len().min(SNAPPY_EMPTY_PAYLOAD.len()));
                Ok(P2PMessage::Ping)
            }
            P2PMessageID::Pong => {
                buf.advance(buf.len().min(SNAPPY_EMPTY_PAYLOAD.len()));
                Ok(P2PMessage::Pong)
            }
        }
    }
}

/// Message IDs for `p2p` subprotocol messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum P2PMessageID {
    /// Message ID for the [`P2PMessage::Hello`] message.
    Hello = 0x00,

    /// Message ID for the [`P2PMessage::Disconnect`] message.
    Disconnect = 0x01,

    /// Message ID for the [`P2PMessage::Ping`] message.
    Ping = 0x02,

    /// Message ID for the [`P2PMessage::Pong`] message.
    Pong = 0x03,
}

impl From<&P2PMessage> for P2PMessageID {
    fn from(msg: &P2PMessage) -> Self {
        msg.message_id()
    }
}

impl TryFrom<u8> for P2PMessageID {
    type Error = P2PStreamError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0x00 => Ok(P2PMessageID::Hello),
            0x01 => Ok(P2PMessageID::Disconnect),
            0x02 => Ok(P2PMessageID::Ping),
            0x03 => Ok(P2PMessageID::Pong),
            _ => Err(P2PStreamError::UnknownReservedMessageId(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capability::Capability, EthVersion};
    use elc_primitives::PeerId;

    fn test_hello(caps: Vec<Capability>) -> HelloMessage {
        HelloMessage {
            protocol_version: ProtocolVersion::V5,
            client_version: "elc/0.1.0".to_string(),
            capabilities: caps,
            port: 30303,
            id: PeerId::random(),
        }
    }

    #[test]
    fn test_ping_snappy_encoding_parity() {
        // encode ping using our `Encodable` implementation
        let ping = P2PMessage::Ping;
        let mut ping_encoded = Vec::new();
        ping.encode(&mut ping_encoded);

        // the definition of ping is 0x80 (an empty rlp string)
        let ping_raw = vec![alloy_rlp::EMPTY_STRING_CODE];
        let mut snappy_encoder = snap::raw::Encoder::new();
        let ping_compressed = snappy_encoder.compress_vec(&ping_raw).unwrap();
        let mut ping_expected = vec![P2PMessageID::Ping as u8];
        ping_expected.extend(&ping_compressed);

        // ensure that the two encodings are equal
        assert_eq!(
            ping_expected, ping_encoded,
            "left: {ping_expected:#x?}, right: {ping_encoded:#x?}"
        );

        // also ensure that the length is correct
        assert_eq!(ping_expected.len(), P2PMessage::Ping.length());

        // try to decode using Decodable
        let p2p_message = P2PMessage::decode(&mut &ping_expected[..]).unwrap();
        assert_eq!(p2p_message, P2PMessage::Ping);

        // finally decode the encoded message with snappy
        let mut snappy_decoder = snap::raw::Decoder::new();

        // the message id is not compressed, only compress the latest bits
        let decompressed = snappy_decoder.decompress_vec(&ping_encoded[1..]).unwrap();

        assert_eq!(decompressed, ping_raw);
    }

    #[test]
    fn test_pong_snappy_encoding_parity() {
        let pong = P2PMessage::Pong;
        let mut pong_encoded = Vec::new();
        pong.encode(&mut pong_encoded);

        let pong_raw = vec![alloy_rlp::EMPTY_STRING_CODE];
        let mut snappy_encoder = snap::raw::Encoder::new();
        let pong_compressed = snappy_encoder.compress_vec(&pong_raw).unwrap();
        let mut pong_expected = vec![P2PMessageID::Pong as u8];
        pong_expected.extend(&pong_compressed);

        assert_eq!(
            pong_expected, pong_encoded,
            "left: {pong_expected:#x?}, right: {pong_encoded:#x?}"
        );

        assert_eq!(pong_expected.len(), P2PMessage::Pong.length());

        let p2p_message = P2PMessage::decode(&mut &pong_expected[..]).unwrap();
        assert_eq!(p2p_message, P2PMessage::Pong);

        let mut snappy_decoder = snap::raw::Decoder::new();
        let decompressed = snappy_decoder.decompress_vec(&pong_encoded[1..]).unwrap();

        assert_eq!(decompressed, pong_raw);
    }

    #[test]
    fn test_hello_encoding_round_trip() {
        let hello = P2PMessage::Hello(test_hello(vec![Capability::eth_67()]));

        let mut hello_encoded = Vec::new();
        hello.encode(&mut hello_encoded);

        let hello_decoded = P2PMessage::decode(&mut &hello_encoded[..]).unwrap();

        assert_eq!(hello, hello_decoded);
    }

    #[test]
    fn hello_encoding_length() {
        let hello = P2PMessage::Hello(test_hello(vec![Capability::eth_67()]));

        let mut hello_encoded = Vec::new();
        hello.encode(&mut hello_encoded);

        assert_eq!(hello_encoded.len(), hello.length());
    }

    #[test]
    fn disconnect_message_round_trip() {
        for reason in crate::disconnect::all_reasons() {
            let disconnect = P2PMessage::Disconnect(reason);

            let mut disconnect_encoded = Vec::new();
            disconnect.encode(&mut disconnect_encoded);

            let disconnect_decoded = P2PMessage::decode(&mut &disconnect_encoded[..]).unwrap();

            assert_eq!(disconnect, disconnect_decoded);
            assert_eq!(disconnect_encoded.len(), disconnect.length());
        }
    }

    // The fallback decode order (plain rlp first, decompressed second) is load-bearing: peers
    // may send the disconnect before or after hello settled compression. Do not "simplify".
    #[test]
    fn disconnect_fallback_accepts_both_layouts() {
        let reason = DisconnectReason::TooManyPeers;

        let mut plain = Vec::new();
        reason.encode(&mut plain);
        assert_eq!(decode_disconnect_payload(&plain).unwrap(), reason);

        let compressed = snap::raw::Encoder::new().compress_vec(&plain).unwrap();
        assert_eq!(decode_disconnect_payload(&compressed).unwrap(), reason);
    }

    #[tokio::test]
    async fn test_handshake_passthrough() {
        let (client_io, server_io) = tokio::io::duplex(1024 * 1024);

        let client_hello = test_hello(vec![Capability::eth_66(), Capability::eth_68()]);
        let server_hello = test_hello(vec![Capability::eth_68()]);

        let server_hello_clone = server_hello.clone();
        let server = tokio::spawn(async move {
            let stream = crate::test_utils::framed(server_io);
            let (p2p, their_hello) =
                UnauthedP2PStream::new(stream).handshake(server_hello_clone).await.unwrap();
            assert_eq!(p2p.shared_capabilities().eth_version().unwrap(), EthVersion::Eth68);
            their_hello
        });

        let stream = crate::test_utils::framed(client_io);
        let (p2p, their_hello) =
            UnauthedP2PStream::new(stream).handshake(client_hello).await.unwrap();
        assert_eq!(p2p.shared_capabilities().eth_version().unwrap(), EthVersion::Eth68);
        assert_eq!(their_hello, server_hello);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_no_shared_capabilities() {
        let (client_io, server_io) = tokio::io::duplex(1024 * 1024);

        let client_hello = test_hello(vec![Capability::eth_68()]);
        let server_hello = test_hello(vec![Capability::new("snap".to_string(), 1)]);

        let server = tokio::spawn(async move {
            let stream = crate::test_utils::framed(server_io);
            UnauthedP2PStream::new(stream).handshake(server_hello).await
        });

        let stream = crate::test_utils::framed(client_io);
        let client_res = UnauthedP2PStream::new(stream).handshake(client_hello).await;
        assert!(matches!(
            client_res,
            Err(P2PStreamError::HandshakeError(P2PHandshakeError::NoSharedCapabilities))
        ));

        // the server either also sees the empty intersection or reads our UselessPeer
        // disconnect, depending on timing
        let server_res = server.await.unwrap();
        match server_res {
            Err(P2PStreamError::HandshakeError(P2PHandshakeError::NoSharedCapabilities)) |
            Err(P2PStreamError::HandshakeError(P2PHandshakeError::Disconnected(
                DisconnectReason::UselessPeer,
            ))) => {}
            other => panic!("unexpected server result: {other:?}"),
        }
    }
}
