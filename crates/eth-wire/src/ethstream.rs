//! The `eth` sub-protocol stream on top of a `p2p` stream.

use crate::{
    errors::{EthHandshakeError, EthStreamError},
    types::{EthMessage, ProtocolMessage, Status},
    EthVersion, P2PStream,
};
use bytes::{Bytes, BytesMut};
use futures::{ready, Sink, SinkExt, StreamExt};
use pin_project::pin_project;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio_stream::Stream;
use tracing::{debug, trace};

/// [`MAX_MESSAGE_SIZE`] is the maximum cap on the size of an `eth` protocol message.
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// An un-authenticated [`EthStream`]. This is consumed and returns a [`EthStream`] after the
/// `Status` handshake is completed.
#[pin_project]
#[derive(Debug)]
pub struct UnauthedEthStream<S> {
    #[pin]
    inner: S,
}

impl<S> UnauthedEthStream<S> {
    /// Create a new `UnauthedEthStream` from a type `S` which implements `Stream` and `Sink`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Consumes the type and returns the wrapped stream
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, E> UnauthedEthStream<S>
where
    S: Stream<Item = Result<BytesMut, E>> + Sink<Bytes, Error = E> + Unpin,
    EthStreamError: From<E>,
{
    /// Consumes the [`UnauthedEthStream`] and returns an [`EthStream`] after the `Status`
    /// handshake is completed successfully. This also returns the `Status` message sent by the
    /// remote peer.
    pub async fn handshake(
        mut self,
        status: Status,
    ) -> Result<(EthStream<S>, Status), EthStreamError> {
        trace!(%status, "sending eth status to peer");

        self.inner
            .send(
                alloy_rlp::encode(ProtocolMessage::from(EthMessage::Status(status))).into(),
            )
            .await?;

        let their_msg_res = self.inner.next().await;

        let their_msg = match their_msg_res {
            Some(msg) => msg,
            None => {
                return Err(EthStreamError::EthHandshakeError(EthHandshakeError::NoResponse))
            }
        }?;

        if their_msg.len() > MAX_MESSAGE_SIZE {
            return Err(EthStreamError::MessageTooBig(their_msg.len()))
        }

        let version = EthVersion::try_from(status.version)?;
        let msg = match ProtocolMessage::decode_message(version, &mut their_msg.as_ref()) {
            Ok(msg) => msg,
            Err(err) => {
                debug!(msg=%alloy_primitives::hex::encode(&their_msg), "decode error in eth handshake");
                return Err(err)
            }
        };

        // the first message sent MUST be the status message
        match msg.message {
            EthMessage::Status(their_status) => {
                trace!("validating incoming eth status from peer");

                if status.genesis != their_status.genesis {
                    return Err(EthHandshakeError::MismatchedGenesis {
                        got: their_status.genesis,
                        expected: status.genesis,
                    }
                    .into())
                }

                if status.version != their_status.version {
                    return Err(EthHandshakeError::MismatchedProtocolVersion {
                        got: their_status.version,
                        expected: status.version,
                    }
                    .into())
                }

                if status.chain != their_status.chain {
                    return Err(EthHandshakeError::MismatchedChain {
                        got: their_status.chain,
                        expected: status.chain,
                    }
                    .into())
                }

                Ok((EthStream::new(version, self.inner), their_status))
            }
            _ => Err(EthStreamError::EthHandshakeError(
                EthHandshakeError::NonStatusMessageInHandshake,
            )),
        }
    }
}

/// An `EthStream` wraps over any `Stream` that yields bytes and makes it compatible with
/// eth-networking protocol messages, which get RLP encoded/decoded.
#[pin_project]
#[derive(Debug)]
pub struct EthStream<S> {
    /// Negotiated eth version.
    version: EthVersion,
    #[pin]
    inner: S,
}

impl<S> EthStream<S> {
    /// Creates a new unauthed [`EthStream`] from a provided stream. You will need to manually
    /// handshake a peer.
    pub fn new(version: EthVersion, inner: S) -> Self {
        Self { version, inner }
    }

    /// Returns the eth version.
    pub fn version(&self) -> EthVersion {
        self.version
    }

    /// Returns the underlying stream.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns mutable access to the underlying stream.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this type and returns the wrapped stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, E> Stream for EthStream<S>
where
    S: Stream<Item = Result<BytesMut, E>> + Unpin,
    EthStreamError: From<E>,
{
    type Item = Result<EthMessage, EthStreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let res = ready!(this.inner.poll_next(cx));
        let bytes = match res {
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => return Poll::Ready(Some(Err(err.into()))),
            None => return Poll::Ready(None),
        };

        if bytes.len() > MAX_MESSAGE_SIZE {
            return Poll::Ready(Some(Err(EthStreamError::MessageTooBig(bytes.len()))))
        }

        let msg = match ProtocolMessage::decode_message(*this.version, &mut bytes.as_ref()) {
            Ok(m) => m,
            Err(err) => {
                debug!(?err, msg=%alloy_primitives::hex::encode(&bytes), "failed to decode protocol message");
                return Poll::Ready(Some(Err(err)))
            }
        };

        if matches!(msg.message, EthMessage::Status(_)) {
            return Poll::Ready(Some(Err(EthStreamError::EthHandshakeError(
                EthHandshakeError::StatusNotInHandshake,
            ))))
        }

        Poll::Ready(Some(Ok(msg.message)))
    }
}

impl<S, E> Sink<EthMessage> for EthStream<S>
where
    S: Sink<Bytes, Error = E> + Unpin,
    EthStreamError: From<E>,
{
    type Error = EthStreamError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_ready(cx).map_err(Into::into)
    }

    fn start_send(self: Pin<&mut Self>, item: EthMessage) -> Result<(), Self::Error> {
        if matches!(item, EthMessage::Status(_)) {
            // a status message can only be sent during the handshake
            return Err(EthStreamError::EthHandshakeError(
                EthHandshakeError::StatusNotInHandshake,
            ))
        }

        self.project()
            .inner
            .start_send(alloy_rlp::encode(ProtocolMessage::from(item)).into())
            .map_err(Into::into)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx).map_err(Into::into)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx).map_err(Into::into)
    }
}

/// Convenience alias: the `eth` stream as it runs in production, layered on a `p2p` stream.
pub type CoreStream<S> = EthStream<P2PStream<S>>;
