//! [`ECIESStream`]: the encrypted byte transport, a [`Stream`]/[`Sink`] of raw frames over any
//! async IO.

use crate::{codec::ECIESCodec, ECIESError, EgressECIESValue, IngressECIESValue};
use bytes::{Bytes, BytesMut};
use elc_primitives::PeerId;
use futures::{ready, Sink, SinkExt};
use secp256k1::SecretKey;
use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_stream::{Stream, StreamExt};
use tokio_util::codec::Framed;
use tracing::{debug, trace};

/// An ECIES-encrypted connection after a completed handshake.
///
/// Yields the decrypted frame bodies of incoming messages; frames handed to the sink side are
/// encrypted, padded and MACed before they hit the socket.
#[derive(Debug)]
pub struct ECIESStream<Io> {
    stream: Framed<Io, ECIESCodec>,
    remote_id: PeerId,
}

impl<Io> ECIESStream<Io>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    /// Dials out: sends our auth and waits for the responder's ack.
    pub async fn connect(
        transport: Io,
        secret_key: SecretKey,
        remote_id: PeerId,
    ) -> Result<Self, ECIESError> {
        let codec = ECIESCodec::new_client(secret_key, remote_id)?;
        let mut stream = Framed::new(transport, codec);

        trace!(peer = %remote_id, "starting ecies handshake as initiator");
        stream.send(EgressECIESValue::Auth).await?;

        match stream.try_next().await? {
            Some(IngressECIESValue::Ack) => {
                trace!(peer = %remote_id, "ecies handshake complete");
                Ok(Self { stream, remote_id })
            }
            msg => Err(ECIESError::InvalidHandshake { expected: IngressECIESValue::Ack, msg }),
        }
    }

    /// Accepts an inbound connection: waits for the initiator's auth and answers with our ack.
    pub async fn incoming(transport: Io, secret_key: SecretKey) -> Result<Self, ECIESError> {
        let codec = ECIESCodec::new_server(secret_key)?;
        let mut stream = Framed::new(transport, codec);

        let remote_id = match stream.try_next().await? {
            Some(IngressECIESValue::AuthReceive(remote_id)) => remote_id,
            msg => {
                return Err(ECIESError::InvalidHandshake {
                    expected: IngressECIESValue::AuthReceive(Default::default()),
                    msg,
                })
            }
        };

        debug!(peer = %remote_id, "answering ecies auth");
        stream.send(EgressECIESValue::Ack).await?;

        Ok(Self { stream, remote_id })
    }

    /// The authenticated identity of the remote peer.
    pub fn remote_id(&self) -> PeerId {
        self.remote_id
    }

    fn framed_mut(self: Pin<&mut Self>) -> Pin<&mut Framed<Io, ECIESCodec>> {
        Pin::new(&mut self.get_mut().stream)
    }
}

impl<Io> Stream for ECIESStream<Io>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    type Item = Result<BytesMut, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = match ready!(self.framed_mut().poll_next(cx)) {
            Some(Ok(IngressECIESValue::Message(body))) => Ok(body),
            Some(Ok(other)) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("handshake message after the handshake finished: {other:?}"),
            )),
            Some(Err(err)) => Err(err.into()),
            None => return Poll::Ready(None),
        };
        Poll::Ready(Some(item))
    }
}

impl<Io> Sink<Bytes> for ECIESStream<Io>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    type Error = io::Error;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.framed_mut().poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
        self.framed_mut().start_send(EgressECIESValue::Message(item))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.framed_mut().poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.framed_mut().poll_close(cx)
    }
}
