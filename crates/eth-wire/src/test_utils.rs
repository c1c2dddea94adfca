//! Helpers shared by the stream tests.

use bytes::{Bytes, BytesMut};
use futures::{Sink, Stream};
use std::fmt::Debug;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Wraps raw IO into a length-delimited byte transport with the `Stream`/`Sink` shape the
/// unauthed streams expect, standing in for an ECIES transport.
pub(crate) fn framed<T>(
    io: T,
) -> impl Stream<Item = io::Result<BytesMut>> + Sink<Bytes, Error = io::Error> + Unpin + Debug
where
    T: AsyncRead + AsyncWrite + Unpin + Debug,
{
    Framed::new(io, LengthDelimitedCodec::new())
}
