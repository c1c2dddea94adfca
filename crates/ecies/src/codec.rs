//! Tokio codec driving the four ECIES connection states.

use crate::{
    algorithm::{ECIES, LEGACY_ACK_LEN, LEGACY_AUTH_LEN},
    ECIESError, EgressECIESValue, IngressECIESValue,
};
use bytes::BytesMut;
use elc_primitives::PeerId;
use secp256k1::SecretKey;
use std::io;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Frame bodies above this size are refused on egress, per EIP-706.
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Which message the connection expects next.
///
/// `Auth` and `Ack` each occur once, in opposite directions depending on who dialed; after
/// that the connection alternates between `Header` and `Body` until it closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ECIESState {
    /// Expecting the initiator's auth message.
    Auth,
    /// Expecting the responder's ack message.
    Ack,
    /// Expecting an encrypted frame header.
    Header,
    /// Expecting the frame body the last header announced.
    Body,
}

/// Determines how many buffered bytes the next handshake message occupies, or `None` while the
/// buffer cannot tell yet.
///
/// A pre-EIP-8 message leads with the uncompressed-pubkey tag `0x04` and has a fixed total
/// size; anything else is EIP-8, where a 2-byte big-endian prefix carries the payload size.
/// Returns the total size and whether the legacy layout applies.
fn handshake_frame_len(buf: &[u8], legacy_len: usize) -> Option<(usize, bool)> {
    match *buf.first()? {
        0x04 => (buf.len() >= legacy_len).then_some((legacy_len, true)),
        _ => {
            if buf.len() < 2 {
                return None
            }
            let total = u16::from_be_bytes([buf[0], buf[1]]) as usize + 2;
            (buf.len() >= total).then_some((total, false))
        }
    }
}

/// Tokio codec for ECIES
#[derive(Debug)]
pub struct ECIESCodec {
    ecies: ECIES,
    state: ECIESState,
}

impl ECIESCodec {
    /// Create a new server codec using the given secret key
    pub fn new_server(secret_key: SecretKey) -> Result<Self, ECIESError> {
        Ok(Self { ecies: ECIES::new_server(secret_key)?, state: ECIESState::Auth })
    }

    /// Create a new client codec using the given secret key and the server's public id
    pub fn new_client(secret_key: SecretKey, remote_id: PeerId) -> Result<Self, ECIESError> {
        Ok(Self { ecies: ECIES::new_client(secret_key, remote_id)?, state: ECIESState::Auth })
    }

    /// Returns the remote peer's id, if known.
    pub(crate) fn remote_id(&self) -> Option<PeerId> {
        self.ecies.remote_id
    }
}

impl Decoder for ECIESCodec {
    type Item = IngressECIESValue;
    type Error = ECIESError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ECIESState::Auth => {
                    let Some((len, legacy)) = handshake_frame_len(buf, LEGACY_AUTH_LEN) else {
                        return Ok(None)
                    };
                    trace!(len, legacy, "reading incoming auth");

                    let mut message = buf.split_to(len);
                    if legacy {
                        self.ecies.read_auth_plain(&mut message)?;
                    } else {
                        self.ecies.read_auth(&mut message)?;
                    }

                    self.state = ECIESState::Header;
                    return Ok(Some(IngressECIESValue::AuthReceive(self.ecies.remote_id())))
                }
                ECIESState::Ack => {
                    let Some((len, legacy)) = handshake_frame_len(buf, LEGACY_ACK_LEN) else {
                        return Ok(None)
                    };
                    trace!(len, legacy, "reading incoming ack");

                    let mut message = buf.split_to(len);
                    if legacy {
                        self.ecies.read_ack_plain(&mut message)?;
                    } else {
                        self.ecies.read_ack(&mut message)?;
                    }

                    self.state = ECIESState::Header;
                    return Ok(Some(IngressECIESValue::Ack))
                }
                ECIESState::Header => {
                    if buf.len() < ECIES::header_len() {
                        return Ok(None)
                    }

                    self.ecies.read_header(&mut buf.split_to(ECIES::header_len()))?;
                    // no value to surface yet, the header only sizes the body that follows
                    self.state = ECIESState::Body;
                }
                ECIESState::Body => {
                    let body_len = self.ecies.body_len();
                    if buf.len() < body_len {
                        return Ok(None)
                    }

                    let mut data = buf.split_to(body_len);
                    let frame = self.ecies.read_body(&mut data)?;
                    let mut ret = BytesMut::with_capacity(frame.len());
                    ret.extend_from_slice(frame);

                    self.state = ECIESState::Header;
                    return Ok(Some(IngressECIESValue::Message(ret)))
                }
            }
        }
    }
}

impl Encoder<EgressECIESValue> for ECIESCodec {
    type Error = io::Error;

    fn encode(&mut self, item: EgressECIESValue, buf: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            EgressECIESValue::Auth => {
                self.state = ECIESState::Ack;
                self.ecies.write_auth(buf);
            }
            EgressECIESValue::Ack => {
                self.state = ECIESState::Header;
                self.ecies.write_ack(buf);
            }
            EgressECIESValue::Message(data) => {
                if data.len() > MAX_BODY_SIZE {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "refusing to send a {} byte frame, the limit is {MAX_BODY_SIZE} bytes",
                            data.len()
                        ),
                    ))
                }

                self.ecies.write_header(buf, data.len());
                self.ecies.write_body(buf, &data);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_sizing() {
        // legacy auth: fixed size, gated on the buffer holding all of it
        let mut legacy = vec![0x04u8; LEGACY_AUTH_LEN - 1];
        assert_eq!(handshake_frame_len(&legacy, LEGACY_AUTH_LEN), None);
        legacy.push(0x00);
        assert_eq!(handshake_frame_len(&legacy, LEGACY_AUTH_LEN), Some((LEGACY_AUTH_LEN, true)));

        // EIP-8: two length bytes plus the announced payload
        assert_eq!(handshake_frame_len(&[], LEGACY_AUTH_LEN), None);
        assert_eq!(handshake_frame_len(&[0x01], LEGACY_AUTH_LEN), None);
        let mut eip8 = vec![0x00, 0x03, 0xaa, 0xbb];
        assert_eq!(handshake_frame_len(&eip8, LEGACY_AUTH_LEN), None);
        eip8.push(0xcc);
        assert_eq!(handshake_frame_len(&eip8, LEGACY_AUTH_LEN), Some((5, false)));
    }
}
