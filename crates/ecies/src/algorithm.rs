#![allow(missing_docs)]

use crate::{
    error::ECIESError,
    mac::{HeaderBytes, MAC},
    util::{ecdh_x, hmac_sha256, id2pk, kdf, pk2id, sha256},
};
use aes::{Aes128, Aes256};
use alloy_primitives::{keccak256, B128, B256};
use alloy_rlp::{Encodable, Rlp, RlpEncodable};
use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use ctr::cipher::{KeyIvInit, StreamCipher};
use elc_primitives::PeerId;
use rand::{thread_rng, Rng};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SecretKey, SECP256K1,
};

type Aes128Ctr64BE = ctr::Ctr64BE<Aes128>;
type Aes256Ctr64BE = ctr::Ctr64BE<Aes256>;

/// The RLPx protocol version carried in the auth and ack bodies.
const PROTOCOL_VERSION: u8 = 4;

/// Total ciphertext size of a pre-EIP-8 auth message:
/// 65 (ephemeral pubkey) + 16 (iv) + 194 (plain body) + 32 (tag).
pub const LEGACY_AUTH_LEN: usize = 307;

/// Total ciphertext size of a pre-EIP-8 ack message:
/// 65 (ephemeral pubkey) + 16 (iv) + 97 (plain body) + 32 (tag).
pub const LEGACY_ACK_LEN: usize = 210;

fn xor(a: B256, b: B256) -> B256 {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a[i] ^ b[i];
    }
    B256::from(out)
}

/// The ECIES state of a connection: handshake key material while the handshake is in flight,
/// frame ciphers and MAC ratchets afterwards.
pub struct ECIES {
    secret_key: SecretKey,
    public_key: PublicKey,
    remote_public_key: Option<PublicKey>,

    pub(crate) remote_id: Option<PeerId>,

    ephemeral_secret_key: SecretKey,
    ephemeral_public_key: PublicKey,
    ephemeral_shared_secret: Option<B256>,
    remote_ephemeral_public_key: Option<PublicKey>,

    nonce: B256,
    remote_nonce: Option<B256>,

    init_msg: Option<Bytes>,
    remote_init_msg: Option<Bytes>,

    body_size: Option<usize>,

    egress_aes: Option<Aes256Ctr64BE>,
    ingress_aes: Option<Aes256Ctr64BE>,
    egress_mac: Option<MAC>,
    ingress_mac: Option<MAC>,
}

impl core::fmt::Debug for ECIES {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ECIES")
            .field("public_key", &self.public_key)
            .field("remote_id", &self.remote_id)
            .finish_non_exhaustive()
    }
}

impl ECIES {
    fn new_static_client(
        secret_key: SecretKey,
        remote_id: PeerId,
        nonce: B256,
        ephemeral_secret_key: SecretKey,
    ) -> Result<Self, ECIESError> {
        let public_key = PublicKey::from_secret_key(SECP256K1, &secret_key);
        let remote_public_key = id2pk(remote_id)?;
        let ephemeral_public_key = PublicKey::from_secret_key(SECP256K1, &ephemeral_secret_key);

        Ok(Self {
            secret_key,
            public_key,
            ephemeral_secret_key,
            ephemeral_public_key,
            nonce,

            remote_public_key: Some(remote_public_key),
            remote_ephemeral_public_key: None,
            remote_nonce: None,
            ephemeral_shared_secret: None,
            init_msg: None,
            remote_init_msg: None,

            remote_id: Some(remote_id),

            body_size: None,
            egress_aes: None,
            ingress_aes: None,
            egress_mac: None,
            ingress_mac: None,
        })
    }

    /// Create a new client with the given static secret key, dialing the given remote peer.
    pub fn new_client(secret_key: SecretKey, remote_id: PeerId) -> Result<Self, ECIESError> {
        let nonce = B256::random();
        let ephemeral_secret_key = SecretKey::new(&mut thread_rng());
        Self::new_static_client(secret_key, remote_id, nonce, ephemeral_secret_key)
    }

    /// Create a new server with the given static secret key, awaiting an incoming auth.
    pub fn new_server(secret_key: SecretKey) -> Result<Self, ECIESError> {
        let public_key = PublicKey::from_secret_key(SECP256K1, &secret_key);
        let nonce = B256::random();
        let ephemeral_secret_key = SecretKey::new(&mut thread_rng());
        let ephemeral_public_key = PublicKey::from_secret_key(SECP256K1, &ephemeral_secret_key);

        Ok(Self {
            secret_key,
            public_key,
            ephemeral_secret_key,
            ephemeral_public_key,
            nonce,

            remote_public_key: None,
            remote_ephemeral_public_key: None,
            remote_nonce: None,
            ephemeral_shared_secret: None,
            init_msg: None,
            remote_init_msg: None,

            remote_id: None,

            body_size: None,
            egress_aes: None,
            ingress_aes: None,
            egress_mac: None,
            ingress_mac: None,
        })
    }

    /// Return the remote's peer id, if known.
    pub fn remote_id(&self) -> PeerId {
        self.remote_id.expect("peer id must be set after the auth message")
    }

    fn encrypt_message(&self, data: &[u8], out: &mut BytesMut, auth_data: &[u8]) {
        out.reserve(65 + 16 + data.len() + 32);

        let secret_key = SecretKey::new(&mut thread_rng());
        out.extend_from_slice(
            &PublicKey::from_secret_key(SECP256K1, &secret_key).serialize_uncompressed(),
        );

        let x = ecdh_x(&self.remote_public_key.expect("remote public key is set"), &secret_key);
        let mut key = [0u8; 32];
        kdf(x, &[], &mut key);

        let enc_key = B128::from_slice(&key[..16]);
        let mac_key = sha256(&key[16..32]);

        let iv = B128::random();
        let mut encryptor = Aes128Ctr64BE::new((&enc_key.0).into(), (&iv.0).into());

        let mut encrypted = data.to_vec();
        encryptor.apply_keystream(&mut encrypted);

        let tag = hmac_sha256(mac_key.as_ref(), &[iv.as_slice(), &encrypted], auth_data);

        out.extend_from_slice(iv.as_slice());
        out.extend_from_slice(&encrypted);
        out.extend_from_slice(tag.as_ref());
    }

    fn decrypt_message<'a>(
        &self,
        data: &'a mut [u8],
        auth_data_len: usize,
    ) -> Result<&'a mut [u8], ECIESError> {
        if data.len() < auth_data_len + 65 + 16 + 32 {
            return Err(ECIESError::InvalidAuthData)
        }
        let (auth_data, encrypted) = data.split_at_mut(auth_data_len);
        let (pubkey_bytes, encrypted) = encrypted.split_at_mut(65);
        let public_key = PublicKey::from_slice(pubkey_bytes)?;
        let (data_iv, tag_bytes) = encrypted.split_at_mut(encrypted.len() - 32);
        let (iv, encrypted_data) = data_iv.split_at_mut(16);
        let tag = B256::from_slice(tag_bytes);

        let x = ecdh_x(&public_key, &self.secret_key);
        let mut key = [0u8; 32];
        kdf(x, &[], &mut key);
        let enc_key = B128::from_slice(&key[..16]);
        let mac_key = sha256(&key[16..32]);

        let check_tag = hmac_sha256(mac_key.as_ref(), &[iv, encrypted_data], auth_data);
        if check_tag != tag {
            return Err(ECIESError::TagCheckDecryptFailed)
        }

        let decrypted_data = encrypted_data;

        let iv = B128::from_slice(iv);
        let mut decryptor = Aes128Ctr64BE::new((&enc_key.0).into(), (&iv.0).into());
        decryptor.apply_keystream(decrypted_data);

        Ok(decrypted_data)
    }

    fn create_auth_unencrypted(&self) -> BytesMut {
        // the initiator signs `ecdh(remote-pubk, static-privk) ^ initiator-nonce` with its
        // ephemeral key so the recipient can recover the ephemeral public key
        let x = ecdh_x(&self.remote_public_key.expect("remote public key is set"), &self.secret_key);
        let msg = xor(x, self.nonce);
        let (rec_id, sig_bytes) = SECP256K1
            .sign_ecdsa_recoverable(&Message::from_digest(msg.0), &self.ephemeral_secret_key)
            .serialize_compact();

        let mut sig = [0u8; 65];
        sig[..64].copy_from_slice(&sig_bytes);
        sig[64] = rec_id.to_i32() as u8;

        let id = pk2id(&self.public_key);

        #[derive(RlpEncodable)]
        struct S<'a> {
            sig_bytes: &'a [u8; 65],
            id: &'a PeerId,
            nonce: &'a B256,
            protocol_version: u8,
        }

        let mut out = BytesMut::new();
        S { sig_bytes: &sig, id: &id, nonce: &self.nonce, protocol_version: PROTOCOL_VERSION }
            .encode(&mut out);

        // EIP-8 requires at least 100 bytes of junk to defeat layout fingerprinting
        out.resize(out.len() + thread_rng().gen_range(100..=300), 0);
        out
    }

    /// Writes an EIP-8 auth message (2-byte big-endian size prefix, ECIES-encrypted RLP body) to
    /// `buf`.
    pub fn write_auth(&mut self, buf: &mut BytesMut) {
        let unencrypted = self.create_auth_unencrypted();

        let mut out = buf.split_off(buf.len());
        out.put_u16(0);

        let mut encrypted = out.split_off(out.len());
        let total_size =
            u16::try_from(65 + 16 + unencrypted.len() + 32).expect("auth message fits in u16");
        self.encrypt_message(&unencrypted, &mut encrypted, &total_size.to_be_bytes());

        let len_bytes = total_size.to_be_bytes();
        out[..len_bytes.len()].copy_from_slice(&len_bytes);

        out.unsplit(encrypted);
        self.init_msg = Some(Bytes::copy_from_slice(&out));

        buf.unsplit(out);
    }

    fn create_auth_plain_unencrypted(&self) -> BytesMut {
        let x = ecdh_x(&self.remote_public_key.expect("remote public key is set"), &self.secret_key);
        let msg = xor(x, self.nonce);
        let (rec_id, sig_bytes) = SECP256K1
            .sign_ecdsa_recoverable(&Message::from_digest(msg.0), &self.ephemeral_secret_key)
            .serialize_compact();

        // sig (65) ‖ keccak(ephemeral-id) (32) ‖ static-id (64) ‖ nonce (32) ‖ 0x00
        let mut out = BytesMut::with_capacity(194);
        out.extend_from_slice(&sig_bytes);
        out.put_u8(rec_id.to_i32() as u8);
        out.extend_from_slice(keccak256(pk2id(&self.ephemeral_public_key)).as_slice());
        out.extend_from_slice(pk2id(&self.public_key).as_slice());
        out.extend_from_slice(self.nonce.as_slice());
        out.put_u8(0x00);
        out
    }

    /// Writes a pre-EIP-8 auth message (no size prefix, fixed layout) to `buf`.
    pub fn write_auth_plain(&mut self, buf: &mut BytesMut) {
        let unencrypted = self.create_auth_plain_unencrypted();

        let mut out = buf.split_off(buf.len());
        self.encrypt_message(&unencrypted, &mut out, &[]);

        self.init_msg = Some(Bytes::copy_from_slice(&out));
        buf.unsplit(out);
    }

    fn parse_auth_unencrypted(&mut self, data: &[u8]) -> Result<(), ECIESError> {
        let mut data = Rlp::new(data)?;

        let sigdata = data.get_next::<[u8; 65]>()?.ok_or(ECIESError::InvalidAuthData)?;
        let signature = RecoverableSignature::from_compact(
            &sigdata[..64],
            RecoveryId::from_i32(sigdata[64] as i32)?,
        )?;
        let remote_id = data.get_next::<PeerId>()?.ok_or(ECIESError::InvalidAuthData)?;
        let remote_nonce = data.get_next::<B256>()?.ok_or(ECIESError::InvalidAuthData)?;

        self.finish_parse_auth(signature, remote_id, remote_nonce)
    }

    fn parse_auth_plain_unencrypted(&mut self, data: &[u8]) -> Result<(), ECIESError> {
        if data.len() != 194 {
            return Err(ECIESError::InvalidAuthData)
        }
        let signature =
            RecoverableSignature::from_compact(&data[..64], RecoveryId::from_i32(data[64] as i32)?)?;
        // data[65..97] is keccak(ephemeral-id), recomputed below from the recovered key
        let remote_id = PeerId::from_slice(&data[97..161]);
        let remote_nonce = B256::from_slice(&data[161..193]);

        self.finish_parse_auth(signature, remote_id, remote_nonce)
    }

    fn finish_parse_auth(
        &mut self,
        signature: RecoverableSignature,
        remote_id: PeerId,
        remote_nonce: B256,
    ) -> Result<(), ECIESError> {
        self.remote_id = Some(remote_id);
        self.remote_public_key = Some(id2pk(remote_id)?);
        self.remote_nonce = Some(remote_nonce);

        let x = ecdh_x(&self.remote_public_key.expect("just set"), &self.secret_key);
        let msg = xor(x, remote_nonce);
        self.remote_ephemeral_public_key =
            Some(SECP256K1.recover_ecdsa(&Message::from_digest(msg.0), &signature)?);
        self.ephemeral_shared_secret = Some(ecdh_x(
            &self.remote_ephemeral_public_key.expect("just set"),
            &self.ephemeral_secret_key,
        ));
        Ok(())
    }

    /// Reads and parses an EIP-8 auth message (including the size prefix) from `data`.
    pub fn read_auth(&mut self, data: &mut [u8]) -> Result<(), ECIESError> {
        self.remote_init_msg = Some(Bytes::copy_from_slice(data));
        let unencrypted = self.decrypt_message(data, 2)?;
        self.parse_auth_unencrypted(unencrypted)
    }

    /// Reads and parses a pre-EIP-8 auth message from `data`.
    pub fn read_auth_plain(&mut self, data: &mut [u8]) -> Result<(), ECIESError> {
        self.remote_init_msg = Some(Bytes::copy_from_slice(data));
        let unencrypted = self.decrypt_message(data, 0)?;
        self.parse_auth_plain_unencrypted(unencrypted)
    }

    fn create_ack_unencrypted(&self) -> BytesMut {
        #[derive(RlpEncodable)]
        struct S<'a> {
            id: &'a PeerId,
            nonce: &'a B256,
            protocol_version: u8,
        }

        let mut out = BytesMut::new();
        S {
            id: &pk2id(&self.ephemeral_public_key),
            nonce: &self.nonce,
            protocol_version: PROTOCOL_VERSION,
        }
        .encode(&mut out);

        out.resize(out.len() + thread_rng().gen_range(100..=300), 0);
        out
    }

    /// Writes an EIP-8 ack message to `buf` and sets up the frame ciphers for the responder
    /// side.
    pub fn write_ack(&mut self, out: &mut BytesMut) {
        let unencrypted = self.create_ack_unencrypted();

        let mut buf = out.split_off(out.len());

        // reserve space for the size prefix
        buf.put_u16(0);

        let mut encrypted = buf.split_off(buf.len());
        let total_size =
            u16::try_from(65 + 16 + unencrypted.len() + 32).expect("ack message fits in u16");
        self.encrypt_message(&unencrypted, &mut encrypted, &total_size.to_be_bytes());

        buf[..2].copy_from_slice(&total_size.to_be_bytes());
        buf.unsplit(encrypted);

        self.init_msg = Some(Bytes::copy_from_slice(&buf));
        out.unsplit(buf);

        self.setup_frame(true);
    }

    fn create_ack_plain_unencrypted(&self) -> BytesMut {
        // ephemeral-id (64) ‖ nonce (32) ‖ 0x00
        let mut out = BytesMut::with_capacity(97);
        out.extend_from_slice(pk2id(&self.ephemeral_public_key).as_slice());
        out.extend_from_slice(self.nonce.as_slice());
        out.put_u8(0x00);
        out
    }

    /// Writes a pre-EIP-8 ack message to `buf` and sets up the frame ciphers for the responder
    /// side.
    pub fn write_ack_plain(&mut self, out: &mut BytesMut) {
        let unencrypted = self.create_ack_plain_unencrypted();

        let mut buf = out.split_off(out.len());
        self.encrypt_message(&unencrypted, &mut buf, &[]);

        self.init_msg = Some(Bytes::copy_from_slice(&buf));
        out.unsplit(buf);

        self.setup_frame(true);
    }

    fn parse_ack_unencrypted(&mut self, data: &[u8]) -> Result<(), ECIESError> {
        let mut data = Rlp::new(data)?;
        self.remote_ephemeral_public_key =
            Some(id2pk(data.get_next::<PeerId>()?.ok_or(ECIESError::InvalidAckData)?)?);
        self.remote_nonce = Some(data.get_next::<B256>()?.ok_or(ECIESError::InvalidAckData)?);

        self.ephemeral_shared_secret = Some(ecdh_x(
            &self.remote_ephemeral_public_key.expect("just set"),
            &self.ephemeral_secret_key,
        ));
        Ok(())
    }

    fn parse_ack_plain_unencrypted(&mut self, data: &[u8]) -> Result<(), ECIESError> {
        if data.len() != 97 {
            return Err(ECIESError::InvalidAckData)
        }
        self.remote_ephemeral_public_key = Some(id2pk(PeerId::from_slice(&data[..64]))?);
        self.remote_nonce = Some(B256::from_slice(&data[64..96]));

        self.ephemeral_shared_secret = Some(ecdh_x(
            &self.remote_ephemeral_public_key.expect("just set"),
            &self.ephemeral_secret_key,
        ));
        Ok(())
    }

    /// Reads and parses an EIP-8 ack message (including the size prefix) and sets up the frame
    /// ciphers for the initiator side.
    pub fn read_ack(&mut self, data: &mut [u8]) -> Result<(), ECIESError> {
        self.remote_init_msg = Some(Bytes::copy_from_slice(data));
        let unencrypted = self.decrypt_message(data, 2)?;
        self.parse_ack_unencrypted(unencrypted)?;
        self.setup_frame(false);
        Ok(())
    }

    /// Reads and parses a pre-EIP-8 ack message and sets up the frame ciphers for the initiator
    /// side.
    pub fn read_ack_plain(&mut self, data: &mut [u8]) -> Result<(), ECIESError> {
        self.remote_init_msg = Some(Bytes::copy_from_slice(data));
        let unencrypted = self.decrypt_message(data, 0)?;
        self.parse_ack_plain_unencrypted(unencrypted)?;
        self.setup_frame(false);
        Ok(())
    }

    fn setup_frame(&mut self, incoming: bool) {
        let remote_nonce = self.remote_nonce.expect("remote nonce is set after auth/ack");
        let ephemeral_shared_secret =
            self.ephemeral_shared_secret.expect("shared secret is set after auth/ack");

        let h_nonce: B256 = if incoming {
            keccak256([remote_nonce.as_slice(), self.nonce.as_slice()].concat())
        } else {
            keccak256([self.nonce.as_slice(), remote_nonce.as_slice()].concat())
        };

        let iv = B128::ZERO;
        let shared_secret: B256 =
            keccak256([ephemeral_shared_secret.as_slice(), h_nonce.as_slice()].concat());

        let aes_secret: B256 =
            keccak256([ephemeral_shared_secret.as_slice(), shared_secret.as_slice()].concat());
        self.ingress_aes = Some(Aes256Ctr64BE::new((&aes_secret.0).into(), (&iv.0).into()));
        self.egress_aes = Some(Aes256Ctr64BE::new((&aes_secret.0).into(), (&iv.0).into()));

        let mac_secret: B256 =
            keccak256([ephemeral_shared_secret.as_slice(), aes_secret.as_slice()].concat());
        self.ingress_mac = Some(MAC::new(mac_secret));
        self.ingress_mac.as_mut().expect("just set").update(xor(mac_secret, self.nonce).as_ref());
        self.ingress_mac
            .as_mut()
            .expect("just set")
            .update(self.remote_init_msg.as_ref().expect("remote init message is recorded"));

        self.egress_mac = Some(MAC::new(mac_secret));
        self.egress_mac.as_mut().expect("just set").update(xor(mac_secret, remote_nonce).as_ref());
        self.egress_mac
            .as_mut()
            .expect("just set")
            .update(self.init_msg.as_ref().expect("init message is recorded"));
    }

    /// Encrypts and MACs a frame header announcing a body of `size` bytes.
    pub fn write_header(&mut self, out: &mut BytesMut, size: usize) {
        let mut buf = [0u8; 16];
        BigEndian::write_uint(&mut buf, size as u64, 3);
        // the remainder of the header is a zero capability id and context id: rlp [0, 0]
        buf[3..6].copy_from_slice(&[194, 128, 128]);

        let mut header: HeaderBytes = buf.into();
        self.egress_aes.as_mut().expect("frame ciphers are set up").apply_keystream(&mut header);
        self.egress_mac.as_mut().expect("frame ciphers are set up").update_header(&header);
        let tag = self.egress_mac.as_ref().expect("frame ciphers are set up").digest();

        out.reserve(Self::header_len());
        out.extend_from_slice(&header);
        out.extend_from_slice(tag.as_slice());
    }

    /// Checks the header MAC and decrypts the 24-bit body size from a 32-byte header.
    pub fn read_header(&mut self, data: &mut [u8]) -> Result<usize, ECIESError> {
        let (header_bytes, mac_bytes) = data.split_at_mut(16);
        let header = HeaderBytes::from_mut_slice(header_bytes);
        let mac = B128::from_slice(&mac_bytes[..16]);

        self.ingress_mac.as_mut().expect("frame ciphers are set up").update_header(header);
        let check_mac = self.ingress_mac.as_ref().expect("frame ciphers are set up").digest();
        if check_mac != mac {
            return Err(ECIESError::TagCheckHeaderFailed)
        }

        self.ingress_aes.as_mut().expect("frame ciphers are set up").apply_keystream(header);
        if header.as_slice().len() < 3 {
            return Err(ECIESError::InvalidHeader)
        }

        let body_size = usize::try_from(BigEndian::read_uint(header.as_slice(), 3))
            .map_err(|_| ECIESError::InvalidHeader)?;
        self.body_size = Some(body_size);

        Ok(body_size)
    }

    /// The wire size of an encrypted header (header + MAC).
    pub const fn header_len() -> usize {
        32
    }

    /// The wire size of the next body (padded body + MAC), valid after a header was read.
    pub fn body_len(&self) -> usize {
        let len = self.body_size.expect("body size is set after read_header");
        (if len % 16 == 0 { len } else { (len / 16 + 1) * 16 }) + 16
    }

    /// Pads, encrypts and MACs a frame body.
    pub fn write_body(&mut self, out: &mut BytesMut, data: &[u8]) {
        let len = if data.len() % 16 == 0 { data.len() } else { (data.len() / 16 + 1) * 16 };
        let old_len = out.len();
        out.resize(old_len + len, 0);

        let encrypted = &mut out[old_len..old_len + len];
        encrypted[..data.len()].copy_from_slice(data);

        self.egress_aes.as_mut().expect("frame ciphers are set up").apply_keystream(encrypted);
        self.egress_mac.as_mut().expect("frame ciphers are set up").update_body(encrypted);
        let tag = self.egress_mac.as_ref().expect("frame ciphers are set up").digest();

        out.extend_from_slice(tag.as_slice());
    }

    /// Checks the body MAC and decrypts a padded frame body in place, returning the unpadded
    /// frame.
    pub fn read_body<'a>(&mut self, data: &'a mut [u8]) -> Result<&'a mut [u8], ECIESError> {
        let (body, mac_bytes) = data.split_at_mut(data.len() - 16);
        let mac = B128::from_slice(mac_bytes);
        self.ingress_mac.as_mut().expect("frame ciphers are set up").update_body(body);
        let check_mac = self.ingress_mac.as_ref().expect("frame ciphers are set up").digest();
        if check_mac != mac {
            return Err(ECIESError::TagCheckBodyFailed)
        }

        let size = self.body_size.expect("body size is set after read_header");
        self.body_size = None;
        let ret = body;
        self.ingress_aes.as_mut().expect("frame ciphers are set up").apply_keystream(ret);
        Ok(ret.split_at_mut(size).0)
    }
}
