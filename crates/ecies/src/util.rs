//! Small crypto helpers shared by the handshake and frame ciphers.

use alloy_primitives::B256;
use elc_primitives::PeerId;
use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, SecretKey};
use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of the given data.
pub fn sha256(data: &[u8]) -> B256 {
    B256::from_slice(&Sha256::digest(data))
}

/// Computes an HMAC-SHA256 over the concatenation of the `input` chunks, keyed with `key`, with
/// `auth_data` appended last.
pub(crate) fn hmac_sha256(key: &[u8], input: &[&[u8]], auth_data: &[u8]) -> B256 {
    let mut hmac = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts all key sizes");
    for input in input {
        hmac.update(input);
    }
    hmac.update(auth_data);
    B256::from_slice(&hmac.finalize().into_bytes())
}

/// The x coordinate of the shared secp256k1 point between the given keypair halves.
pub(crate) fn ecdh_x(public_key: &PublicKey, secret_key: &SecretKey) -> B256 {
    B256::from_slice(&secp256k1::ecdh::shared_secret_point(public_key, secret_key)[..32])
}

/// NIST SP 800-56 concatenation key derivation function, with SHA-256.
pub(crate) fn kdf(secret: B256, s1: &[u8], dest: &mut [u8]) {
    let mut ctr = 1_u32;
    let mut written = 0_usize;
    while written < dest.len() {
        let mut hasher = Sha256::default();
        hasher.update(ctr.to_be_bytes());
        hasher.update(secret.as_slice());
        hasher.update(s1);
        let digest = hasher.finalize();
        let n = std::cmp::min(digest.len(), dest.len() - written);
        dest[written..written + n].copy_from_slice(&digest[..n]);
        written += n;
        ctr += 1;
    }
}

/// Converts a [`PublicKey`] to a [`PeerId`] by stripping the uncompressed-encoding tag byte.
pub fn pk2id(pk: &PublicKey) -> PeerId {
    PeerId::from_slice(&pk.serialize_uncompressed()[1..])
}

/// Converts a [`PeerId`] back to a [`PublicKey`], re-adding the uncompressed-encoding tag byte.
pub fn id2pk(id: PeerId) -> Result<PublicKey, secp256k1::Error> {
    let mut s = [0u8; 65];
    // SECP256K1_TAG_PUBKEY_UNCOMPRESSED = 0x04
    s[0] = 4;
    s[1..].copy_from_slice(id.as_slice());
    PublicKey::from_slice(&s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::SECP256K1;

    #[test]
    fn pk2id2pk() {
        let prikey = SecretKey::new(&mut rand::thread_rng());
        let pubkey = PublicKey::from_secret_key(SECP256K1, &prikey);
        assert_eq!(pubkey, id2pk(pk2id(&pubkey)).unwrap());
    }

    #[test]
    fn kdf_fills_arbitrary_lengths() {
        let secret = B256::repeat_byte(0x11);
        for len in [1_usize, 16, 32, 33, 64] {
            let mut dest = vec![0u8; len];
            kdf(secret, &[], &mut dest);
            assert!(dest.iter().any(|b| *b != 0));
        }
    }
}
