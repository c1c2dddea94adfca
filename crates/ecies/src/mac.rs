//! The keccak/AES frame MAC of the RLPx transport.

use aes::Aes256Enc;
use alloy_primitives::{B128, B256};
use block_padding::NoPadding;
use cipher::{BlockEncrypt, KeyInit};
use core::fmt;
use generic_array::GenericArray;
use sha3::{Digest, Keccak256};
use typenum::U16;

/// One 16-byte chunk of MAC input, the size of an encrypted frame header.
pub type HeaderBytes = GenericArray<u8, U16>;

/// Per-direction frame MAC state.
///
/// devp2p does not use an off-the-shelf MAC. Each direction keeps a running keccak256 that is
/// ratcheted once per frame header and once per frame body: the current digest is pushed
/// through AES-256 keyed with the mac-secret (a single raw block, no cipher mode), xor-folded
/// with the new input, and absorbed back into the hash. The tag that goes on the wire is
/// always the first half of the current digest.
pub struct MAC {
    /// AES-256 keyed with the mac-secret, applied blockwise during the ratchet.
    cipher: Aes256Enc,
    /// The running keccak256 state.
    hasher: Keccak256,
}

impl MAC {
    /// Creates the MAC state from the shared mac-secret.
    pub fn new(secret: B256) -> Self {
        Self {
            cipher: Aes256Enc::new_from_slice(secret.as_slice()).expect("the secret is 32 bytes"),
            hasher: Keccak256::new(),
        }
    }

    /// Absorbs raw bytes without ratcheting. Only used while seeding the state with the nonce
    /// and init messages.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Ratchets the state with an encrypted frame header.
    pub fn update_header(&mut self, header: &HeaderBytes) {
        let folded = self.fold(header.as_slice());
        self.hasher.update(folded);
    }

    /// Ratchets the state with an encrypted frame body: the body bytes are absorbed first,
    /// then the digest is folded with itself.
    pub fn update_body(&mut self, body: &[u8]) {
        self.hasher.update(body);
        let tag = self.digest();
        let folded = self.fold(tag.as_slice());
        self.hasher.update(folded);
    }

    /// The current 128-bit tag.
    pub fn digest(&self) -> B128 {
        B128::from_slice(&self.hasher.clone().finalize()[..16])
    }

    /// The ratchet step shared by the header and body paths: encrypt the current digest as one
    /// AES block and xor `input` into it.
    fn fold(&self, input: &[u8]) -> [u8; 16] {
        let mut block = self.digest().0;
        let len = block.len();
        self.cipher
            .encrypt_padded::<NoPadding>(&mut block, len)
            .expect("the digest is exactly one cipher block");
        for (byte, mixed) in block.iter_mut().zip(input) {
            *byte ^= mixed;
        }
        block
    }
}

impl fmt::Debug for MAC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MAC").field("digest", &self.digest()).finish_non_exhaustive()
    }
}
