//! OpenSSL `EVP_BytesToKey` with MD5 and a single iteration.
//!
//! This is the derivation behind `openssl enc -md md5` and CryptoJS's
//! passphrase API. It is weak by modern standards and only kept for the
//! legacy envelope.

use md5::{Digest, Md5};
use zeroize::Zeroize;

use super::cipher::{IV_LEN, SALT_LEN};

/// Key length produced for passphrase mode (AES-256).
pub const PASSPHRASE_KEY_LEN: usize = 32;

/// Key and IV derived from a passphrase and salt. Zeroed on drop.
pub struct DerivedKey {
    pub key: [u8; PASSPHRASE_KEY_LEN],
    pub iv: [u8; IV_LEN],
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

/// Derive an AES-256 key and CBC IV from `passphrase` and `salt`.
///
/// `D_1 = MD5(passphrase ‖ salt)`, `D_i = MD5(D_{i-1} ‖ passphrase ‖ salt)`;
/// the concatenation `D_1 ‖ D_2 ‖ D_3` is split into key (32) and IV (16).
pub fn evp_bytes_to_key(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> DerivedKey {
    let mut material = Vec::with_capacity(PASSPHRASE_KEY_LEN + IV_LEN + 16);
    let mut prev: Option<[u8; 16]> = None;

    while material.len() < PASSPHRASE_KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        if let Some(block) = prev {
            hasher.update(block);
        }
        hasher.update(passphrase);
        hasher.update(salt);
        let block: [u8; 16] = hasher.finalize().into();
        material.extend_from_slice(&block);
        prev = Some(block);
    }

    let mut derived = DerivedKey {
        key: [0u8; PASSPHRASE_KEY_LEN],
        iv: [0u8; IV_LEN],
    };
    derived.key.copy_from_slice(&material[..PASSPHRASE_KEY_LEN]);
    derived
        .iv
        .copy_from_slice(&material[PASSPHRASE_KEY_LEN..PASSPHRASE_KEY_LEN + IV_LEN]);
    material.zeroize();
    derived
}
