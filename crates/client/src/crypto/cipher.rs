//! AES-CBC with PKCS#7 padding under the two key-handling conventions.
//!
//! **Passphrase mode** derives key and IV from the shared secret and a random
//! 8-byte salt via [`evp_bytes_to_key`]. The salt travels inside the output:
//!
//! ```text
//! base64( "Salted__" ‖ salt[8] ‖ ciphertext )
//! ```
//!
//! **Raw-key mode** uses the secret's bytes directly as an AES-128/192/256 key
//! and a caller-supplied random IV that travels next to the ciphertext.
//!
//! CBC is unauthenticated. A flipped ciphertext byte is caught here only if it
//! breaks the padding; otherwise it surfaces later when the plaintext fails to
//! parse as JSON.

use std::sync::Arc;

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::warn;

use super::kdf::evp_bytes_to_key;
use super::secret::SharedSecret;

/// AES block length in bytes.
pub const BLOCK_LEN: usize = 16;

/// CBC IV length in bytes.
pub const IV_LEN: usize = 16;

/// Passphrase-mode salt length in bytes.
pub const SALT_LEN: usize = 8;

/// Marker that opens every passphrase-mode payload.
pub const SALTED_MAGIC: &[u8; 8] = b"Salted__";

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The key is not 16, 24 or 32 bytes.
    #[error("invalid AES key length: {0} bytes")]
    InvalidKeyLength(usize),

    /// The IV is not valid hex or does not decode to exactly 16 bytes.
    #[error("IV must be exactly {IV_LEN} bytes of hex")]
    InvalidIv,

    /// The ciphertext string is not valid base64.
    #[error("ciphertext is not valid base64")]
    InvalidEncoding,

    /// The passphrase payload lacks the `Salted__` header.
    #[error("passphrase ciphertext is missing its salt header")]
    MissingSalt,

    /// The ciphertext is empty or not a whole number of blocks.
    #[error("ciphertext length {0} is not a positive multiple of {BLOCK_LEN}")]
    Misaligned(usize),

    /// PKCS#7 padding was invalid after decryption.
    #[error("invalid padding after decryption")]
    BadPadding,
}

/// A CBC initialisation vector. Not secret; must never repeat under one key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_LEN]);

impl Iv {
    /// Draw a fresh IV from the OS CSPRNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; IV_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the 32-character hex form used on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidIv`] for non-hex input or any length
    /// other than 16 bytes.
    pub fn from_hex(s: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CipherError::InvalidIv)?;
        let bytes: [u8; IV_LEN] = bytes.try_into().map_err(|_| CipherError::InvalidIv)?;
        Ok(Self(bytes))
    }

    /// Lowercase hex, 32 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Iv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Iv({})", self.to_hex())
    }
}

/// Encrypts and decrypts under the process-wide [`SharedSecret`].
///
/// Cheap to clone; clones share the secret.
#[derive(Clone, Debug)]
pub struct CipherEngine {
    secret: Arc<SharedSecret>,
}

impl CipherEngine {
    /// Build an engine around the configured secret.
    ///
    /// Logs a warning if the secret cannot serve as a raw AES key.
    pub fn new(secret: SharedSecret) -> Self {
        if let Err(e) = secret.raw_key() {
            warn!(error = %e, "shared secret is not usable in raw-key mode");
        }
        Self {
            secret: Arc::new(secret),
        }
    }

    /// Encrypt `plaintext` in passphrase mode with a fresh random salt.
    pub fn encrypt_passphrase(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        self.encrypt_passphrase_with_salt(plaintext, &salt)
    }

    /// Encrypt `plaintext` in passphrase mode with a caller-chosen salt.
    pub fn encrypt_passphrase_with_salt(
        &self,
        plaintext: &[u8],
        salt: &[u8; SALT_LEN],
    ) -> Result<String, CipherError> {
        let derived = evp_bytes_to_key(self.secret.passphrase(), salt);
        let ciphertext = cbc_encrypt(&derived.key, &derived.iv, plaintext)?;

        let mut framed = Vec::with_capacity(SALTED_MAGIC.len() + SALT_LEN + ciphertext.len());
        framed.extend_from_slice(SALTED_MAGIC);
        framed.extend_from_slice(salt);
        framed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(framed))
    }

    /// Decrypt a passphrase-mode payload.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidEncoding`], [`CipherError::MissingSalt`],
    /// [`CipherError::Misaligned`] or [`CipherError::BadPadding`]. A wrong
    /// secret almost always shows up as `BadPadding`.
    pub fn decrypt_passphrase(&self, data: &str) -> Result<Vec<u8>, CipherError> {
        let raw = STANDARD
            .decode(data.trim())
            .map_err(|_| CipherError::InvalidEncoding)?;

        let header_len = SALTED_MAGIC.len() + SALT_LEN;
        if raw.len() < header_len || &raw[..SALTED_MAGIC.len()] != SALTED_MAGIC {
            return Err(CipherError::MissingSalt);
        }
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&raw[SALTED_MAGIC.len()..header_len]);

        let derived = evp_bytes_to_key(self.secret.passphrase(), &salt);
        cbc_decrypt(&derived.key, &derived.iv, &raw[header_len..])
    }

    /// Encrypt `plaintext` in raw-key mode under `iv`. Returns base64.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] if the secret is not a valid
    /// AES key length.
    pub fn encrypt_raw(&self, plaintext: &[u8], iv: &Iv) -> Result<String, CipherError> {
        let key = self.secret.raw_key()?;
        let ciphertext = cbc_encrypt(key, iv.as_bytes(), plaintext)?;
        Ok(STANDARD.encode(ciphertext))
    }

    /// Decrypt base64 raw-key ciphertext under `iv`.
    pub fn decrypt_raw(&self, ciphertext: &str, iv: &Iv) -> Result<Vec<u8>, CipherError> {
        let key = self.secret.raw_key()?;
        let raw = STANDARD
            .decode(ciphertext.trim())
            .map_err(|_| CipherError::InvalidEncoding)?;
        cbc_decrypt(key, iv.as_bytes(), &raw)
    }
}

fn cbc_encrypt(key: &[u8], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let bad_key = |_| CipherError::InvalidKeyLength(key.len());
    let ciphertext = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        n => return Err(CipherError::InvalidKeyLength(n)),
    };
    Ok(ciphertext)
}

fn cbc_decrypt(key: &[u8], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CipherError::Misaligned(ciphertext.len()));
    }
    let bad_key = |_| CipherError::InvalidKeyLength(key.len());
    let plaintext = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        n => return Err(CipherError::InvalidKeyLength(n)),
    };
    plaintext.map_err(|_| CipherError::BadPadding)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_256: &str = "0123456789abcdef0123456789abcdef";
    const SAMPLE: &[u8] = br#"{"userId":"u1","pageNo":1,"questions":{"name":"Jane"}}"#;

    fn engine(secret: &str) -> CipherEngine {
        CipherEngine::new(SharedSecret::new(secret).unwrap())
    }

    fn sequential_iv() -> Iv {
        let mut bytes = [0u8; IV_LEN];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        Iv::from_bytes(bytes)
    }

    // Produced with `openssl enc -aes-256-cbc -md md5 -S 0102030405060708 -k topsecret`
    // and the `Salted__` header prepended.
    #[test]
    fn passphrase_matches_openssl() {
        let salt = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let out = engine("topsecret")
            .encrypt_passphrase_with_salt(SAMPLE, &salt)
            .unwrap();
        assert_eq!(
            out,
            "U2FsdGVkX18BAgMEBQYHCB8FYjBcJugzUapfRu3WCqgz50k4yhghKn5RVC7Y+092p5VqiNTXxiGmK/f5pzOjDnqpswujNKO2FsrE17t3GCg="
        );
    }

    #[test]
    fn passphrase_wrong_secret_fails_padding() {
        let data = "U2FsdGVkX18BAgMEBQYHCB8FYjBcJugzUapfRu3WCqgz50k4yhghKn5RVC7Y+092p5VqiNTXxiGmK/f5pzOjDnqpswujNKO2FsrE17t3GCg=";
        assert_eq!(engine("topsecret").decrypt_passphrase(data).unwrap(), SAMPLE);
        assert_eq!(
            engine("wrongsecret").decrypt_passphrase(data),
            Err(CipherError::BadPadding)
        );
    }

    #[test]
    fn raw_key_matches_openssl() {
        let out = engine(KEY_256).encrypt_raw(b"hello", &sequential_iv()).unwrap();
        assert_eq!(out, "MYNSl5uYV6V9tOH5RSXtDA==");

        let out = engine("sixteen byte key")
            .encrypt_raw(b"", &Iv::from_bytes([0u8; IV_LEN]))
            .unwrap();
        assert_eq!(out, "MgNPW1bXw+C7jQRkIJ43Mg==");
    }

    #[test]
    fn round_trip_all_lengths_both_modes() {
        let e = engine(KEY_256);
        for len in [0usize, 1, 15, 16, 17, 31, 32, 100] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();

            let data = e.encrypt_passphrase(&plaintext).unwrap();
            assert_eq!(e.decrypt_passphrase(&data).unwrap(), plaintext, "len {len}");

            let iv = Iv::random();
            let ct = e.encrypt_raw(&plaintext, &iv).unwrap();
            assert_eq!(e.decrypt_raw(&ct, &iv).unwrap(), plaintext, "len {len}");
        }
    }

    #[test]
    fn aes_192_key_supported() {
        let e = engine("twenty-four byte secret!");
        let iv = Iv::random();
        let ct = e.encrypt_raw(b"payload", &iv).unwrap();
        assert_eq!(e.decrypt_raw(&ct, &iv).unwrap(), b"payload");
    }

    #[test]
    fn raw_key_rejects_bad_key_length() {
        let e = engine("topsecret");
        assert_eq!(
            e.encrypt_raw(b"x", &Iv::random()),
            Err(CipherError::InvalidKeyLength(9))
        );
    }

    #[test]
    fn misaligned_ciphertext_rejected() {
        let e = engine(KEY_256);
        let three_bytes = STANDARD.encode([1u8, 2, 3]);
        assert_eq!(
            e.decrypt_raw(&three_bytes, &Iv::random()),
            Err(CipherError::Misaligned(3))
        );
        assert_eq!(e.decrypt_raw("", &Iv::random()), Err(CipherError::Misaligned(0)));
    }

    #[test]
    fn altered_iv_breaks_single_block_padding() {
        // "hello" pads with eleven 0x0b bytes; flipping the IV's last byte turns
        // the final padding byte into 0xf4.
        let e = engine(KEY_256);
        let iv = sequential_iv();
        let ct = e.encrypt_raw(b"hello", &iv).unwrap();
        let mut bytes = *iv.as_bytes();
        bytes[IV_LEN - 1] ^= 0xFF;
        assert_eq!(
            e.decrypt_raw(&ct, &Iv::from_bytes(bytes)),
            Err(CipherError::BadPadding)
        );
    }

    #[test]
    fn passphrase_requires_salt_header() {
        let e = engine("topsecret");
        let headerless = STANDARD.encode([0u8; 32]);
        assert_eq!(e.decrypt_passphrase(&headerless), Err(CipherError::MissingSalt));
        assert_eq!(
            e.decrypt_passphrase("not base64!"),
            Err(CipherError::InvalidEncoding)
        );
    }

    #[test]
    fn iv_hex_parsing() {
        let iv = Iv::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(iv, sequential_iv());
        assert_eq!(iv.to_hex(), "000102030405060708090a0b0c0d0e0f");
        assert_eq!(Iv::from_hex("0001"), Err(CipherError::InvalidIv));
        assert_eq!(Iv::from_hex("zz"), Err(CipherError::InvalidIv));
        assert_eq!(
            Iv::from_hex("000102030405060708090a0b0c0d0e0f10"),
            Err(CipherError::InvalidIv)
        );
    }

    #[test]
    fn random_ivs_differ() {
        assert_ne!(Iv::random(), Iv::random());
    }
}
