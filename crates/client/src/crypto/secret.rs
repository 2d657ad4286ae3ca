//! [`SharedSecret`]: the single piece of key material known to client and server.

use common::ExchangeError;
use zeroize::Zeroize;

use super::cipher::CipherError;

/// AES key lengths accepted in raw-key mode (AES-128, AES-192, AES-256).
pub const RAW_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// Immutable secret loaded once at startup.
///
/// Held behind an `Arc` by the cipher engine; never rotated. The bytes are
/// overwritten with zeroes when the last owner drops it.
pub struct SharedSecret(Box<[u8]>);

impl SharedSecret {
    /// Wrap a configured secret string.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Configuration`] if the secret is empty or only
    /// whitespace.
    pub fn new(secret: impl Into<String>) -> Result<Self, ExchangeError> {
        let mut secret = secret.into();
        if secret.trim().is_empty() {
            secret.zeroize();
            return Err(ExchangeError::Configuration(
                "shared secret is required and must not be empty".into(),
            ));
        }
        let bytes = secret.as_bytes().to_vec().into_boxed_slice();
        secret.zeroize();
        Ok(Self(bytes))
    }

    /// The secret's UTF-8 bytes, used as the passphrase-mode password.
    pub fn passphrase(&self) -> &[u8] {
        &self.0
    }

    /// The secret's UTF-8 bytes as an AES key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] unless the secret is exactly
    /// 16, 24 or 32 bytes long.
    pub fn raw_key(&self) -> Result<&[u8], CipherError> {
        if RAW_KEY_LENGTHS.contains(&self.0.len()) {
            Ok(&self.0)
        } else {
            Err(CipherError::InvalidKeyLength(self.0.len()))
        }
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_is_a_configuration_error() {
        assert!(matches!(
            SharedSecret::new(""),
            Err(ExchangeError::Configuration(_))
        ));
        assert!(matches!(
            SharedSecret::new("   \n"),
            Err(ExchangeError::Configuration(_))
        ));
    }

    #[test]
    fn passphrase_is_utf8_bytes() {
        let s = SharedSecret::new("topsecret").unwrap();
        assert_eq!(s.passphrase(), b"topsecret");
    }

    #[test]
    fn raw_key_requires_aes_length() {
        assert!(SharedSecret::new("topsecret").unwrap().raw_key().is_err());
        assert_eq!(
            SharedSecret::new("sixteen byte key").unwrap().raw_key().unwrap().len(),
            16
        );
        assert_eq!(
            SharedSecret::new("0123456789abcdef0123456789abcdef")
                .unwrap()
                .raw_key()
                .unwrap()
                .len(),
            32
        );
    }

    #[test]
    fn redacted_in_debug() {
        let s = SharedSecret::new("topsecret").unwrap();
        let printed = format!("{s:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("topsecret"));
    }
}
