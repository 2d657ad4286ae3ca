//! Envelope codec: ciphertext in, wire shape out, and back.
//!
//! Decoding dispatches on the envelope variant, which is how the backend tells
//! the two conventions apart. Do not collapse the variants.

use common::protocol::{CipherMode, Envelope, LegacyEnvelope, VersionedEnvelope};
use common::ExchangeError;
use tracing::debug;

use crate::crypto::{CipherEngine, CipherError, Iv};

/// Wraps a [`CipherEngine`] and speaks both envelope shapes.
#[derive(Clone, Debug)]
pub struct EnvelopeCodec {
    engine: CipherEngine,
}

impl EnvelopeCodec {
    pub fn new(engine: CipherEngine) -> Self {
        Self { engine }
    }

    /// Encrypt `plaintext` and wrap it in the envelope for `mode`.
    ///
    /// Raw-key mode draws a new random IV on every call.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Encryption`] if the cipher rejects the key.
    pub fn encode(&self, plaintext: &[u8], mode: CipherMode) -> Result<Envelope, ExchangeError> {
        let envelope = match mode {
            CipherMode::Passphrase => {
                let data = self
                    .engine
                    .encrypt_passphrase(plaintext)
                    .map_err(encryption_error)?;
                Envelope::Legacy(LegacyEnvelope { data })
            }
            CipherMode::RawKey => {
                let iv = Iv::random();
                let ciphertext = self
                    .engine
                    .encrypt_raw(plaintext, &iv)
                    .map_err(encryption_error)?;
                Envelope::Versioned(VersionedEnvelope {
                    iv: iv.to_hex(),
                    ciphertext,
                })
            }
        };
        debug!(?mode, plaintext_len = plaintext.len(), "payload sealed");
        Ok(envelope)
    }

    /// Decrypt an envelope with the mode its shape implies.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Decryption`] for bad IVs, bad encoding,
    /// misaligned ciphertext, or invalid padding.
    pub fn decode(&self, envelope: &Envelope) -> Result<Vec<u8>, ExchangeError> {
        match envelope {
            Envelope::Legacy(LegacyEnvelope { data }) => self
                .engine
                .decrypt_passphrase(data)
                .map_err(decryption_error),
            Envelope::Versioned(VersionedEnvelope { iv, ciphertext }) => {
                let iv = Iv::from_hex(iv).map_err(decryption_error)?;
                self.engine
                    .decrypt_raw(ciphertext, &iv)
                    .map_err(decryption_error)
            }
        }
    }

    /// Classify a JSON wire body and decode it.
    ///
    /// # Errors
    ///
    /// [`ExchangeError::MalformedEnvelope`] if the body has both field sets or
    /// neither; otherwise as [`EnvelopeCodec::decode`].
    pub fn decode_json(&self, body: &[u8]) -> Result<Vec<u8>, ExchangeError> {
        let envelope = Envelope::from_json(body)?;
        self.decode(&envelope)
    }
}

fn encryption_error(e: CipherError) -> ExchangeError {
    ExchangeError::Encryption(e.to_string())
}

fn decryption_error(e: CipherError) -> ExchangeError {
    ExchangeError::Decryption(e.to_string())
}
