//! Turns a retrieval response into the decrypted JSON record.

use common::protocol::{Envelope, RetrievalResponse, VersionedEnvelope};
use common::ExchangeError;
use serde_json::Value;

use crate::envelope::EnvelopeCodec;

/// Message used when the remote reports failure without saying why.
const NO_MESSAGE: &str = "the server returned no record";

#[derive(Clone, Debug)]
pub struct RetrievalDecoder {
    codec: EnvelopeCodec,
}

impl RetrievalDecoder {
    pub fn new(codec: EnvelopeCodec) -> Self {
        Self { codec }
    }

    /// Decrypt and parse a fetched record.
    ///
    /// # Errors
    ///
    /// - [`ExchangeError::RemoteRejection`] when `successful` is false, carrying
    ///   the remote's message.
    /// - [`ExchangeError::MalformedEnvelope`] when `ciphertext` or `iv` is missing.
    /// - [`ExchangeError::Decryption`] from the cipher layer.
    /// - [`ExchangeError::Parse`] when the plaintext is not JSON.
    pub fn decode(&self, response: RetrievalResponse) -> Result<Value, ExchangeError> {
        if !response.successful {
            return Err(ExchangeError::RemoteRejection(
                response.message.unwrap_or_else(|| NO_MESSAGE.into()),
            ));
        }
        let (Some(ciphertext), Some(iv)) = (response.ciphertext, response.iv) else {
            return Err(ExchangeError::MalformedEnvelope(
                "successful response is missing `ciphertext` or `iv`".into(),
            ));
        };

        let plaintext = self
            .codec
            .decode(&Envelope::Versioned(VersionedEnvelope { iv, ciphertext }))?;
        parse_record(&plaintext)
    }
}

/// Drop every trailing NUL byte.
pub fn strip_trailing_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Strip trailing NULs and parse what remains as JSON.
///
/// # Errors
///
/// Returns [`ExchangeError::Parse`] on invalid UTF-8 or invalid JSON.
pub fn parse_record(plaintext: &[u8]) -> Result<Value, ExchangeError> {
    serde_json::from_slice(strip_trailing_nul(plaintext))
        .map_err(|e| ExchangeError::Parse(e.to_string()))
}
