//! Error taxonomy shared by every layer of the exchange.

use thiserror::Error;

/// Top-level exchange error type.
///
/// Every failure a submit or retrieve flow can produce maps onto exactly one
/// variant. Crypto and parse failures are ordinary values here: callers turn
/// them into a short-lived status via [`ExchangeError::user_message`].
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The shared secret is missing or the configuration is otherwise unusable.
    /// Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The submission record could not be turned into canonical bytes.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Encryption failed. Indicates a programming or key-sizing error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Ciphertext was malformed, tampered with, or encrypted under another key.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// The wire body matched neither envelope shape, or matched both.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The request never produced a usable response body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with `successful: false`.
    #[error("remote rejected the request: {0}")]
    RemoteRejection(String),

    /// Decrypted bytes were not valid JSON.
    #[error("parse error: {0}")]
    Parse(String),

    /// The request was refused locally before touching the network.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ExchangeError {
    /// Short text suitable for a transient status banner.
    ///
    /// Remote rejections surface the remote's own message; everything else is
    /// a fixed phrase so that no ciphertext or internal detail leaks to the UI.
    pub fn user_message(&self) -> String {
        match self {
            ExchangeError::RemoteRejection(msg) => msg.clone(),
            ExchangeError::Transport(_) => "There was an error sending your data".into(),
            ExchangeError::Decryption(_) | ExchangeError::MalformedEnvelope(_) => {
                "The record could not be decrypted".into()
            }
            ExchangeError::Parse(_) => "The record could not be read".into(),
            ExchangeError::Serialization(_) | ExchangeError::InvalidRequest(_) => {
                "The form could not be prepared for sending".into()
            }
            ExchangeError::Configuration(_) | ExchangeError::Encryption(_) => {
                "The application is misconfigured".into()
            }
        }
    }

    /// Whether re-triggering the same action can plausibly succeed.
    pub fn is_user_recoverable(&self) -> bool {
        !matches!(
            self,
            ExchangeError::Configuration(_) | ExchangeError::Encryption(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_rejection_surfaces_remote_message() {
        let e = ExchangeError::RemoteRejection("No impression on file".into());
        assert_eq!(e.user_message(), "No impression on file");
    }

    #[test]
    fn crypto_details_do_not_reach_user_message() {
        let e = ExchangeError::Decryption("bad padding in block 3".into());
        assert!(!e.user_message().contains("padding"));
    }

    #[test]
    fn recoverability() {
        assert!(!ExchangeError::Configuration("x".into()).is_user_recoverable());
        assert!(!ExchangeError::Encryption("x".into()).is_user_recoverable());
        assert!(ExchangeError::Transport("x".into()).is_user_recoverable());
        assert!(ExchangeError::Decryption("x".into()).is_user_recoverable());
    }

    #[test]
    fn display_includes_message() {
        let e = ExchangeError::MalformedEnvelope("both shapes present".into());
        assert!(e.to_string().contains("both shapes present"));
    }
}
