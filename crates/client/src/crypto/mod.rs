//! AES-CBC primitives for both envelope conventions.
//!
//! This module is free of HTTP and serialization concerns. It turns bytes into
//! ciphertext strings and back under the process-wide [`SharedSecret`].
//!
//! # Ciphertext formats
//!
//! ```text
//! passphrase: base64("Salted__" ‖ salt[8] ‖ AES-256-CBC(EVP_BytesToKey(secret, salt)))
//! raw-key:    base64(AES-{128,192,256}-CBC(secret, iv))      iv sent separately as hex
//! ```
//!
//! # Invariants
//!
//! - Key material never appears in logs, spans, or `Debug` output.
//! - An IV is drawn fresh from the OS CSPRNG for every raw-key message.

pub mod cipher;
pub mod kdf;
pub mod secret;

pub use cipher::{CipherEngine, CipherError, Iv};
pub use secret::SharedSecret;
