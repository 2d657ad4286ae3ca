//! Wire types, envelope shapes, and errors shared across `intake-exchange` crates.

pub mod error;
pub mod protocol;

pub use error::ExchangeError;
