//! Structured logging and optional OTLP span export.
//!
//! # Telemetry invariants
//!
//! - **No plaintext, questions, secret, token or key material** may appear in
//!   any span attribute or log field. Page tags, endpoints, modes, sizes,
//!   statuses and request ids are fine.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   overrides it.

pub mod init;

pub use init::{init_telemetry, TelemetryGuard};
