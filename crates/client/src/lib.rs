//! Client-side encrypted exchange of questionnaire pages and clinical records.
//!
//! Submissions are serialized, sealed in one of two envelope formats and
//! POSTed to a per-page endpoint. Retrievals fetch an encrypted record, strip
//! trailing NUL padding and parse it as JSON. See [`exchange`] for the flows.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod exchange;
pub mod record;
pub mod retrieval;
pub mod status;
pub mod telemetry;
pub mod transport;

pub use config::Config;
pub use envelope::EnvelopeCodec;
pub use exchange::{ExchangeClient, RecordKind, RouteTable, SubmissionRoute, SubmitReceipt};
pub use status::{StatusKind, StatusNotice};
pub use transport::{HttpTransport, Reply, Transport};
