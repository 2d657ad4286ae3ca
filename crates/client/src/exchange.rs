//! The submit and retrieve flows, parameterized by page tag and endpoint.
//!
//! ```text
//! submit:   record → serialize → encode(route.mode) → POST route.path
//! retrieve: GET kind.path/<userId> → RetrievalResponse → decrypt → strip NUL → JSON
//! ```
//!
//! Each call is single-flight: no retries, no cancellation, no ordering
//! between concurrent calls.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use common::protocol::{CipherMode, RetrievalResponse, SubmissionRecord, SubmitReply};
use common::ExchangeError;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::envelope::EnvelopeCodec;
use crate::record;
use crate::retrieval::RetrievalDecoder;
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Where and how one questionnaire page is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRoute {
    pub path: String,
    pub mode: CipherMode,
    /// Whether the bearer token is sent with the submission.
    pub authenticated: bool,
    /// Whether only an explicit `successful: true` counts as accepted.
    pub confirmed: bool,
}

/// Page tag → submission route.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: BTreeMap<u8, SubmissionRoute>,
}

impl RouteTable {
    pub fn empty() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }

    /// Register (or replace) the route for `page_no`.
    pub fn with_route(mut self, page_no: u8, route: SubmissionRoute) -> Self {
        self.routes.insert(page_no, route);
        self
    }

    /// # Errors
    ///
    /// Returns [`ExchangeError::Configuration`] for a page with no route.
    pub fn submission(&self, page_no: u8) -> Result<&SubmissionRoute, ExchangeError> {
        self.routes.get(&page_no).ok_or_else(|| {
            ExchangeError::Configuration(format!("no submission route for page {page_no}"))
        })
    }

    pub fn pages(&self) -> impl Iterator<Item = u8> + '_ {
        self.routes.keys().copied()
    }
}

impl Default for RouteTable {
    /// The backend's live routes: pages 1 and 5 take the legacy envelope
    /// without a token; pages 6 and 7 take the versioned envelope with one
    /// and must be confirmed with `successful: true`.
    fn default() -> Self {
        let legacy = |path: &str| SubmissionRoute {
            path: path.into(),
            mode: CipherMode::Passphrase,
            authenticated: false,
            confirmed: false,
        };
        let versioned = |path: &str| SubmissionRoute {
            path: path.into(),
            mode: CipherMode::RawKey,
            authenticated: true,
            confirmed: true,
        };
        Self::empty()
            .with_route(1, legacy("/users/history/first"))
            .with_route(5, legacy("/users/history/fifth"))
            .with_route(6, versioned("/users/patient-history"))
            .with_route(7, versioned("/users/patient-history"))
    }
}

/// Record kinds that can be fetched back from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Impression,
    Prescription,
}

impl RecordKind {
    /// Endpoint prefix; the user id is appended as the last segment.
    pub fn path(self) -> &'static str {
        match self {
            RecordKind::Impression => "/users/get/impression",
            RecordKind::Prescription => "/users/get/prescription",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Impression => f.write_str("impression"),
            RecordKind::Prescription => f.write_str("prescription"),
        }
    }
}

impl FromStr for RecordKind {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "impression" => Ok(RecordKind::Impression),
            "prescription" => Ok(RecordKind::Prescription),
            other => Err(ExchangeError::InvalidRequest(format!(
                "unknown record kind: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Outcome of an accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    /// The backend's `message`, if it sent one.
    pub message: Option<String>,
    /// The full reply body.
    pub reply: Value,
}

/// One client for every questionnaire page and record kind.
#[derive(Debug, Clone)]
pub struct ExchangeClient<T> {
    codec: EnvelopeCodec,
    decoder: RetrievalDecoder,
    transport: T,
    routes: RouteTable,
}

impl<T: Transport> ExchangeClient<T> {
    pub fn new(codec: EnvelopeCodec, transport: T, routes: RouteTable) -> Self {
        Self {
            decoder: RetrievalDecoder::new(codec.clone()),
            codec,
            transport,
            routes,
        }
    }

    /// Encrypt and submit one questionnaire page.
    ///
    /// # Errors
    ///
    /// - [`ExchangeError::Configuration`] if the page has no route.
    /// - [`ExchangeError::Serialization`] / [`ExchangeError::Encryption`] while sealing.
    /// - [`ExchangeError::Transport`] if no JSON reply arrived, or `successful`
    ///   / `message` has the wrong type.
    /// - [`ExchangeError::RemoteRejection`] for a non-2xx status, a reply saying
    ///   `successful: false`, or a confirmed route without `successful: true`.
    #[instrument(skip_all, fields(page_no = record.page_no))]
    pub async fn submit(
        &self,
        record: &SubmissionRecord,
        token: Option<&str>,
    ) -> Result<SubmitReceipt, ExchangeError> {
        let route = self.routes.submission(record.page_no)?;
        let plaintext = record::serialize(record)?;
        let envelope = self.codec.encode(&plaintext, route.mode)?;
        let body = serde_json::to_value(&envelope)
            .map_err(|e| ExchangeError::Serialization(e.to_string()))?;

        let token = if route.authenticated { token } else { None };
        let reply = self.transport.post_json(&route.path, &body, token).await?;

        if !reply.is_success() {
            warn!(path = %route.path, status = reply.status.as_u16(), "submission rejected by backend");
            return Err(ExchangeError::RemoteRejection(reply.rejection_text()));
        }

        let parsed = SubmitReply::from_value(&reply.body)?;
        let accepted = match parsed.successful {
            Some(flag) => flag,
            None => !route.confirmed,
        };
        if !accepted {
            let message = parsed
                .message
                .unwrap_or_else(|| "submission was not confirmed".into());
            warn!(path = %route.path, "submission rejected by backend");
            return Err(ExchangeError::RemoteRejection(message));
        }

        info!(path = %route.path, mode = ?route.mode, "submission accepted");
        Ok(SubmitReceipt {
            message: parsed.message,
            reply: reply.body,
        })
    }

    /// Fetch and decrypt one record for `user_id`.
    ///
    /// # Errors
    ///
    /// - [`ExchangeError::InvalidRequest`] for an empty `user_id`, `.` or `..`.
    /// - [`ExchangeError::RemoteRejection`] for a non-2xx status without a
    ///   retrieval body.
    /// - [`ExchangeError::Transport`] if the reply is missing or has the wrong shape.
    /// - Anything [`RetrievalDecoder::decode`] returns.
    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn retrieve(
        &self,
        kind: RecordKind,
        user_id: &str,
        token: Option<&str>,
    ) -> Result<Value, ExchangeError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ExchangeError::InvalidRequest(
                "a user id is required to retrieve records".into(),
            ));
        }
        if user_id == "." || user_id == ".." {
            return Err(ExchangeError::InvalidRequest(
                "a user id cannot be a dot segment".into(),
            ));
        }

        let reply = self.transport.get_json(kind.path(), user_id, token).await?;
        let response = match RetrievalResponse::deserialize(&reply.body) {
            Ok(response) if !reply.is_success() && response.successful => {
                return Err(ExchangeError::RemoteRejection(reply.rejection_text()))
            }
            Ok(response) => response,
            Err(_) if !reply.is_success() => {
                return Err(ExchangeError::RemoteRejection(reply.rejection_text()))
            }
            Err(e) => {
                return Err(ExchangeError::Transport(format!(
                    "unexpected retrieval response shape: {e}"
                )))
            }
        };

        let record = self.decoder.decode(response)?;
        info!("record retrieved");
        Ok(record)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}
