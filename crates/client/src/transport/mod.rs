//! JSON-over-HTTP transport to the intake backend.
//!
//! The [`Transport`] trait is the seam between the exchange flow and the
//! network. [`HttpTransport`] is the production implementation; tests mock it.
//!
//! Tokens are opaque inputs: acquiring, refreshing and expiring them happens
//! elsewhere. They are never logged, and neither are resource ids.

pub mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use common::ExchangeError;
use hyper::StatusCode;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

/// Everything except RFC 3986 unreserved characters, `.` included.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'~');

/// A parsed JSON reply and the status it came with.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body's `message` string, if there is one.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// Text for a rejection: the body's `message`, else the status line.
    pub fn rejection_text(&self) -> String {
        match self.message() {
            Some(message) => message.to_owned(),
            None => format!("server responded with {}", self.status),
        }
    }
}

/// Percent-encode `raw` so it stays a single path segment.
pub fn encode_segment(raw: &str) -> String {
    percent_encoding::utf8_percent_encode(raw, SEGMENT).to_string()
}

/// Request/response transport carrying JSON bodies.
///
/// Both methods return the parsed body together with its status, even for
/// non-2xx statuses, because the backend reports failures as
/// `{"successful": false, ...}`. The caller decides what a status means.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// `POST` `body` to `endpoint`, attaching `Authorization: Bearer <token>` when given.
    async fn post_json<'a>(
        &self,
        endpoint: &str,
        body: &Value,
        token: Option<&'a str>,
    ) -> Result<Reply, ExchangeError>;

    /// `GET` `endpoint/<id>`, with `id` percent-encoded as one path segment.
    async fn get_json<'a>(
        &self,
        endpoint: &str,
        id: &str,
        token: Option<&'a str>,
    ) -> Result<Reply, ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn segment_encoding_keeps_ids_in_one_segment() {
        assert_eq!(encode_segment("u42"), "u42");
        assert_eq!(encode_segment("a-b_c~d"), "a-b_c~d");
        assert_eq!(encode_segment("u1/../x"), "u1%2F%2E%2E%2Fx");
        assert_eq!(encode_segment("u1?x=1#f"), "u1%3Fx%3D1%23f");
        assert_eq!(encode_segment("jane doe"), "jane%20doe");
        assert_eq!(encode_segment("100%"), "100%25");
    }

    #[test]
    fn rejection_text_prefers_body_message() {
        let reply = Reply {
            status: StatusCode::UNAUTHORIZED,
            body: json!({"message": "Token expired"}),
        };
        assert_eq!(reply.rejection_text(), "Token expired");

        let reply = Reply {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({"error": "database unavailable"}),
        };
        assert!(reply.rejection_text().contains("500"));
        assert!(!reply.is_success());
        assert!(Reply::ok(json!({})).is_success());
    }
}
