//! [`HttpTransport`]: hyper 1.x client over rustls.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use common::ExchangeError;
use http_body_util::{BodyExt, Full};
use hyper::{header, Method, Request};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use super::{encode_segment, Reply, Transport};

/// Header carrying a per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Transport that talks to one backend base URL over HTTP or HTTPS.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport for `base_url` (e.g. `https://api.example.com`).
    ///
    /// TLS uses the ring provider and the bundled webpki roots. Plain `http`
    /// URLs are accepted for local backends.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Configuration`] if the TLS configuration
    /// cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ExchangeError> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| ExchangeError::Configuration(format!("failed to configure TLS: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        body: Bytes,
        token: Option<&str>,
        request_id: &str,
    ) -> Result<Request<Full<Bytes>>, ExchangeError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(Full::new(body))
            .map_err(|e| ExchangeError::Transport(format!("invalid request: {e}")))
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<Reply, ExchangeError> {
        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| {
                ExchangeError::Transport(format!("no response within {:?}", self.timeout))
            })?
            .map_err(|e| ExchangeError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        let body = tokio::time::timeout(self.timeout, response.into_body().collect())
            .await
            .map_err(|_| ExchangeError::Transport("response body timed out".into()))?
            .map_err(|e| ExchangeError::Transport(format!("failed to read response: {e}")))?
            .to_bytes();
        debug!(status = status.as_u16(), body_len = body.len(), "response received");

        match serde_json::from_slice(&body) {
            Ok(body) => {
                if !status.is_success() {
                    warn!(status = status.as_u16(), "backend returned an error status");
                }
                Ok(Reply { status, body })
            }
            Err(_) if !status.is_success() => Err(ExchangeError::Transport(format!(
                "server responded with {status}"
            ))),
            Err(e) => Err(ExchangeError::Transport(format!(
                "response body is not JSON: {e}"
            ))),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json<'a>(
        &self,
        endpoint: &str,
        body: &Value,
        token: Option<&'a str>,
    ) -> Result<Reply, ExchangeError> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("http_request", method = "POST", endpoint, request_id = %request_id);
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ExchangeError::Serialization(e.to_string()))?;
        let request = self.request(Method::POST, endpoint, Bytes::from(bytes), token, &request_id)?;
        self.send(request).instrument(span).await
    }

    async fn get_json<'a>(
        &self,
        endpoint: &str,
        id: &str,
        token: Option<&'a str>,
    ) -> Result<Reply, ExchangeError> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("http_request", method = "GET", endpoint, request_id = %request_id);
        let path = format!("{}/{}", endpoint.trim_end_matches('/'), encode_segment(id));
        let request = self.request(Method::GET, &path, Bytes::new(), token, &request_id)?;
        self.send(request).instrument(span).await
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
