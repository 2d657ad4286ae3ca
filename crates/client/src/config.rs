//! Configuration loading and validation for the intake client.
//!
//! All values are read from environment variables at startup. A missing or
//! empty `SHARED_SECRET` stops the process before any network or crypto call.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use common::ExchangeError;
use serde::Deserialize;

use crate::crypto::SharedSecret;

/// Validated client configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Symmetric secret shared with the backend. **Required.**
    #[serde(default)]
    pub shared_secret: String,

    /// Backend origin, `http://` or `https://`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP collector endpoint. Span export is off when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_base_url() -> String {
    "https://insight-backend-g7dg.onrender.com".into()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Build the process-wide [`SharedSecret`].
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Configuration`] if the secret is empty.
    pub fn secret(&self) -> Result<SharedSecret, ExchangeError> {
        SharedSecret::new(self.shared_secret.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The OTLP endpoint, if one is set and non-blank.
    pub fn otlp_endpoint(&self) -> Option<&str> {
        self.otel_exporter_otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.shared_secret.trim().is_empty() {
            return Err(ExchangeError::Configuration(
                "SHARED_SECRET is required and must not be empty".into(),
            )
            .into());
        }
        ensure_non_empty(&self.base_url, "BASE_URL")?;

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!("BASE_URL must start with http:// or https://");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("shared_secret", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            shared_secret: "topsecret".into(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            log_level: default_log_level(),
            otel_exporter_otlp_endpoint: None,
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_base_url(), "https://insight-backend-g7dg.onrender.com");
        assert_eq!(default_request_timeout(), 30);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn valid_config_passes() {
        let cfg = valid();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert!(cfg.secret().is_ok());
    }

    #[test]
    fn validate_rejects_empty_secret() {
        let cfg = Config {
            shared_secret: "  ".into(),
            ..valid()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExchangeError>(),
            Some(ExchangeError::Configuration(_))
        ));
        assert!(matches!(cfg.secret(), Err(ExchangeError::Configuration(_))));
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let cfg = Config {
            base_url: "ftp://backend.example".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = Config {
            request_timeout_secs: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn blank_otlp_endpoint_is_off() {
        let cfg = Config {
            otel_exporter_otlp_endpoint: Some("  ".into()),
            ..valid()
        };
        assert_eq!(cfg.otlp_endpoint(), None);

        let cfg = Config {
            otel_exporter_otlp_endpoint: Some("http://collector:4317".into()),
            ..valid()
        };
        assert_eq!(cfg.otlp_endpoint(), Some("http://collector:4317"));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", valid());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("topsecret"));
    }
}
