//! Transient user-facing status derived from an exchange outcome.

use std::time::{Duration, Instant};

use common::ExchangeError;

/// How long a notice stays visible before it clears itself.
pub const STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

/// A banner message that expires [`STATUS_TTL`] after it was raised.
#[derive(Debug, Clone)]
pub struct StatusNotice {
    pub kind: StatusKind,
    pub message: String,
    raised_at: Instant,
    ttl: Duration,
}

impl StatusNotice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Success, message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Error, message.into())
    }

    /// Error notice carrying the short text for `err`, never its internals.
    pub fn from_error(err: &ExchangeError) -> Self {
        Self::error(err.user_message())
    }

    /// Override the lifetime of this notice.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible_at(Instant::now())
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) < self.ttl
    }

    fn new(kind: StatusKind, message: String) -> Self {
        Self {
            kind,
            message,
            raised_at: Instant::now(),
            ttl: STATUS_TTL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_clears_after_ttl() {
        let notice = StatusNotice::success("Saved");
        let raised = notice.raised_at;
        assert!(notice.is_visible_at(raised));
        assert!(notice.is_visible_at(raised + Duration::from_millis(4_999)));
        assert!(!notice.is_visible_at(raised + STATUS_TTL));
    }

    #[test]
    fn custom_ttl() {
        let notice = StatusNotice::error("x").with_ttl(Duration::ZERO);
        assert!(!notice.is_visible());
    }

    #[test]
    fn from_error_uses_short_text() {
        let notice =
            StatusNotice::from_error(&ExchangeError::Decryption("invalid padding".into()));
        assert_eq!(notice.kind, StatusKind::Error);
        assert!(!notice.message.contains("padding"));
        assert!(notice.is_visible());
    }
}
