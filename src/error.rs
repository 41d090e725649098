//! Failure taxonomy for the collection pipeline.
//!
//! The split matters operationally: transient fetch failures are retried with
//! backoff, structural parse failures are discarded on first sight, and a
//! whole-source listing failure sidelines that source for the rest of the
//! pass without touching the others. Nothing here ever aborts a pass.

use std::time::Duration;

use thiserror::Error;

/// Failure downloading one page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by upstream")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("unexpected status {0}")]
    Status(u16),

    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    /// Whether a retry with backoff is worth a fetch slot. Timeouts, rate
    /// limits, 5xx responses and connection-level errors qualify; anything
    /// else (4xx, malformed responses) is discarded immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::RateLimited { .. } => true,
            FetchError::Status(code) => (500..600).contains(code),
            FetchError::Network(err) => err.is_timeout() || err.is_connect() || err.is_request(),
        }
    }
}

/// Page structure did not match the adapter's selectors. Never retried:
/// re-fetching a structurally unexpected page wastes a fetch slot.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no title element found")]
    MissingTitle,

    #[error("no usable price found")]
    MissingPrice,
}

/// A source's seed listing failed; it contributes nothing further this pass.
#[derive(Debug)]
pub struct ListingError {
    pub source: &'static str,
    pub reason: String,
}

impl std::fmt::Display for ListingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listing failed for {}: {}", self.source, self.reason)
    }
}

impl std::error::Error for ListingError {}

/// The publish sink rejected the finished artifacts. The freshly written
/// dataset stays local and the previous published dataset remains visible.
#[derive(Debug, Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(FetchError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(FetchError::RateLimited {
            retry_after_secs: None
        }
        .is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(!FetchError::Status(404).is_transient());
        assert!(!FetchError::Status(403).is_transient());
    }
}
