//! Tier-1 page download: shared HTTP client, per-request timeout, bounded
//! retry with backoff on transient failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::warn;

use crate::error::FetchError;

/// Capability the concurrency tiers use to download pages.
///
/// Injected rather than hardwired to reqwest so the tiers can run against
/// canned pages in tests, mirroring the publish-sink seam.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Browser-like headers; several storefronts serve bot-detection stubs to
/// clients that send none.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}

/// Single-attempt reqwest fetcher. Wrap in [`Retrying`] for the pipeline.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Fails only when the client itself cannot be constructed, which is
    /// fatal for the whole run (no tier can operate without it).
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers())
            // The outer per-request timeout below is authoritative; this one
            // only catches a wedged connection pool.
            .timeout(timeout + Duration::from_secs(5))
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let send = self.client.get(url).send();
        let resp = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get("Retry-After")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(FetchError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = tokio::time::timeout(self.timeout, resp.text())
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;
        Ok(body)
    }
}

/// Retry decorator: bounded attempts with exponential backoff, honoring
/// Retry-After hints when the upstream provides one.
pub struct Retrying<F> {
    inner: F,
    attempts: u32,
    base_delay: Duration,
}

impl<F: PageFetcher> Retrying<F> {
    pub fn new(inner: F, attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            attempts,
            base_delay,
        }
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for Retrying<F> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    let mut delay = self.base_delay * 2u32.saturating_pow(attempt);
                    if let FetchError::RateLimited {
                        retry_after_secs: Some(secs),
                    } = err
                    {
                        delay = delay.max(Duration::from_secs(secs));
                    }
                    attempt += 1;
                    warn!(url, attempt, error = %err, "transient fetch failure; backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
