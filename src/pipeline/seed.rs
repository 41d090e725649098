//! Seed discovery: drain each adapter's listing pagination into the shared
//! bounded queue of candidate item URLs.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::debug;

use crate::error::ListingError;
use crate::pipeline::fetch::PageFetcher;
use crate::sources::SourceAdapter;

/// One unit of tier-1 work: an item URL plus the adapter that knows how to
/// read the page behind it.
pub struct Candidate {
    pub adapter: Arc<dyn SourceAdapter>,
    pub url: String,
}

/// Walk one source's listing pages, emitting deduplicated candidate URLs up
/// to `cap`.
///
/// A failed listing page ends the source for this pass (anything already
/// emitted stays in flight downstream); the error is reported to the caller
/// so other sources keep going. Sends block when the fetch queue is full,
/// which is the back-pressure that keeps listing from outrunning tier 1.
pub async fn collect_source(
    adapter: Arc<dyn SourceAdapter>,
    fetcher: &dyn PageFetcher,
    cap: usize,
    deadline: Instant,
    stop: &watch::Receiver<bool>,
    tx: &mpsc::Sender<Candidate>,
) -> Result<usize, ListingError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut page = 0u32;

    'pages: while seen.len() < cap {
        if *stop.borrow() || Instant::now() >= deadline {
            debug!(source = adapter.id(), "listing cut short by stop/deadline");
            break;
        }
        let Some(page_url) = adapter.listing_page_url(page) else {
            break;
        };
        let html = fetcher
            .fetch(&page_url)
            .await
            .map_err(|err| ListingError {
                source: adapter.id(),
                reason: err.to_string(),
            })?;

        for url in adapter.parse_listing(&html) {
            if seen.len() >= cap {
                break 'pages;
            }
            if !seen.insert(url.clone()) {
                continue;
            }
            let candidate = Candidate {
                adapter: adapter.clone(),
                url,
            };
            if tx.send(candidate).await.is_err() {
                // Downstream hung up (stop); what we emitted so far stands.
                break 'pages;
            }
        }
        page += 1;
    }

    Ok(seen.len())
}
