//! The three concurrency tiers: fetch, extract, enrich.
//!
//! Work flows strictly downstream over bounded channels; each tier is a
//! fixed pool of workers draining a shared receiver. An item is owned by
//! exactly one worker at a time, and nothing an individual item does can
//! abort the pass - failures are counted, logged and dropped. The stop
//! signal and the pass deadline are honored between handoffs; an in-flight
//! fetch runs to its own timeout instead of being aborted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::model::{CatalogEntry, EnrichedEntry};
use crate::pipeline::enrich::Enricher;
use crate::pipeline::fetch::PageFetcher;
use crate::pipeline::seed::{collect_source, Candidate};
use crate::sources::SourceAdapter;

struct FetchedPage {
    adapter: Arc<dyn SourceAdapter>,
    url: String,
    html: String,
}

/// Per-pass counters, logged when the pass completes.
#[derive(Debug, Default)]
pub struct PassCounters {
    pub seeded: AtomicU64,
    pub listing_failures: AtomicU64,
    pub fetch_discards: AtomicU64,
    pub parse_discards: AtomicU64,
    pub enrich_drops: AtomicU64,
}

/// Run the seed + fetch + extract + enrich stages of one pass and collect
/// every surviving enriched entry. Deduplication happens on the result.
pub async fn collect_entries(
    cfg: &PipelineConfig,
    adapters: &[Arc<dyn SourceAdapter>],
    fetcher: Arc<dyn PageFetcher>,
    enricher: Arc<dyn Enricher>,
    stop: watch::Receiver<bool>,
) -> Vec<EnrichedEntry> {
    let deadline = Instant::now() + cfg.pass_deadline;
    let counters = Arc::new(PassCounters::default());
    let mut tasks = JoinSet::new();

    let (seed_tx, seed_rx) = mpsc::channel::<Candidate>(cfg.queue_capacity);
    let (page_tx, page_rx) = mpsc::channel::<FetchedPage>(cfg.queue_capacity);
    let (entry_tx, entry_rx) = mpsc::channel::<CatalogEntry>(cfg.queue_capacity);
    let (done_tx, mut done_rx) = mpsc::channel::<EnrichedEntry>(cfg.queue_capacity);

    let seed_rx = Arc::new(Mutex::new(seed_rx));
    let page_rx = Arc::new(Mutex::new(page_rx));
    let entry_rx = Arc::new(Mutex::new(entry_rx));

    // Seed collectors: all sources list concurrently, failures isolated per
    // source.
    {
        let adapters = adapters.to_vec();
        let fetcher = fetcher.clone();
        let stop = stop.clone();
        let counters = counters.clone();
        let cap = cfg.per_source_cap;
        tasks.spawn(async move {
            let mut listings: FuturesUnordered<_> = adapters
                .into_iter()
                .map(|adapter| {
                    let tx = seed_tx.clone();
                    let fetcher = fetcher.clone();
                    let stop = stop.clone();
                    async move {
                        let source = adapter.id();
                        let result =
                            collect_source(adapter, fetcher.as_ref(), cap, deadline, &stop, &tx)
                                .await;
                        (source, result)
                    }
                })
                .collect();
            drop(seed_tx);
            while let Some((source, result)) = listings.next().await {
                match result {
                    Ok(count) => {
                        info!(source, urls = count, "listing complete");
                        counters.seeded.fetch_add(count as u64, Ordering::Relaxed);
                    }
                    Err(err) => {
                        warn!(error = %err, "listing failed; source contributes nothing further this pass");
                        counters.listing_failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        });
    }

    // Tier 1: fetch. Widest pool; purely I/O-bound.
    for _ in 0..cfg.fetch_workers.max(1) {
        let rx = seed_rx.clone();
        let tx = page_tx.clone();
        let fetcher = fetcher.clone();
        let stop = stop.clone();
        let counters = counters.clone();
        tasks.spawn(async move {
            loop {
                let candidate = { rx.lock().await.recv().await };
                let Some(candidate) = candidate else { break };
                if *stop.borrow() || Instant::now() >= deadline {
                    // Keep draining so upstream senders unblock.
                    continue;
                }
                match fetcher.fetch(&candidate.url).await {
                    Ok(html) => {
                        let page = FetchedPage {
                            adapter: candidate.adapter,
                            url: candidate.url,
                            html,
                        };
                        if tx.send(page).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        counters.fetch_discards.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            source = candidate.adapter.id(),
                            url = %candidate.url,
                            error = %err,
                            "item discarded after fetch failure"
                        );
                    }
                }
            }
        });
    }
    drop(page_tx);

    // Tier 2: extract. Parse failures are terminal for the item, never
    // retried. The send into tier 3 deliberately drops on a full queue:
    // enrichment is the lowest-priority stage and must not stall parsing.
    for _ in 0..cfg.extract_workers.max(1) {
        let rx = page_rx.clone();
        let tx = entry_tx.clone();
        let stop = stop.clone();
        let counters = counters.clone();
        tasks.spawn(async move {
            loop {
                let page = { rx.lock().await.recv().await };
                let Some(page) = page else { break };
                if *stop.borrow() {
                    continue;
                }
                match page.adapter.extract(&page.url, &page.html) {
                    Ok(entry) => match tx.try_send(entry) {
                        Ok(()) => {}
                        Err(TrySendError::Full(entry)) => {
                            counters.enrich_drops.fetch_add(1, Ordering::Relaxed);
                            warn!(
                                source = entry.source,
                                title = %entry.title,
                                "enrichment queue full; dropping item"
                            );
                        }
                        Err(TrySendError::Closed(_)) => break,
                    },
                    Err(err) => {
                        counters.parse_discards.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            source = page.adapter.id(),
                            url = %page.url,
                            error = %err,
                            "item discarded after parse failure"
                        );
                    }
                }
            }
        });
    }
    drop(entry_tx);

    // Tier 3: enrich. A slow auxiliary source forfeits its additions for the
    // item rather than wedging the tier; the entry continues unenriched.
    for _ in 0..cfg.enrich_workers.max(1) {
        let rx = entry_rx.clone();
        let tx = done_tx.clone();
        let enricher = enricher.clone();
        let timeout = cfg.enrich_timeout;
        tasks.spawn(async move {
            loop {
                let entry = { rx.lock().await.recv().await };
                let Some(entry) = entry else { break };
                let mut enriched = EnrichedEntry::new(entry);
                if tokio::time::timeout(timeout, enricher.enrich(&mut enriched))
                    .await
                    .is_err()
                {
                    debug!(title = %enriched.entry.title, "enrichment timed out; passing item through");
                }
                if tx.send(enriched).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(done_tx);

    let mut entries = Vec::new();
    while let Some(enriched) = done_rx.recv().await {
        entries.push(enriched);
    }
    while tasks.join_next().await.is_some() {}

    info!(
        entries = entries.len(),
        seeded = counters.seeded.load(Ordering::Relaxed),
        listing_failures = counters.listing_failures.load(Ordering::Relaxed),
        fetch_discards = counters.fetch_discards.load(Ordering::Relaxed),
        parse_discards = counters.parse_discards.load(Ordering::Relaxed),
        enrich_drops = counters.enrich_drops.load(Ordering::Relaxed),
        "collection tiers drained"
    );
    entries
}
