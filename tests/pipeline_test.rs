//! Integration tests for the collection pipeline.
//!
//! These run the real tier machinery end-to-end against canned pages and a
//! no-op (or failing) publish sink; no sockets are opened.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::watch;

use gamefeed::config::PipelineConfig;
use gamefeed::error::{FetchError, ParseError, PublishError};
use gamefeed::model::{CatalogEntry, Distribution, Platform};
use gamefeed::output::{load_dataset, write_dataset, PublishSink, CSV_FILE, JSON_FILE};
use gamefeed::pipeline::enrich::Enricher;
use gamefeed::pipeline::fetch::PageFetcher;
use gamefeed::pipeline::{collect_entries, dedupe};
use gamefeed::runloop::{PassOutcome, RunLoop, RunState};
use gamefeed::sources::SourceAdapter;

/// Serves canned pages; anything unknown 404s.
struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    fn new(pages: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
        })
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

/// Minimal storefront: one listing page whose body is a newline-separated
/// URL list, and product pages in "title|list|discount" form. A body of
/// "BROKEN" simulates a structurally unexpected page.
struct MockSource {
    id: &'static str,
}

impl MockSource {
    fn listing_url(id: &str) -> String {
        format!("https://{id}.test/listing")
    }
}

impl SourceAdapter for MockSource {
    fn id(&self) -> &'static str {
        self.id
    }

    fn listing_page_url(&self, page: u32) -> Option<String> {
        (page == 0).then(|| Self::listing_url(self.id))
    }

    fn parse_listing(&self, html: &str) -> Vec<String> {
        html.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn extract(&self, url: &str, html: &str) -> Result<CatalogEntry, ParseError> {
        let mut parts = html.trim().split('|');
        let title = parts.next().filter(|t| !t.is_empty() && *t != "BROKEN");
        let Some(title) = title else {
            return Err(ParseError::MissingTitle);
        };
        let list_price = parts
            .next()
            .and_then(|p| p.parse::<f64>().ok())
            .ok_or(ParseError::MissingPrice)?;
        let discount_price = parts.next().and_then(|p| p.parse::<f64>().ok());
        Ok(CatalogEntry {
            source: self.id,
            url: url.to_string(),
            title: title.to_string(),
            list_price,
            discount_price,
            currency: "USD",
            platforms: BTreeSet::from([Platform::Pc]),
            image_url: None,
            distribution: Distribution::Digital,
        })
    }
}

/// Leaves entries untouched so assertions stay deterministic.
struct NullEnricher;

#[async_trait]
impl Enricher for NullEnricher {
    async fn enrich(&self, _entry: &mut gamefeed::model::EnrichedEntry) {}
}

struct FailingSink;

#[async_trait]
impl PublishSink for FailingSink {
    async fn publish(
        &self,
        _json: &std::path::Path,
        _csv: &std::path::Path,
        _label: &str,
    ) -> Result<(), PublishError> {
        Err(PublishError("remote rejected the push".into()))
    }
}

struct NoopSink;

#[async_trait]
impl PublishSink for NoopSink {
    async fn publish(
        &self,
        _json: &std::path::Path,
        _csv: &std::path::Path,
        _label: &str,
    ) -> Result<(), PublishError> {
        Ok(())
    }
}

fn test_config(output_dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        per_source_cap: 10,
        fetch_workers: 4,
        extract_workers: 2,
        enrich_workers: 2,
        queue_capacity: 16,
        pass_deadline: Duration::from_secs(30),
        output_dir: output_dir.path().to_path_buf(),
        ..PipelineConfig::default()
    }
}

fn adapters(ids: &[&'static str]) -> Vec<Arc<dyn SourceAdapter>> {
    ids.iter()
        .copied()
        .map(|id| Arc::new(MockSource { id }) as Arc<dyn SourceAdapter>)
        .collect()
}

fn stop_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Three sources list the same game; one has the deepest discount, one fails
/// to parse. Exactly one canonical item must survive, pointing at the
/// discounting store.
#[tokio::test]
async fn end_to_end_merges_across_sources() {
    let out = TempDir::new().unwrap();
    let config = test_config(&out);
    let fetcher = StaticFetcher::new(&[
        ("https://store1.test/listing", "https://store1.test/game-x"),
        ("https://store1.test/game-x", "Game X|29.99|"),
        ("https://store2.test/listing", "https://store2.test/game-x"),
        ("https://store2.test/game-x", "Game X|29.99|17.99"),
        ("https://store3.test/listing", "https://store3.test/game-x"),
        ("https://store3.test/game-x", "BROKEN"),
    ]);
    let (_stop_tx, stop_rx) = stop_channel();

    let mut run = RunLoop::new(
        config,
        adapters(&["store1", "store2", "store3"]),
        fetcher,
        Arc::new(NullEnricher),
        Arc::new(NoopSink),
    );
    let outcome = run.run_once(&stop_rx).await;
    assert_eq!(outcome, PassOutcome::Published);

    let dataset = load_dataset(&out.path().join(JSON_FILE)).unwrap();
    assert_eq!(dataset.len(), 1);
    let item = &dataset.items[0];
    assert_eq!(item.name, "Game X");
    assert_eq!(item.price_discount, Some(17.99));
    assert_eq!(item.discount_percent, 40);
    assert_eq!(item.site, "store2");
    assert_eq!(item.url, "https://store2.test/game-x");
}

/// One poisoned item must not affect any other item in flight.
#[tokio::test]
async fn parse_failure_is_isolated_to_its_item() {
    let out = TempDir::new().unwrap();
    let config = test_config(&out);
    let fetcher = StaticFetcher::new(&[
        (
            "https://store1.test/listing",
            "https://store1.test/good\nhttps://store1.test/bad\nhttps://store1.test/also-good",
        ),
        ("https://store1.test/good", "Good Game|19.99|"),
        ("https://store1.test/bad", "BROKEN"),
        ("https://store1.test/also-good", "Other Game|24.99|9.99"),
    ]);
    let (_stop_tx, stop_rx) = stop_channel();

    let entries = collect_entries(
        &config,
        &adapters(&["store1"]),
        fetcher,
        Arc::new(NullEnricher),
        stop_rx,
    )
    .await;
    let dataset = dedupe(entries, &config.source_priority);
    let names: Vec<_> = dataset.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Good Game", "Other Game"]);
}

/// A dead listing endpoint sidelines that source only.
#[tokio::test]
async fn listing_failure_does_not_abort_other_sources() {
    let out = TempDir::new().unwrap();
    let config = test_config(&out);
    // store1 has no listing page at all -> 404 -> ListingError.
    let fetcher = StaticFetcher::new(&[
        ("https://store2.test/listing", "https://store2.test/game-y"),
        ("https://store2.test/game-y", "Game Y|14.99|"),
    ]);
    let (_stop_tx, stop_rx) = stop_channel();

    let entries = collect_entries(
        &config,
        &adapters(&["store1", "store2"]),
        fetcher,
        Arc::new(NullEnricher),
        stop_rx,
    )
    .await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry.title, "Game Y");
}

/// An all-sources-failed pass publishes nothing and the previously published
/// artifacts stay byte-identical.
#[tokio::test]
async fn empty_pass_retains_previous_dataset() {
    let out = TempDir::new().unwrap();
    let config = test_config(&out);

    // Seed the published location with a known good dataset first.
    let good = {
        let fetcher = StaticFetcher::new(&[
            ("https://store1.test/listing", "https://store1.test/game-x"),
            ("https://store1.test/game-x", "Game X|29.99|17.99"),
        ]);
        let (_tx, stop_rx) = stop_channel();
        let mut run = RunLoop::new(
            config.clone(),
            adapters(&["store1"]),
            fetcher,
            Arc::new(NullEnricher),
            Arc::new(NoopSink),
        );
        assert_eq!(run.run_once(&stop_rx).await, PassOutcome::Published);
        (
            fs::read(out.path().join(JSON_FILE)).unwrap(),
            fs::read(out.path().join(CSV_FILE)).unwrap(),
        )
    };

    // Second pass: every fetch 404s, so nothing survives.
    let fetcher = StaticFetcher::new(&[]);
    let (_tx, stop_rx) = stop_channel();
    let mut run = RunLoop::new(
        config,
        adapters(&["store1"]),
        fetcher,
        Arc::new(NullEnricher),
        Arc::new(NoopSink),
    );
    assert_eq!(run.run_once(&stop_rx).await, PassOutcome::Empty);

    assert_eq!(fs::read(out.path().join(JSON_FILE)).unwrap(), good.0);
    assert_eq!(fs::read(out.path().join(CSV_FILE)).unwrap(), good.1);
}

/// A rejected publish degrades the run but keeps the fresh dataset local.
#[tokio::test]
async fn publish_failure_degrades_but_keeps_artifacts() {
    let out = TempDir::new().unwrap();
    let config = test_config(&out);
    let fetcher = StaticFetcher::new(&[
        ("https://store1.test/listing", "https://store1.test/game-x"),
        ("https://store1.test/game-x", "Game X|29.99|17.99"),
    ]);
    let (_tx, stop_rx) = stop_channel();

    let mut run = RunLoop::new(
        config,
        adapters(&["store1"]),
        fetcher,
        Arc::new(NullEnricher),
        Arc::new(FailingSink),
    );
    assert_eq!(run.run_once(&stop_rx).await, PassOutcome::Degraded);

    let dataset = load_dataset(&out.path().join(JSON_FILE)).unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(run.metrics().degraded, 1);
}

/// Raising the stop signal before a pass means nothing is collected and the
/// loop lands in the terminal state.
#[tokio::test]
async fn stop_signal_terminates_the_loop() {
    let out = TempDir::new().unwrap();
    let config = test_config(&out);
    let fetcher = StaticFetcher::new(&[]);
    let (stop_tx, stop_rx) = stop_channel();
    stop_tx.send(true).unwrap();

    let mut run = RunLoop::new(
        config,
        adapters(&["store1"]),
        fetcher,
        Arc::new(NullEnricher),
        Arc::new(NoopSink),
    );
    tokio::time::timeout(Duration::from_secs(5), run.run(stop_rx))
        .await
        .expect("run loop should exit promptly once stopped");
    assert_eq!(run.state(), RunState::Stopped);
}

/// Written artifacts reload field-for-field, optional fields included.
#[tokio::test]
async fn dataset_round_trips_through_the_writer() {
    let out = TempDir::new().unwrap();
    let config = test_config(&out);
    let fetcher = StaticFetcher::new(&[
        (
            "https://store1.test/listing",
            "https://store1.test/a\nhttps://store1.test/b",
        ),
        ("https://store1.test/a", "Alpha|9.99|"),
        ("https://store1.test/b", "Beta|59.99|39.99"),
    ]);
    let (_tx, stop_rx) = stop_channel();

    let entries = collect_entries(
        &config,
        &adapters(&["store1"]),
        fetcher,
        Arc::new(NullEnricher),
        stop_rx,
    )
    .await;
    let dataset = dedupe(entries, &config.source_priority);
    let artifacts = write_dataset(&dataset, out.path()).unwrap();
    let reloaded = load_dataset(&artifacts.json).unwrap();
    assert_eq!(reloaded, dataset);
    assert_eq!(reloaded.items[0].rating, None);
    assert_eq!(reloaded.items[0].howlongtobeat, None);
}
