//! The forever loop: collect, publish, sleep, repeat until told to stop.
//!
//! Scheduling is deliberately separated from correctness: a single pass is
//! an ordinary async call (`run_once`), so the pipeline is testable without
//! the loop, and the loop itself only decides when the next pass starts.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::output::{write_dataset, PublishSink};
use crate::pipeline::enrich::Enricher;
use crate::pipeline::fetch::PageFetcher;
use crate::pipeline::{collect_entries, dedupe};
use crate::sources::SourceAdapter;

/// Lifecycle of the service. Normal operation cycles Collecting ->
/// Publishing -> Sleeping forever; Stopped is terminal and only entered
/// through the external stop signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Collecting,
    Publishing,
    Sleeping,
    Stopped,
}

/// What one pass amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Dataset written and accepted by the sink.
    Published,
    /// Zero canonical items survived; previous dataset retained.
    Empty,
    /// Dataset produced but writing or publication failed; previous
    /// published dataset remains visible.
    Degraded,
}

/// Per-process counters, reported after every pass.
#[derive(Debug, Default)]
pub struct RunMetrics {
    pub passes: u64,
    pub published: u64,
    pub empty_passes: u64,
    pub degraded: u64,
}

pub struct RunLoop {
    config: PipelineConfig,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    fetcher: Arc<dyn PageFetcher>,
    enricher: Arc<dyn Enricher>,
    sink: Arc<dyn PublishSink>,
    state: RunState,
    metrics: RunMetrics,
}

impl RunLoop {
    pub fn new(
        config: PipelineConfig,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        fetcher: Arc<dyn PageFetcher>,
        enricher: Arc<dyn Enricher>,
        sink: Arc<dyn PublishSink>,
    ) -> Self {
        Self {
            config,
            adapters,
            fetcher,
            enricher,
            sink,
            state: RunState::Idle,
            metrics: RunMetrics::default(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// One full pass end-to-end. Individual item failures never surface
    /// here; the outcome only distinguishes published / empty / degraded.
    pub async fn run_once(&mut self, stop: &watch::Receiver<bool>) -> PassOutcome {
        let started = Instant::now();
        self.state = RunState::Collecting;
        self.metrics.passes += 1;

        let entries = collect_entries(
            &self.config,
            &self.adapters,
            self.fetcher.clone(),
            self.enricher.clone(),
            stop.clone(),
        )
        .await;
        let dataset = dedupe(entries, &self.config.source_priority);

        if dataset.is_empty() {
            warn!("pass yielded zero canonical items; previous dataset retained");
            self.metrics.empty_passes += 1;
            return PassOutcome::Empty;
        }

        self.state = RunState::Publishing;
        let artifacts = match write_dataset(&dataset, &self.config.output_dir) {
            Ok(artifacts) => artifacts,
            Err(err) => {
                error!(error = %err, "dataset write failed; previous artifacts remain published");
                self.metrics.degraded += 1;
                return PassOutcome::Degraded;
            }
        };

        let label = format!(
            "dataset refresh {} ({} items)",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            dataset.len()
        );
        match self.sink.publish(&artifacts.json, &artifacts.csv, &label).await {
            Ok(()) => {
                self.metrics.published += 1;
                info!(
                    items = dataset.len(),
                    elapsed_secs = started.elapsed().as_secs(),
                    "pass published"
                );
                PassOutcome::Published
            }
            Err(err) => {
                warn!(error = %err, "publish sink rejected artifacts; dataset retained locally");
                self.metrics.degraded += 1;
                PassOutcome::Degraded
            }
        }
    }

    /// Run forever on the configured cadence until the stop signal flips.
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.run_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately: the service starts with a pass.
        ticker.tick().await;

        loop {
            if *stop.borrow() {
                break;
            }
            let outcome = self.run_once(&stop).await;
            info!(
                pass = self.metrics.passes,
                ?outcome,
                published = self.metrics.published,
                empty = self.metrics.empty_passes,
                degraded = self.metrics.degraded,
                "pass complete; sleeping"
            );

            self.state = RunState::Sleeping;
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        self.state = RunState::Stopped;
        info!(passes = self.metrics.passes, "run loop stopped");
    }
}
