use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use gamefeed::config::PipelineConfig;
use gamefeed::logging;
use gamefeed::output::{GitPublisher, NoopPublisher, PublishSink};
use gamefeed::pipeline::enrich::HeuristicEnricher;
use gamefeed::pipeline::fetch::{HttpFetcher, PageFetcher, Retrying};
use gamefeed::runloop::RunLoop;
use gamefeed::sources;
use gamefeed::util::env as env_util;

/// Multi-storefront game listing harvester. Collects listings from every
/// configured storefront, merges them into one deduplicated dataset, and
/// republishes it on a fixed cadence.
#[derive(Debug, Parser)]
#[command(name = "gamefeed", version, about)]
struct Args {
    /// Run exactly one pass and exit instead of looping forever.
    #[arg(long)]
    once: bool,

    /// Seconds between passes; overrides RUN_INTERVAL_SECS.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Directory for the published artifacts; overrides OUTPUT_DIR.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    logging::init_tracing("info")?;
    let args = Args::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(secs) = args.interval_secs {
        config.run_interval = Duration::from_secs(secs);
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    info!(
        interval_secs = config.run_interval.as_secs(),
        output_dir = %config.output_dir.display(),
        sources = ?config.source_priority,
        "starting"
    );

    // Failing to build the fetch tier is the one fatal startup error; every
    // tier depends on it.
    let fetcher: Arc<dyn PageFetcher> = Arc::new(Retrying::new(
        HttpFetcher::new(config.fetch_timeout).context("failed to construct fetch tier")?,
        config.retry_attempts,
        config.retry_base_delay,
    ));

    let sink: Arc<dyn PublishSink> = match env_util::env_opt("PUBLISH_REPO_DIR") {
        Some(dir) => {
            info!(repo = %dir, "publishing through git checkout");
            Arc::new(GitPublisher::new(PathBuf::from(dir)))
        }
        None => {
            info!("PUBLISH_REPO_DIR not set; publication disabled, artifacts stay local");
            Arc::new(NoopPublisher)
        }
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stop signal received; finishing current work");
            let _ = stop_tx.send(true);
        }
    });

    let mut run = RunLoop::new(
        config,
        sources::default_adapters(),
        fetcher,
        Arc::new(HeuristicEnricher),
        sink,
    );

    if args.once {
        let outcome = run.run_once(&stop_rx).await;
        info!(?outcome, "single pass finished");
    } else {
        run.run(stop_rx).await;
    }
    Ok(())
}
