//! Pipeline configuration. Everything here is pass-independent: read once at
//! startup from the environment (plus CLI overrides) and fixed for the life
//! of the process.

use std::path::PathBuf;
use std::time::Duration;

use crate::util::env::{env_opt, env_parse};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Max item URLs accepted from each source's listing phase per pass.
    pub per_source_cap: usize,
    /// Tier-1 worker count; network-bound, so the widest pool.
    pub fetch_workers: usize,
    /// Tier-2 worker count.
    pub extract_workers: usize,
    /// Tier-3 worker count; enrichment sources tend to be rate-limited, so
    /// the narrowest pool.
    pub enrich_workers: usize,
    /// Capacity of each inter-tier queue.
    pub queue_capacity: usize,
    /// Per-request fetch timeout.
    pub fetch_timeout: Duration,
    /// Per-item enrichment timeout.
    pub enrich_timeout: Duration,
    /// Retry budget for transient fetch failures.
    pub retry_attempts: u32,
    /// First backoff delay; doubles per attempt.
    pub retry_base_delay: Duration,
    /// Hard ceiling on one collection pass.
    pub pass_deadline: Duration,
    /// Sleep between passes.
    pub run_interval: Duration,
    /// Directory the published artifacts live in.
    pub output_dir: PathBuf,
    /// Source ids best-first; the final deduplication tie-break.
    pub source_priority: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            per_source_cap: 80,
            fetch_workers: 16,
            extract_workers: 8,
            enrich_workers: 4,
            queue_capacity: 64,
            fetch_timeout: Duration::from_secs(15),
            enrich_timeout: Duration::from_secs(5),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            pass_deadline: Duration::from_secs(400),
            run_interval: Duration::from_secs(180),
            output_dir: PathBuf::from("data"),
            source_priority: vec!["steam".into(), "gog".into(), "gmg".into()],
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            per_source_cap: env_parse("SOURCE_URL_CAP", d.per_source_cap),
            fetch_workers: env_parse("FETCH_WORKERS", d.fetch_workers),
            extract_workers: env_parse("EXTRACT_WORKERS", d.extract_workers),
            enrich_workers: env_parse("ENRICH_WORKERS", d.enrich_workers),
            queue_capacity: env_parse("QUEUE_CAPACITY", d.queue_capacity),
            fetch_timeout: Duration::from_secs(env_parse("FETCH_TIMEOUT_SECS", 15u64)),
            enrich_timeout: Duration::from_secs(env_parse("ENRICH_TIMEOUT_SECS", 5u64)),
            retry_attempts: env_parse("FETCH_RETRY_ATTEMPTS", d.retry_attempts),
            retry_base_delay: Duration::from_millis(env_parse("FETCH_BACKOFF_MS", 500u64)),
            pass_deadline: Duration::from_secs(env_parse("PASS_DEADLINE_SECS", 400u64)),
            run_interval: Duration::from_secs(env_parse("RUN_INTERVAL_SECS", 180u64)),
            output_dir: env_opt("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.output_dir),
            source_priority: env_opt("SOURCE_PRIORITY")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(d.source_priority),
        }
    }
}
