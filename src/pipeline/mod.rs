//! The collection pipeline: seed discovery, three concurrency tiers, and
//! the cross-source merge.

pub mod dedupe;
pub mod enrich;
pub mod fetch;
pub mod seed;
pub mod tiers;

pub use dedupe::dedupe;
pub use tiers::collect_entries;
