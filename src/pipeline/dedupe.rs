//! Cross-source merge: group enriched entries by identity key and keep the
//! best-priced variant per group.
//!
//! The losing entries' source-specific fields (store URL, price) are
//! discarded; only one canonical source link survives per item. That loss is
//! deliberate and documented in the output contract.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{CanonicalItem, Dataset, EnrichedEntry};
use crate::normalization::TitleKey;

/// Merge a pass's entries into the publish-ready dataset.
///
/// Order-independent: the same multiset of entries yields the same dataset
/// whatever order they arrived in. `priority` lists source ids best-first
/// and is only consulted as the final tie-break.
pub fn dedupe(entries: Vec<EnrichedEntry>, priority: &[String]) -> Dataset {
    let mut groups: HashMap<TitleKey, Vec<EnrichedEntry>> = HashMap::new();
    let mut unmergeable: Vec<EnrichedEntry> = Vec::new();

    for entry in entries {
        let key = TitleKey::new(&entry.entry.title);
        if key.is_placeholder() {
            // Nothing to match on; keep each occurrence distinct.
            unmergeable.push(entry);
        } else {
            groups.entry(key).or_default().push(entry);
        }
    }

    let items: Vec<CanonicalItem> = groups
        .into_values()
        .filter_map(|group| select_best(group, priority))
        .chain(unmergeable)
        .map(CanonicalItem::from)
        .collect();

    Dataset::new(items)
}

fn select_best(group: Vec<EnrichedEntry>, priority: &[String]) -> Option<EnrichedEntry> {
    group
        .into_iter()
        .min_by(|a, b| prefer(a, b, priority))
}

/// Total preference order over a group:
/// 1. any discounted entry beats any undiscounted one, lowest discount first;
/// 2. otherwise the lowest list price;
/// 3. configured source priority;
/// 4. URL, as a last deterministic resort.
fn prefer(a: &EnrichedEntry, b: &EnrichedEntry, priority: &[String]) -> Ordering {
    let price_order = match (a.entry.discount_price, b.entry.discount_price) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .entry
            .list_price
            .partial_cmp(&b.entry.list_price)
            .unwrap_or(Ordering::Equal),
    };
    price_order
        .then_with(|| source_rank(a.entry.source, priority).cmp(&source_rank(b.entry.source, priority)))
        .then_with(|| a.entry.url.cmp(&b.entry.url))
}

fn source_rank(source: &str, priority: &[String]) -> usize {
    priority
        .iter()
        .position(|p| p.as_str() == source)
        .unwrap_or(priority.len())
}
