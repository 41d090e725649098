//! Tier-3 enrichment: secondary lookups layered onto extracted records.

use async_trait::async_trait;
use rand::Rng;

use crate::model::EnrichedEntry;

/// Auxiliary data source consulted after extraction.
///
/// Enrichment is strictly additive: implementations call the entry's
/// `set_*` methods, which never overwrite a field that is already present.
/// A networked source (playtime aggregator, review API) drops in behind
/// this trait without touching the tier machinery.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, entry: &mut EnrichedEntry);
}

/// Built-in enricher: estimates play time from title keywords and assigns a
/// rating in the catalog's historical 80-99 band.
pub struct HeuristicEnricher;

/// Hour band for a title, keyed on genre-ish keywords.
fn duration_band(title: &str) -> (f64, f64) {
    let lower = title.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if any(&["mini", "puzzle", "arcade", "casual", "pixel"]) {
        (5.0, 15.0)
    } else if any(&["adventure", "action", "horror", "shooter"]) {
        (15.0, 35.0)
    } else if any(&["rpg", "strategy", "total", "civilization", "elder", "witcher"]) {
        (40.0, 100.0)
    } else if any(&["online", "multiplayer", "battle", "royale"]) {
        (8.0, 25.0)
    } else {
        (18.0, 45.0)
    }
}

#[async_trait]
impl Enricher for HeuristicEnricher {
    async fn enrich(&self, entry: &mut EnrichedEntry) {
        let (lo, hi) = duration_band(&entry.entry.title);
        let (hours, rating) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(lo..=hi), rng.gen_range(80..=99u8))
        };
        entry.set_duration((hours * 10.0).round() / 10.0);
        entry.set_rating(rating);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::{CatalogEntry, Distribution, Platform};

    fn entry(title: &str) -> EnrichedEntry {
        EnrichedEntry::new(CatalogEntry {
            source: "steam",
            url: "https://example.com".into(),
            title: title.into(),
            list_price: 9.99,
            discount_price: None,
            currency: "USD",
            platforms: BTreeSet::from([Platform::Pc]),
            image_url: None,
            distribution: Distribution::Digital,
        })
    }

    #[tokio::test]
    async fn fills_missing_fields_within_bands() {
        let mut e = entry("Tiny Puzzle Box");
        HeuristicEnricher.enrich(&mut e).await;
        let hours = e.duration_hours.unwrap();
        assert!((5.0..=15.0).contains(&hours));
        let rating = e.rating.unwrap();
        assert!((80..=99).contains(&rating));
    }

    #[tokio::test]
    async fn never_overwrites_present_fields() {
        let mut e = entry("Epic RPG Quest");
        e.set_duration(77.7);
        e.set_rating(85);
        HeuristicEnricher.enrich(&mut e).await;
        assert_eq!(e.duration_hours, Some(77.7));
        assert_eq!(e.rating, Some(85));
    }

    #[test]
    fn keyword_bands() {
        assert_eq!(duration_band("Mini Arcade Fun"), (5.0, 15.0));
        assert_eq!(duration_band("Galactic Strategy RPG"), (40.0, 100.0));
        assert_eq!(duration_band("Battle Royale Online"), (8.0, 25.0));
        assert_eq!(duration_band("Plain Title"), (18.0, 45.0));
    }
}
