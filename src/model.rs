//! Run-scoped data model: everything here is created fresh each pass and
//! discarded once the dataset is published (or the pass fails).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::normalization::TitleKey;

/// Platform families a listing can be sold for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Platform {
    #[serde(rename = "PC")]
    Pc,
    PlayStation,
    Xbox,
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Pc => "PC",
            Platform::PlayStation => "PlayStation",
            Platform::Xbox => "Xbox",
            Platform::Other => "Other",
        }
    }
}

/// How the product is delivered to the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distribution {
    Digital,
    Physical,
}

impl Distribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Digital => "Digital",
            Distribution::Physical => "Physical",
        }
    }
}

/// Raw per-source record produced by the field extractor.
///
/// Immutable once built, owned by the pass that created it. The currency is
/// carried per entry because each storefront is scraped in one region; it is
/// not part of the published record.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub source: &'static str,
    pub url: String,
    pub title: String,
    pub list_price: f64,
    pub discount_price: Option<f64>,
    pub currency: &'static str,
    pub platforms: BTreeSet<Platform>,
    pub image_url: Option<String>,
    pub distribution: Distribution,
}

impl CatalogEntry {
    /// Derived discount depth in whole percent; 0 when the listing has no cut.
    pub fn discount_percent(&self) -> u8 {
        match self.discount_price {
            Some(d) if self.list_price > 0.0 && d < self.list_price => {
                (((self.list_price - d) / self.list_price) * 100.0).round() as u8
            }
            _ => 0,
        }
    }
}

/// A catalog entry plus whatever the enrichment tier managed to add.
///
/// Additions are monotonic: a field set once is never overwritten by a later
/// (lower-confidence) lookup.
#[derive(Debug, Clone)]
pub struct EnrichedEntry {
    pub entry: CatalogEntry,
    pub duration_hours: Option<f64>,
    pub rating: Option<u8>,
}

impl EnrichedEntry {
    pub fn new(entry: CatalogEntry) -> Self {
        Self {
            entry,
            duration_hours: None,
            rating: None,
        }
    }

    pub fn set_duration(&mut self, hours: f64) {
        if self.duration_hours.is_none() {
            self.duration_hours = Some(hours);
        }
    }

    pub fn set_rating(&mut self, rating: u8) {
        if self.rating.is_none() {
            self.rating = Some(rating);
        }
    }
}

/// The deduplicated, publish-ready record: one per identity key per run.
///
/// Field names match the published JSON consumed by the display layer.
/// Optional fields serialize as null and must survive a reload unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalItem {
    pub name: String,
    pub price_regular: f64,
    pub price_discount: Option<f64>,
    pub discount_percent: u8,
    pub rating: Option<u8>,
    pub platforms: BTreeSet<Platform>,
    pub howlongtobeat: Option<f64>,
    pub distribution_type: Distribution,
    pub site: String,
    pub url: String,
    pub image_url: Option<String>,
}

impl From<EnrichedEntry> for CanonicalItem {
    fn from(enriched: EnrichedEntry) -> Self {
        let discount_percent = enriched.entry.discount_percent();
        let e = enriched.entry;
        Self {
            name: e.title,
            price_regular: e.list_price,
            price_discount: e.discount_price,
            discount_percent,
            rating: enriched.rating,
            platforms: e.platforms,
            howlongtobeat: enriched.duration_hours,
            distribution_type: e.distribution,
            site: e.source.to_string(),
            url: e.url,
            image_url: e.image_url,
        }
    }
}

/// One run's full output: built wholesale, never incrementally mutated, and
/// wholly replacing the previous dataset on successful publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    pub items: Vec<CanonicalItem>,
}

impl Dataset {
    /// Sort by identity key so the published order is deterministic given
    /// the same inputs, regardless of arrival order inside the pipeline.
    pub fn new(mut items: Vec<CanonicalItem>) -> Self {
        items.sort_by(|a, b| {
            TitleKey::new(&a.name)
                .cmp(&TitleKey::new(&b.name))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.url.cmp(&b.url))
        });
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(list: f64, discount: Option<f64>) -> CatalogEntry {
        CatalogEntry {
            source: "steam",
            url: "https://example.com/app/1".into(),
            title: "Some Game".into(),
            list_price: list,
            discount_price: discount,
            currency: "USD",
            platforms: BTreeSet::from([Platform::Pc]),
            image_url: None,
            distribution: Distribution::Digital,
        }
    }

    #[test]
    fn discount_percent_derivation() {
        assert_eq!(entry(29.99, Some(17.99)).discount_percent(), 40);
        assert_eq!(entry(29.99, None).discount_percent(), 0);
        assert_eq!(entry(29.99, Some(29.99)).discount_percent(), 0);
        assert_eq!(entry(0.0, Some(1.0)).discount_percent(), 0);
    }

    #[test]
    fn enrichment_is_monotonic() {
        let mut enriched = EnrichedEntry::new(entry(19.99, None));
        enriched.set_duration(12.0);
        enriched.set_duration(99.0);
        enriched.set_rating(90);
        enriched.set_rating(50);
        assert_eq!(enriched.duration_hours, Some(12.0));
        assert_eq!(enriched.rating, Some(90));
    }

    #[test]
    fn dataset_order_is_input_independent() {
        let a = CanonicalItem::from(EnrichedEntry::new(CatalogEntry {
            title: "Beta Game".into(),
            ..entry(10.0, None)
        }));
        let b = CanonicalItem::from(EnrichedEntry::new(CatalogEntry {
            title: "Alpha Game".into(),
            ..entry(10.0, None)
        }));
        let one = Dataset::new(vec![a.clone(), b.clone()]);
        let two = Dataset::new(vec![b, a]);
        assert_eq!(one, two);
        assert_eq!(one.items[0].name, "Alpha Game");
    }
}
