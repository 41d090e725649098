//! Source adapters: one per storefront catalog.
//!
//! An adapter owns everything specific to its catalog - listing pagination,
//! the CSS selectors of its product pages, URL filters - and nothing else.
//! Adapters never perform network I/O: listing pagination is exposed as a
//! lazy sequence of page URLs the seed collector downloads, and extraction
//! is a pure function of an already-downloaded page. Adding a storefront
//! means adding one module here and registering it in `default_adapters`.

mod gmg;
mod gog;
mod steam;

pub use gmg::GreenManGaming;
pub use gog::Gog;
pub use steam::Steam;

use std::sync::Arc;

use scraper::{Html, Selector};

use crate::error::ParseError;
use crate::model::CatalogEntry;

/// Capability surface the pipeline needs from one catalog.
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier; also the published `site` value and the key used
    /// for configured source priority.
    fn id(&self) -> &'static str;

    /// URL of the `page`-th listing page (0-based), or None once the
    /// pagination is exhausted. Finite and restartable per run.
    fn listing_page_url(&self, page: u32) -> Option<String>;

    /// Candidate item URLs found on one listing page. An unrecognized page
    /// yields an empty list; the seed collector decides when a source is
    /// done.
    fn parse_listing(&self, html: &str) -> Vec<String>;

    /// Extract a raw record from one product page. Fails when the required
    /// fields (title, at least one price) are absent.
    fn extract(&self, url: &str, html: &str) -> Result<CatalogEntry, ParseError>;
}

/// The built-in storefront set, in default priority order.
pub fn default_adapters() -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(Steam),
        Arc::new(Gog),
        Arc::new(GreenManGaming),
    ]
}

/// Text of the first element matching `css`, trimmed; None when the element
/// is absent or empty.
pub(crate) fn first_text(doc: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// The page's og:image URL, the cover art every storefront exposes.
pub(crate) fn og_image(doc: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[property="og:image"]"#).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
        .filter(|url| !url.is_empty())
}

/// Attribute of the first element matching `css`.
pub(crate) fn first_attr(doc: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}
