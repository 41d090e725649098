use std::collections::BTreeSet;

use scraper::{Html, Selector};
use url::Url;

use super::{first_attr, first_text, og_image, SourceAdapter};
use crate::error::ParseError;
use crate::model::{CatalogEntry, Distribution, Platform};
use crate::normalization::parse_money;

const BASE_URL: &str = "https://www.greenmangaming.com";
const MAX_LISTING_PAGES: u32 = 20;

/// Green Man Gaming storefront. The markup has shifted between redesigns, so
/// both price selectors carry fallbacks.
pub struct GreenManGaming;

impl SourceAdapter for GreenManGaming {
    fn id(&self) -> &'static str {
        "gmg"
    }

    fn listing_page_url(&self, page: u32) -> Option<String> {
        (page < MAX_LISTING_PAGES).then(|| format!("{BASE_URL}/games/?page={}", page + 1))
    }

    fn parse_listing(&self, html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        let link = Selector::parse(r#"a[href*="/games/"]"#).expect("static selector");
        let base = Url::parse(BASE_URL).expect("static base url");

        let mut urls = Vec::new();
        for el in doc.select(&link) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            let Ok(full) = base.join(href) else {
                continue;
            };
            // Skip the catalog page itself; only product detail paths count.
            if full.path() == "/games/" {
                continue;
            }
            urls.push(full.to_string());
        }
        urls
    }

    fn extract(&self, url: &str, html: &str) -> Result<CatalogEntry, ParseError> {
        let doc = Html::parse_document(html);
        let title = first_text(&doc, "h1.product-title")
            .or_else(|| first_text(&doc, "h1"))
            .ok_or(ParseError::MissingTitle)?;

        let current = first_text(&doc, ".price .current")
            .or_else(|| first_text(&doc, ".price__current"))
            .or_else(|| first_text(&doc, ".price"))
            .and_then(|t| parse_money(&t));
        let was = first_text(&doc, ".price .was")
            .or_else(|| first_text(&doc, ".price__was"))
            .or_else(|| first_text(&doc, ".price-old"))
            .and_then(|t| parse_money(&t));

        let (list_price, discount_price) = match (current, was) {
            (Some(now), Some(old)) if old > now => (old, Some(now)),
            (Some(now), _) => (now, None),
            (None, Some(old)) => (old, None),
            (None, None) => return Err(ParseError::MissingPrice),
        };

        let image_url = og_image(&doc)
            .or_else(|| first_attr(&doc, "img.product-image", "src"));

        Ok(CatalogEntry {
            source: self.id(),
            url: url.to_string(),
            title,
            list_price,
            discount_price,
            currency: "USD",
            platforms: BTreeSet::from([Platform::Pc]),
            image_url,
            distribution: Distribution::Digital,
        })
    }
}
