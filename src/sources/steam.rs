use std::collections::BTreeSet;

use scraper::{Html, Selector};

use super::{first_text, og_image, SourceAdapter};
use crate::error::ParseError;
use crate::model::{CatalogEntry, Distribution, Platform};
use crate::normalization::parse_money;

const MAX_LISTING_PAGES: u32 = 30;

/// Steam storefront. Walks the top-sellers search listing; product pages are
/// always PC / digital.
pub struct Steam;

impl SourceAdapter for Steam {
    fn id(&self) -> &'static str {
        "steam"
    }

    fn listing_page_url(&self, page: u32) -> Option<String> {
        (page < MAX_LISTING_PAGES).then(|| {
            format!(
                "https://store.steampowered.com/search/?filter=topsellers&page={}",
                page + 1
            )
        })
    }

    fn parse_listing(&self, html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        let row = Selector::parse("a.search_result_row").expect("static selector");
        let mut urls = Vec::new();
        for link in doc.select(&row) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !href.contains("/app/") {
                continue;
            }
            // Search result links carry per-session query strings; keep the
            // stable app URL only.
            let clean = href.split('?').next().unwrap_or(href);
            urls.push(clean.to_string());
        }
        urls
    }

    fn extract(&self, url: &str, html: &str) -> Result<CatalogEntry, ParseError> {
        let doc = Html::parse_document(html);
        let title = first_text(&doc, "div#appHubAppName")
            .or_else(|| first_text(&doc, "div.apphub_AppName"))
            .ok_or(ParseError::MissingTitle)?;

        let discounted = first_text(&doc, "div.discount_final_price").and_then(|t| parse_money(&t));
        let original =
            first_text(&doc, "div.discount_original_price").and_then(|t| parse_money(&t));
        let single = first_text(&doc, "div.game_purchase_price").and_then(|t| parse_money(&t));

        let (list_price, discount_price) = match (discounted, original, single) {
            (Some(now), Some(base), _) if base > now => (base, Some(now)),
            (Some(now), _, _) => (now, None),
            (None, _, Some(price)) => (price, None),
            _ => return Err(ParseError::MissingPrice),
        };

        Ok(CatalogEntry {
            source: self.id(),
            url: url.to_string(),
            title,
            list_price,
            discount_price,
            currency: "USD",
            platforms: BTreeSet::from([Platform::Pc]),
            image_url: og_image(&doc),
            distribution: Distribution::Digital,
        })
    }
}
