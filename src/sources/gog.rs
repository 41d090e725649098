use std::collections::BTreeSet;

use scraper::{Html, Selector};
use url::Url;

use super::{first_text, og_image, SourceAdapter};
use crate::error::ParseError;
use crate::model::{CatalogEntry, Distribution, Platform};
use crate::normalization::parse_money;

const BASE_URL: &str = "https://www.gog.com";
const MAX_LISTING_PAGES: u32 = 30;

/// GOG storefront. Walks the trending catalog; always PC / digital.
pub struct Gog;

impl SourceAdapter for Gog {
    fn id(&self) -> &'static str {
        "gog"
    }

    fn listing_page_url(&self, page: u32) -> Option<String> {
        (page < MAX_LISTING_PAGES)
            .then(|| format!("{BASE_URL}/en/games?page={}&order=desc:trending", page + 1))
    }

    fn parse_listing(&self, html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        let tile = Selector::parse("a.product-tile").expect("static selector");
        let fallback = Selector::parse(r#"a[href*="/game/"]"#).expect("static selector");
        let base = Url::parse(BASE_URL).expect("static base url");

        let mut links: Vec<_> = doc.select(&tile).collect();
        if links.is_empty() {
            links = doc.select(&fallback).collect();
        }

        let mut urls = Vec::new();
        for link in links {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Ok(full) = base.join(href) else {
                continue;
            };
            let full = full.to_string();
            if full.contains("/game/") {
                urls.push(full);
            }
        }
        urls
    }

    fn extract(&self, url: &str, html: &str) -> Result<CatalogEntry, ParseError> {
        let doc = Html::parse_document(html);
        let title = first_text(&doc, "h1.productcard-basics__title")
            .or_else(|| first_text(&doc, "h1"))
            .ok_or(ParseError::MissingTitle)?;

        let final_amount = first_text(&doc, "span.product-actions-price__final-amount")
            .or_else(|| first_text(&doc, "span.price-value"))
            .and_then(|t| parse_money(&t));
        let base_amount = first_text(&doc, "span.product-actions-price__base-amount")
            .and_then(|t| parse_money(&t));

        let (list_price, discount_price) = match (final_amount, base_amount) {
            (Some(now), Some(base)) if base > now => (base, Some(now)),
            (Some(now), _) => (now, None),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_discounted_product_card() {
        let html = r#"
            <head><meta property="og:image" content="https://images.gog/w3.jpg"></head>
            <h1 class="productcard-basics__title">The Witcher 3: Wild Hunt</h1>
            <span class="product-actions-price__base-amount">49.99</span>
            <span class="product-actions-price__final-amount">9.99</span>"#;
        let entry = Gog.extract("https://www.gog.com/en/game/w3", html).unwrap();
        assert_eq!(entry.list_price, 49.99);
        assert_eq!(entry.discount_price, Some(9.99));
        assert_eq!(entry.discount_percent(), 80);
    }

    #[test]
    fn full_price_has_no_discount() {
        let html = r#"<h1>Some Game</h1><span class="price-value">19.99</span>"#;
        let entry = Gog.extract("https://www.gog.com/en/game/x", html).unwrap();
        assert_eq!(entry.list_price, 19.99);
        assert_eq!(entry.discount_price, None);
    }

    #[test]
    fn listing_joins_relative_links() {
        let html = r#"
            <a class="product-tile" href="/en/game/the_witcher_3"></a>
            <a class="product-tile" href="https://www.gog.com/en/game/cyberpunk"></a>
            <a class="product-tile" href="/en/news/some_post"></a>"#;
        let urls = Gog.parse_listing(html);
        assert_eq!(
            urls,
            vec![
                "https://www.gog.com/en/game/the_witcher_3".to_string(),
                "https://www.gog.com/en/game/cyberpunk".to_string(),
            ]
        );
    }

    #[test]
    fn priceless_page_is_a_parse_error() {
        assert!(matches!(
            Gog.extract("https://www.gog.com/en/game/x", "<h1>Soon</h1>"),
            Err(ParseError::MissingPrice)
        ));
    }
}
