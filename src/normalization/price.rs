use std::sync::LazyLock;

use regex::Regex;

static NON_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.,]+").expect("static pattern"));

/// Parse a storefront price string into an amount: "$19.99" -> 19.99.
///
/// Handles both decimal conventions seen across stores: "1,299.00" treats the
/// comma as a thousands separator, "19,99" treats it as the decimal point.
/// Returns None when no digits survive (e.g. "Free", empty badges).
pub fn parse_money(raw: &str) -> Option<f64> {
    let clean = NON_PRICE.replace_all(raw, "");
    if clean.is_empty() {
        return None;
    }
    let normalized = if clean.contains(',') && clean.contains('.') {
        clean.replace(',', "")
    } else if clean.contains(',') {
        clean.replace(',', ".")
    } else {
        clean.into_owned()
    };
    normalized.parse::<f64>().ok()
}
