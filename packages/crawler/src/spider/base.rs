//! Helpers every spider shares: price parsing, text normalization, slug
//! generation, brand extraction, URL absolutization.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use url::Url;

lazy_static! {
    static ref NUMERIC_RE: Regex = Regex::new(r"\d+(?:\.\d{1,2})?").expect("static pattern compiles");
}

/// Currency markers stripped before numeric extraction.
const CURRENCY_MARKERS: &[&str] = &["৳", "$", "£", "€", "₹", "BDT", "Tk.", "Tk", "USD"];

/// Brands recognized across retailers. Substring match, first hit wins;
/// curated order, no tie-break beyond it.
pub const KNOWN_BRANDS: &[&str] = &[
    "AMD", "Intel", "ASRock", "ASUS", "Gigabyte", "MSI", "Biostar", "Corsair", "G.Skill",
    "Kingston", "Crucial", "Samsung", "ADATA", "TeamGroup", "Team", "Patriot", "Transcend",
    "PNY", "Lexar", "Apacer", "Geil", "Netac", "Twinmos", "OCPC",
];

/// Parse a retailer price string into a positive decimal.
///
/// Strips currency symbols and thousands separators, then takes the
/// first numeric run. Returns `None` on anything unparsable — callers
/// drop the item rather than guessing.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let mut text = raw.to_string();
    for marker in CURRENCY_MARKERS {
        text = text.replace(marker, "");
    }
    let text = text.replace(',', "");

    let captured = NUMERIC_RE.find(&text)?;
    let price: Decimal = captured.as_str().parse().ok()?;
    (price > Decimal::ZERO).then_some(price)
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// URL-safe slug: lowercase alphanumerics joined by single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Extract a brand from a product name: first known brand that appears
/// as a substring, falling back to the name's first token.
pub fn extract_brand(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    for brand in KNOWN_BRANDS {
        if lower.contains(&brand.to_lowercase()) {
            return Some((*brand).to_string());
        }
    }
    name.split_whitespace().next().map(str::to_string)
}

/// Resolve a possibly-relative href against the retailer base URL.
pub fn absolutize(base_url: &str, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    Url::parse(base_url)
        .ok()?
        .join(href)
        .ok()
        .map(|u| u.to_string())
}

/// Whether a listing card's action/stock text marks an unpurchasable
/// product (out of stock, pre-order, upcoming).
pub fn is_unpurchasable(action_text: &str) -> bool {
    let lower = action_text.to_lowercase();
    ["out of stock", "stock out", "pre-order", "pre order", "upcoming", "coming soon"]
        .iter()
        .any(|marker| lower.contains(marker))
}
