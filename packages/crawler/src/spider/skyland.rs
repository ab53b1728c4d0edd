//! Skyland spider: listings only render under JavaScript, and robots.txt
//! forbids page-number query parameters, so pagination is a click-chain
//! replay — the engine re-renders from page 1 and clicks "next" N−1
//! times to reach page N.

use scraper::{Html, Selector};
use tracing::debug;

use crate::item::ScrapedItem;
use crate::retailer::RetailerId;
use crate::spider::base::{
    absolutize, collapse_whitespace, extract_brand, is_unpurchasable, parse_price,
};
use crate::spider::{FetchedPage, PageRequest, ParseResult, Spider};

const CATEGORIES: &[(&str, &str)] = &[
    ("processor", "category/processor"),
    ("motherboard", "category/motherboard"),
    ("ram", "category/ram"),
];

pub struct SkylandSpider {
    base_url: &'static str,
    card: Selector,
    name: Selector,
    price: Selector,
    image: Selector,
    badge: Selector,
    buy_button: Selector,
}

impl SkylandSpider {
    pub fn new() -> Self {
        let sel = |s: &str| Selector::parse(s).expect("static selector parses");
        Self {
            base_url: RetailerId::Skyland.config().base_url,
            card: sel(".product-card"),
            name: sel(".product-card__title a"),
            price: sel(".product-card__price"),
            image: sel(".product-card__image img"),
            badge: sel(".product-card__badge"),
            buy_button: sel(".product-card__actions button"),
        }
    }
}

impl Default for SkylandSpider {
    fn default() -> Self {
        Self::new()
    }
}

impl Spider for SkylandSpider {
    fn retailer(&self) -> RetailerId {
        RetailerId::Skyland
    }

    fn start_requests(&self, category: Option<&str>) -> Vec<PageRequest> {
        CATEGORIES
            .iter()
            .filter(|(name, _)| category.map_or(true, |c| c == *name))
            .map(|(name, path)| {
                PageRequest::listing(format!("{}/{}", self.base_url, path), *name, 1)
            })
            .collect()
    }

    fn parse_listing(&self, page: &FetchedPage) -> ParseResult {
        let document = Html::parse_document(&page.html);
        let mut result = ParseResult::default();

        for card in document.select(&self.card) {
            let Some(name_el) = card.select(&self.name).next() else {
                continue;
            };
            let name = collapse_whitespace(&name_el.text().collect::<String>());
            let href = name_el.value().attr("href").unwrap_or_default();

            let badge_text: String = card
                .select(&self.badge)
                .map(|el| el.text().collect::<String>())
                .collect::<Vec<_>>()
                .join(" ");
            // Buy-button text distinguishes purchasable cards from
            // pre-order/upcoming ones when no badge is present.
            let button_text: String = card
                .select(&self.buy_button)
                .map(|el| el.text().collect::<String>())
                .collect::<Vec<_>>()
                .join(" ");
            if is_unpurchasable(&badge_text) || is_unpurchasable(&button_text) {
                debug!(name = %name, "skipping unpurchasable listing");
                continue;
            }

            let Some(price) = card
                .select(&self.price)
                .next()
                .and_then(|el| parse_price(&el.text().collect::<String>()))
            else {
                debug!(name = %name, "skipping listing without a parsable price");
                continue;
            };

            let mut item = ScrapedItem::new(&name, self.retailer().slug(), &page.category)
                .with_price(price);
            if let Some(url) = absolutize(self.base_url, href) {
                item.product_url = url;
            }
            item.image_url = card
                .select(&self.image)
                .next()
                .and_then(|el| el.value().attr("src"))
                .and_then(|src| absolutize(self.base_url, src));
            item.brand = extract_brand(&name);
            item.in_stock = Some(true);

            result.items.push(item);
        }

        // No URL-based pagination: the next page is the same category URL
        // one click deeper. The engine's visited set and MAX_PAGES cap
        // bound the chain; an empty page ends it first.
        if !result.items.is_empty() {
            result.next_page = Some(PageRequest {
                url: page.url.clone(),
                category: page.category.clone(),
                page_number: page.page_number + 1,
                render_override: None,
            });
        }

        result
    }
}
