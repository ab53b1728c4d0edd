//! Star Tech spider: plain HTTP, items complete from the listing page.

use scraper::{Html, Selector};
use tracing::debug;

use crate::item::ScrapedItem;
use crate::retailer::RetailerId;
use crate::spider::base::{
    absolutize, collapse_whitespace, extract_brand, is_unpurchasable, parse_price,
};
use crate::spider::{FetchedPage, PageRequest, ParseResult, Spider};

const CATEGORIES: &[(&str, &str)] = &[
    ("processor", "component/processor"),
    ("motherboard", "component/motherboard"),
    ("ram", "component/ram"),
];

pub struct StartechSpider {
    base_url: &'static str,
    card: Selector,
    name: Selector,
    price: Selector,
    image: Selector,
    action: Selector,
    short_specs: Selector,
    next_link: Selector,
}

impl StartechSpider {
    pub fn new() -> Self {
        let sel = |s: &str| Selector::parse(s).expect("static selector parses");
        Self {
            base_url: RetailerId::Startech.config().base_url,
            card: sel(".p-item"),
            name: sel(".p-item-name a"),
            price: sel(".p-item-price span"),
            image: sel(".p-item-img img"),
            action: sel(".actions span"),
            short_specs: sel(".short-description li"),
            next_link: sel("ul.pagination a"),
        }
    }
}

impl Default for StartechSpider {
    fn default() -> Self {
        Self::new()
    }
}

impl Spider for StartechSpider {
    fn retailer(&self) -> RetailerId {
        RetailerId::Startech
    }

    fn start_requests(&self, category: Option<&str>) -> Vec<PageRequest> {
        let paths: Vec<(&str, String)> = match category {
            Some(wanted) => {
                let path = CATEGORIES
                    .iter()
                    .find(|(name, _)| *name == wanted)
                    .map(|(_, path)| (*path).to_string())
                    .unwrap_or_else(|| wanted.to_string());
                vec![(wanted, path)]
            }
            None => CATEGORIES
                .iter()
                .map(|(name, path)| (*name, (*path).to_string()))
                .collect(),
        };

        paths
            .into_iter()
            .map(|(name, path)| {
                PageRequest::listing(format!("{}/{}", self.base_url, path), name, 1)
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

            // Purchasable-only policy: no parsable price or an explicit
            // out-of-stock/pre-order marker silently excludes the card.
            let action_text: String = card
                .select(&self.action)
                .map(|el| el.text().collect::<String>())
                .collect::<Vec<_>>()
                .join(" ");
            if is_unpurchasable(&action_text) {
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

            // Listing cards carry "Key: Value" bullet specs.
            for bullet in card.select(&self.short_specs) {
                let text = collapse_whitespace(&bullet.text().collect::<String>());
                if let Some((key, value)) = text.split_once(':') {
                    item.specs.insert(
                        key.trim().to_string(),
                        serde_json::Value::String(value.trim().to_string()),
                    );
                }
            }

            result.items.push(item);
        }

        result.next_page = document
            .select(&self.next_link)
            .find(|el| {
                el.text()
                    .collect::<String>()
                    .trim()
                    .eq_ignore_ascii_case("next")
            })
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| absolutize(self.base_url, href))
            .map(|url| {
                let next_number = page_param(&url).unwrap_or(page.page_number + 1);
                PageRequest {
                    url,
                    category: page.category.clone(),
                    page_number: next_number,
                    render_override: None,
                }
            });

        result
    }
}

/// Page number from a `?page=N` query parameter, so the loop guard keys
/// on what the retailer is actually serving.
fn page_param(url: &str) -> Option<u32> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
    <div class="main-content">
      <div class="p-item">
        <div class="p-item-img"><img src="/image/ryzen-5-5600.webp"></div>
        <h4 class="p-item-name"><a href="/amd-ryzen-5-5600">AMD Ryzen 5   5600 Processor</a></h4>
        <div class="short-description"><ul>
          <li>Socket: AM4</li>
          <li>TDP: 65W</li>
        </ul></div>
        <div class="p-item-price"><span>17,500৳</span></div>
        <div class="actions"><span>Buy Now</span></div>
      </div>
      <div class="p-item">
        <h4 class="p-item-name"><a href="/intel-core-i9-14900k">Intel Core i9-14900K</a></h4>
        <div class="p-item-price"><span>Up Coming</span></div>
        <div class="actions"><span>Upcoming</span></div>
      </div>
      <div class="p-item">
        <h4 class="p-item-name"><a href="/ryzen-7-7700"> AMD Ryzen 7 7700</a></h4>
        <div class="p-item-price"><span>Call for Price</span></div>
        <div class="actions"><span>Buy Now</span></div>
      </div>
      <ul class="pagination">
        <li><a href="/component/processor?page=2">NEXT</a></li>
      </ul>
    </div>
    "#;

    fn fetched(html: &str, page_number: u32) -> FetchedPage {
        FetchedPage::new(
            &PageRequest::listing(
                "https://www.startech.com.bd/component/processor",
                "processor",
                page_number,
            ),
            html,
        )
    }

    #[test]
    fn parses_purchasable_items_only() {
        let spider = StartechSpider::new();
        let result = spider.parse_listing(&fetched(LISTING, 1));

        // The upcoming item and the priceless item are silently excluded.
        assert_eq!(result.items.len(), 1);
        let item = &result.items[0];
        assert_eq!(item.name, "AMD Ryzen 5 5600 Processor");
        assert_eq!(item.price, rust_decimal::Decimal::from(17500));
        assert_eq!(
            item.product_url,
            "https://www.startech.com.bd/amd-ryzen-5-5600"
        );
        assert_eq!(item.brand.as_deref(), Some("AMD"));
        assert_eq!(item.in_stock, Some(true));
        assert_eq!(
            item.specs.get("Socket"),
            Some(&serde_json::Value::String("AM4".to_string()))
        );
    }

    #[test]
    fn follows_the_next_page_link_with_its_real_page_number() {
        let spider = StartechSpider::new();
        let result = spider.parse_listing(&fetched(LISTING, 1));

        let next = result.next_page.expect("next page link present");
        assert_eq!(next.page_number, 2);
        assert_eq!(next.category, "processor");
        assert!(next.url.ends_with("?page=2"));
    }

    #[test]
    fn empty_listing_has_no_items_and_no_next() {
        let spider = StartechSpider::new();
        let result = spider.parse_listing(&fetched("<div></div>", 3));
        assert!(result.is_empty());
        assert!(result.next_page.is_none());
    }

    #[test]
    fn category_filter_narrows_start_requests() {
        let spider = StartechSpider::new();
        assert_eq!(spider.start_requests(None).len(), 3);

        let only = spider.start_requests(Some("ram"));
        assert_eq!(only.len(), 1);
        assert!(only[0].url.ends_with("component/ram"));
        assert_eq!(only[0].page_number, 1);
    }
}
