//! Tech Land spider: listing cards are thin, so every item takes a
//! detail-page visit for its specification table.

use scraper::{Html, Selector};
use tracing::debug;

use crate::item::ScrapedItem;
use crate::retailer::RetailerId;
use crate::spider::base::{
    absolutize, collapse_whitespace, extract_brand, is_unpurchasable, parse_price,
};
use crate::spider::{DetailRequest, FetchedPage, PageRequest, ParseResult, Spider};

const CATEGORIES: &[(&str, &str)] = &[
    ("processor", "shop/processor"),
    ("motherboard", "shop/motherboard"),
    ("ram", "shop/desktop-ram"),
];

pub struct TechlandSpider {
    base_url: &'static str,
    card: Selector,
    name: Selector,
    price_new: Selector,
    price: Selector,
    image: Selector,
    next_link: Selector,
    spec_row: Selector,
    spec_cell: Selector,
    stock_badge: Selector,
}

impl TechlandSpider {
    pub fn new() -> Self {
        let sel = |s: &str| Selector::parse(s).expect("static selector parses");
        Self {
            base_url: RetailerId::Techland.config().base_url,
            card: sel(".product-layout"),
            name: sel(".name a"),
            price_new: sel(".price-new"),
            price: sel(".price"),
            image: sel(".image img"),
            next_link: sel("ul.pagination li.active + li a"),
            spec_row: sel("#tab-specification table tr"),
            spec_cell: sel("td"),
            stock_badge: sel(".product-stock span"),
        }
    }
}

impl Default for TechlandSpider {
    fn default() -> Self {
        Self::new()
    }
}

impl Spider for TechlandSpider {
    fn retailer(&self) -> RetailerId {
        RetailerId::Techland
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

            let price = card
                .select(&self.price_new)
                .next()
                .or_else(|| card.select(&self.price).next())
                .and_then(|el| parse_price(&el.text().collect::<String>()));
            let Some(price) = price else {
                debug!(name = %name, "skipping listing without a parsable price");
                continue;
            };

            let mut partial = ScrapedItem::new(&name, self.retailer().slug(), &page.category)
                .with_price(price);
            if let Some(url) = absolutize(self.base_url, href) {
                partial.product_url = url;
            }
            partial.image_url = card
                .select(&self.image)
                .next()
                .and_then(|el| el.value().attr("src"))
                .and_then(|src| absolutize(self.base_url, src));

            result.detail_requests.push(DetailRequest {
                url: partial.product_url.clone(),
                partial,
            });
        }

        result.next_page = document
            .select(&self.next_link)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| absolutize(self.base_url, href))
            .map(|url| PageRequest {
                url,
                category: page.category.clone(),
                page_number: page.page_number + 1,
                render_override: None,
            });

        result
    }

    fn parse_detail(&self, page: &FetchedPage, mut partial: ScrapedItem) -> Option<ScrapedItem> {
        let document = Html::parse_document(&page.html);

        // The detail page is authoritative on availability.
        let stock_text: String = document
            .select(&self.stock_badge)
            .map(|el| el.text().collect::<String>())
            .collect::<Vec<_>>()
            .join(" ");
        if is_unpurchasable(&stock_text) {
            debug!(name = %partial.name, "detail page marks item unpurchasable");
            return None;
        }
        partial.in_stock = Some(true);

        for row in document.select(&self.spec_row) {
            let cells: Vec<String> = row
                .select(&self.spec_cell)
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .collect();
            if let [key, value] = cells.as_slice() {
                if !key.is_empty() && !value.is_empty() {
                    partial
                        .specs
                        .insert(key.clone(), serde_json::Value::String(value.clone()));
                }
            }
        }

        partial.brand = partial
            .specs
            .get("Brand")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| extract_brand(&partial.name));

        Some(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
    <div class="row">
      <div class="product-layout">
        <div class="image"><img src="/cache/b650m.jpg"></div>
        <div class="name"><a href="/msi-pro-b650m-a-wifi">MSI PRO B650M-A WIFI</a></div>
        <span class="price"><span class="price-new">৳ 23,500</span></span>
      </div>
      <div class="product-layout">
        <div class="name"><a href="/no-price-board">Mystery Board</a></div>
        <span class="price"></span>
      </div>
    </div>
    <ul class="pagination">
      <li class="active"><a>1</a></li>
      <li><a href="/shop/motherboard?page=2">2</a></li>
    </ul>
    "#;

    const DETAIL: &str = r#"
    <div class="product-info">
      <div class="product-stock"><span>In Stock</span></div>
      <div id="tab-specification"><table>
        <tr><td>Brand</td><td>MSI</td></tr>
        <tr><td>Chipset</td><td>AMD B650</td></tr>
        <tr><td>Memory Type</td><td>DDR5</td></tr>
      </table></div>
    </div>
    "#;

    const DETAIL_STOCK_OUT: &str = r#"
    <div class="product-info">
      <div class="product-stock"><span>Stock Out</span></div>
    </div>
    "#;

    fn listing_page() -> FetchedPage {
        FetchedPage::new(
            &PageRequest::listing(
                "https://www.techlandbd.com/shop/motherboard",
                "motherboard",
                1,
            ),
            LISTING,
        )
    }

    #[test]
    fn listing_emits_detail_requests_not_items() {
        let spider = TechlandSpider::new();
        let result = spider.parse_listing(&listing_page());

        assert!(result.items.is_empty());
        assert_eq!(result.detail_requests.len(), 1);
        assert_eq!(
            result.detail_requests[0].url,
            "https://www.techlandbd.com/msi-pro-b650m-a-wifi"
        );

        let next = result.next_page.expect("second page linked");
        assert_eq!(next.page_number, 2);
    }

    #[test]
    fn detail_fills_specs_and_brand() {
        let spider = TechlandSpider::new();
        let result = spider.parse_listing(&listing_page());
        let partial = result.detail_requests[0].partial.clone();

        let detail_page = FetchedPage::new(
            &PageRequest::listing(partial.product_url.clone(), "motherboard", 1),
            DETAIL,
        );
        let item = spider.parse_detail(&detail_page, partial).unwrap();

        assert_eq!(item.brand.as_deref(), Some("MSI"));
        assert_eq!(item.in_stock, Some(true));
        assert_eq!(
            item.specs.get("Memory Type"),
            Some(&serde_json::Value::String("DDR5".to_string()))
        );
    }

    #[test]
    fn detail_drops_stock_out_items() {
        let spider = TechlandSpider::new();
        let partial = ScrapedItem::new("Some Board", "techland", "motherboard");
        let detail_page = FetchedPage::new(
            &PageRequest::listing("https://www.techlandbd.com/some-board", "motherboard", 1),
            DETAIL_STOCK_OUT,
        );
        assert!(spider.parse_detail(&detail_page, partial).is_none());
    }
}
