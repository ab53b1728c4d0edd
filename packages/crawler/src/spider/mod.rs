//! Spider contract and shared parsing helpers.
//!
//! Spiders are pure parsers: the crawl engine does the fetching,
//! throttling and pagination bookkeeping; a spider turns a fetched page
//! into items, detail requests and the next listing request.

pub mod base;
pub mod skyland;
pub mod startech;
pub mod techland;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::ScrapedItem;
use crate::retailer::RetailerId;

/// A listing or detail page the engine should fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    pub url: String,
    pub category: String,
    /// 1-based listing page number; drives the click-chain depth for
    /// rendered retailers.
    pub page_number: u32,
    /// Per-request override of the retailer's rendering policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_override: Option<bool>,
}

impl PageRequest {
    pub fn listing(url: impl Into<String>, category: impl Into<String>, page_number: u32) -> Self {
        Self {
            url: url.into(),
            category: category.into(),
            page_number,
            render_override: None,
        }
    }

    /// The following listing page in the same category.
    pub fn next(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            category: self.category.clone(),
            page_number: self.page_number + 1,
            render_override: self.render_override,
        }
    }
}

/// A fetched (and possibly rendered) page, ready for parsing.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub category: String,
    pub page_number: u32,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    pub fn new(request: &PageRequest, html: impl Into<String>) -> Self {
        Self {
            url: request.url.clone(),
            category: request.category.clone(),
            page_number: request.page_number,
            html: html.into(),
            fetched_at: Utc::now(),
        }
    }
}

/// A detail page to fetch for one partially-parsed item.
#[derive(Debug, Clone)]
pub struct DetailRequest {
    pub url: String,
    pub partial: ScrapedItem,
}

/// Everything a spider found on one listing page.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Items complete enough to go straight into the pipeline.
    pub items: Vec<ScrapedItem>,
    /// Items needing a detail-page visit before they are complete.
    pub detail_requests: Vec<DetailRequest>,
    /// The next listing page, if the spider found one.
    pub next_page: Option<PageRequest>,
}

impl ParseResult {
    /// True when the page yielded nothing at all — the engine treats
    /// this as end of catalog.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.detail_requests.is_empty()
    }
}

/// One implementation per retailer.
pub trait Spider: Send + Sync {
    fn retailer(&self) -> RetailerId;

    /// Initial listing requests, optionally narrowed to one category.
    fn start_requests(&self, category: Option<&str>) -> Vec<PageRequest>;

    /// Parse a listing page into items and follow-up requests.
    fn parse_listing(&self, page: &FetchedPage) -> ParseResult;

    /// Enrich a partial item with its detail page. `None` drops the
    /// item (e.g. the detail page revealed it is not purchasable).
    fn parse_detail(&self, _page: &FetchedPage, partial: ScrapedItem) -> Option<ScrapedItem> {
        Some(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_request_increments_page_and_keeps_category() {
        let first = PageRequest::listing("https://example.com/cpu", "processor", 1);
        let second = first.next("https://example.com/cpu?page=2");
        assert_eq!(second.page_number, 2);
        assert_eq!(second.category, "processor");
    }

    #[test]
    fn empty_parse_result_signals_end_of_catalog() {
        assert!(ParseResult::default().is_empty());
    }
}
