//! Mock implementations for exercising the engine and pipeline without
//! a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::retailer::{Politeness, RetailerConfig, RetailerId};
use crate::spider::{FetchedPage, PageRequest};

/// Serves canned HTML keyed by `(category, page_number)`. Unknown pages
/// 404. Every served request is recorded for assertions.
pub struct MockFetcher {
    pages: HashMap<(String, u32), String>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl MockFetcher {
    pub fn new(pages: HashMap<(String, u32), String>) -> Self {
        Self {
            pages,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, FetchError> {
        let key = (request.category.clone(), request.page_number);
        self.calls.lock().unwrap().push(key.clone());

        match self.pages.get(&key) {
            Some(html) => Ok(FetchedPage::new(request, html.clone())),
            None => Err(FetchError::Status {
                status: 404,
                url: request.url.clone(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Build a `MockFetcher` page table from literals.
pub fn pages<const N: usize>(
    entries: [((&str, u32), String); N],
) -> HashMap<(String, u32), String> {
    entries
        .into_iter()
        .map(|((category, page), html)| ((category.to_string(), page), html))
        .collect()
}

/// Retailer configs with politeness shrunk to test scale.
pub struct ShortDelays;

impl ShortDelays {
    pub fn config(retailer: RetailerId) -> RetailerConfig {
        let mut config = retailer.config();
        config.politeness = Politeness {
            start_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            requests_per_second: 1_000,
            max_concurrency: 1,
        };
        config
    }
}
