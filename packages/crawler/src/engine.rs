//! The crawl engine: drives one retailer's spider through its
//! categories under politeness, pagination-loop and page-cap guards.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{FetchError, ScrapeError};
use crate::fetch::PageFetcher;
use crate::item::ScrapedItem;
use crate::pipeline::ItemPipeline;
use crate::retailer::{RetailerConfig, RetailerId};
use crate::robots::RobotsRules;
use crate::spider::{PageRequest, Spider};
use crate::throttle::AdaptiveThrottle;

/// Hard cap on listing pages per category. For click-chain retailers
/// page N costs O(N) render work, so this bounds cost as well as loops.
pub const MAX_PAGES: u32 = 10;

/// Per-run options from the CLI.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    pub category: Option<String>,
    /// Max items for the whole run; checked between items, a
    /// cooperative stop rather than an interrupt.
    pub limit: Option<usize>,
}

/// What one retailer run produced.
#[derive(Debug)]
pub struct CrawlReport {
    pub retailer: RetailerId,
    pub category: Option<String>,
    pub items: Vec<ScrapedItem>,
    pub pages_fetched: usize,
    pub saved: usize,
    pub failed: usize,
    pub dropped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// JSON shape of a `--output` dump.
#[derive(Debug, Serialize)]
pub struct RunDump<'a> {
    pub scraped_at: DateTime<Utc>,
    pub spider: &'a str,
    pub category: Option<&'a str>,
    pub total_items: usize,
    pub items: &'a [ScrapedItem],
}

impl CrawlReport {
    pub fn dump(&self) -> RunDump<'_> {
        RunDump {
            scraped_at: self.finished_at,
            spider: self.retailer.slug(),
            category: self.category.as_deref(),
            total_items: self.items.len(),
            items: &self.items,
        }
    }
}

/// One retailer, one run. Owns all per-run state: the visited-page set,
/// the throttle, the counters. Nothing survives into the next run.
pub struct CrawlEngine {
    config: RetailerConfig,
    spider: Box<dyn Spider>,
    http: Arc<dyn PageFetcher>,
    render: Option<Arc<dyn PageFetcher>>,
    robots: RobotsRules,
    limiter: DefaultDirectRateLimiter,
    throttle: AdaptiveThrottle,
    pipeline: ItemPipeline,
}

impl CrawlEngine {
    pub fn new(
        retailer: RetailerId,
        http: Arc<dyn PageFetcher>,
        render: Option<Arc<dyn PageFetcher>>,
        pipeline: ItemPipeline,
    ) -> Self {
        Self::with_spider(retailer.config(), retailer.spider(), http, render, pipeline)
    }

    /// Inject a spider directly — the seam tests use.
    pub fn with_spider(
        config: RetailerConfig,
        spider: Box<dyn Spider>,
        http: Arc<dyn PageFetcher>,
        render: Option<Arc<dyn PageFetcher>>,
        pipeline: ItemPipeline,
    ) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.politeness.requests_per_second).unwrap_or(nonzero!(1u32)),
        );
        let throttle = AdaptiveThrottle::new(
            config.politeness.start_delay,
            config.politeness.max_delay,
        );
        Self {
            config,
            spider,
            http,
            render,
            robots: RobotsRules::default(),
            limiter: RateLimiter::direct(quota),
            throttle,
            pipeline,
        }
    }

    /// Apply a fetched robots.txt: crawl-delay can only slow us down.
    pub fn with_robots(mut self, robots: RobotsRules) -> Self {
        if let Some(delay) = robots.crawl_delay() {
            self.throttle.raise_floor(delay);
        }
        self.robots = robots;
        self
    }

    /// Run the crawl to completion and report.
    ///
    /// Fail-run conditions (disabled retailer, robots full disallow)
    /// error out; everything below that severity degrades to skipping a
    /// page, an item or a category.
    pub async fn run(mut self, options: CrawlOptions) -> Result<CrawlReport, ScrapeError> {
        let started_at = Utc::now();
        let retailer = self.config.id;

        if !self.config.enabled {
            return Err(ScrapeError::RetailerDisabled(retailer.slug().to_string()));
        }
        if self.robots.disallows_all() {
            return Err(ScrapeError::RobotsDisallowed(
                self.config.base_url.to_string(),
            ));
        }

        info!(
            retailer = %retailer,
            category = ?options.category,
            limit = ?options.limit,
            "starting crawl"
        );

        let mut visited: HashSet<(String, u32)> = HashSet::new();
        let mut collected: Vec<ScrapedItem> = Vec::new();
        let mut pages_fetched = 0usize;
        let mut limit_reached = false;

        let starts = self.spider.start_requests(options.category.as_deref());
        'categories: for start in starts {
            let mut next = Some(start);
            while let Some(request) = next.take() {
                if limit_reached {
                    break 'categories;
                }
                if request.page_number > MAX_PAGES {
                    info!(
                        retailer = %retailer,
                        category = %request.category,
                        "page cap reached"
                    );
                    break;
                }
                if !visited.insert((request.category.clone(), request.page_number)) {
                    warn!(
                        retailer = %retailer,
                        category = %request.category,
                        page = request.page_number,
                        "page already visited this run; stopping category"
                    );
                    break;
                }

                let page = match self.fetch_page(&request).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(
                            retailer = %retailer,
                            url = %request.url,
                            error = %e,
                            "listing fetch failed; abandoning category"
                        );
                        break;
                    }
                };
                pages_fetched += 1;

                let parsed = self.spider.parse_listing(&page);
                if parsed.is_empty() {
                    info!(
                        retailer = %retailer,
                        category = %request.category,
                        page = request.page_number,
                        "empty listing page; end of catalog"
                    );
                    break;
                }

                for item in parsed.items {
                    if at_limit(options.limit, collected.len()) {
                        limit_reached = true;
                        break;
                    }
                    if let Some(kept) = self.pipeline.process(item).await {
                        collected.push(kept);
                    }
                }

                for detail in parsed.detail_requests {
                    if at_limit(options.limit, collected.len()) {
                        limit_reached = true;
                        break;
                    }
                    let detail_request = PageRequest {
                        url: detail.url.clone(),
                        category: request.category.clone(),
                        page_number: request.page_number,
                        render_override: None,
                    };
                    match self.fetch_page(&detail_request).await {
                        Ok(detail_page) => {
                            if let Some(full) =
                                self.spider.parse_detail(&detail_page, detail.partial)
                            {
                                if let Some(kept) = self.pipeline.process(full).await {
                                    collected.push(kept);
                                }
                            }
                        }
                        Err(e) => {
                            warn!(
                                retailer = %retailer,
                                url = %detail.url,
                                error = %e,
                                "detail fetch failed; skipping item"
                            );
                        }
                    }
                }

                next = parsed.next_page;
            }
        }

        let report = self.pipeline.close().await;
        let finished_at = Utc::now();
        info!(
            retailer = %retailer,
            items = collected.len(),
            pages = pages_fetched,
            saved = report.saved,
            failed = report.failed,
            dropped = report.dropped,
            "crawl finished"
        );

        Ok(CrawlReport {
            retailer,
            category: options.category,
            items: collected,
            pages_fetched,
            saved: report.saved,
            failed: report.failed,
            dropped: report.dropped,
            started_at,
            finished_at,
        })
    }

    /// Fetch one page under politeness, choosing the fetcher from the
    /// retailer's rendering policy (or the request's override).
    async fn fetch_page(
        &mut self,
        request: &PageRequest,
    ) -> Result<crate::spider::FetchedPage, FetchError> {
        let render = request
            .render_override
            .unwrap_or(self.config.requires_rendering);
        let fetcher = if render {
            self.render
                .as_ref()
                .ok_or_else(|| {
                    FetchError::Render("retailer requires rendering but no renderer is configured"
                        .to_string())
                })?
                .clone()
        } else {
            self.http.clone()
        };

        self.limiter.until_ready().await;
        tokio::time::sleep(self.throttle.next_delay()).await;

        let started = Instant::now();
        let page = fetcher.fetch(request).await?;
        self.throttle.record(started.elapsed());
        Ok(page)
    }
}

fn at_limit(limit: Option<usize>, collected: usize) -> bool {
    limit.is_some_and(|cap| collected >= cap)
}
