//! Retailer crawling framework.
//!
//! Pluggable per-retailer spiders behind a closed registry, fetched
//! under politeness (single in-flight request, adaptive delay, bounded
//! retries), with pagination-loop and page-cap guards, feeding a
//! Cleaning → Validation → Ingestion pipeline that triggers
//! compatibility extraction for every persisted product.
//!
//! # Modules
//!
//! - [`retailer`] - registry: configs, slugs, spider dispatch
//! - [`spider`] - the spider contract, shared helpers, concrete spiders
//! - [`fetch`] / [`render`] - plain HTTP and headless-render fetchers
//! - [`throttle`] / [`robots`] - politeness
//! - [`engine`] - the per-run crawl driver
//! - [`pipeline`] - item stages and persistence hooks
//! - [`repo`] - narrow product persistence interface
//! - [`testing`] - mocks for engine and pipeline tests

pub mod engine;
pub mod error;
pub mod fetch;
pub mod item;
pub mod pipeline;
pub mod render;
pub mod repo;
#[cfg(feature = "postgres")]
pub mod repo_postgres;
pub mod retailer;
pub mod robots;
pub mod spider;
pub mod testing;
pub mod throttle;

pub use engine::{CrawlEngine, CrawlOptions, CrawlReport, RunDump, MAX_PAGES};
pub use error::{FetchError, ScrapeError};
pub use fetch::{HttpFetcher, PageFetcher, USER_AGENT};
pub use item::ScrapedItem;
pub use pipeline::{clean, validate, DropReason, ItemPipeline, PipelineReport};
pub use render::{RenderAction, RenderFetcher};
pub use repo::{MemoryProductRepository, ProductRepository};
#[cfg(feature = "postgres")]
pub use repo_postgres::PostgresProductRepository;
pub use retailer::{Politeness, RetailerConfig, RetailerFilter, RetailerId};
pub use robots::{fetch_robots, RobotsRules};
pub use spider::{
    DetailRequest, FetchedPage, PageRequest, ParseResult, Spider,
};
pub use throttle::AdaptiveThrottle;
