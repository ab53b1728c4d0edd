//! Retailer registry.
//!
//! A closed enum rather than a string-keyed map: adding a retailer means
//! the compiler walks you through every `match` that needs a decision
//! (config, spider construction, slug).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::spider::{skyland::SkylandSpider, startech::StartechSpider, techland::TechlandSpider, Spider};

/// Every retailer the framework knows how to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetailerId {
    Startech,
    Techland,
    Skyland,
}

impl RetailerId {
    pub const ALL: &'static [RetailerId] =
        &[RetailerId::Startech, RetailerId::Techland, RetailerId::Skyland];

    pub fn slug(&self) -> &'static str {
        match self {
            RetailerId::Startech => "startech",
            RetailerId::Techland => "techland",
            RetailerId::Skyland => "skyland",
        }
    }

    pub fn from_slug(slug: &str) -> Result<Self, ScrapeError> {
        match slug {
            "startech" => Ok(RetailerId::Startech),
            "techland" => Ok(RetailerId::Techland),
            "skyland" => Ok(RetailerId::Skyland),
            other => Err(ScrapeError::UnknownRetailer(other.to_string())),
        }
    }

    /// Immutable per-retailer configuration, resolved at startup.
    pub fn config(&self) -> RetailerConfig {
        match self {
            RetailerId::Startech => RetailerConfig {
                id: *self,
                display_name: "Star Tech",
                base_url: "https://www.startech.com.bd",
                requires_rendering: false,
                next_page_selector: None,
                politeness: Politeness::default(),
                enabled: true,
            },
            RetailerId::Techland => RetailerConfig {
                id: *self,
                display_name: "Tech Land",
                base_url: "https://www.techlandbd.com",
                requires_rendering: false,
                next_page_selector: None,
                politeness: Politeness::default(),
                enabled: true,
            },
            RetailerId::Skyland => RetailerConfig {
                id: *self,
                display_name: "Skyland",
                base_url: "https://www.skyland.com.bd",
                requires_rendering: true,
                // robots.txt forbids page-number query params, so
                // pagination replays a click chain on this selector.
                next_page_selector: Some("a.pagination-next"),
                politeness: Politeness {
                    // Rendered fetches are heavy on both sides; slower.
                    start_delay: Duration::from_millis(2000),
                    ..Politeness::default()
                },
                enabled: true,
            },
        }
    }

    /// Construct the spider implementation for this retailer.
    pub fn spider(&self) -> Box<dyn Spider> {
        match self {
            RetailerId::Startech => Box::new(StartechSpider::new()),
            RetailerId::Techland => Box::new(TechlandSpider::new()),
            RetailerId::Skyland => Box::new(SkylandSpider::new()),
        }
    }
}

impl std::fmt::Display for RetailerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Crawl politeness parameters for one host.
#[derive(Debug, Clone, Copy)]
pub struct Politeness {
    /// Delay before the first request and the adaptive-throttle floor.
    pub start_delay: Duration,
    /// Adaptive-throttle ceiling.
    pub max_delay: Duration,
    /// Requests-per-second quota; single in-flight request regardless.
    pub requests_per_second: u32,
    /// In-flight requests per host. The engine is sequential, so this is
    /// a documented invariant more than a tunable.
    pub max_concurrency: u32,
}

impl Default for Politeness {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(15),
            requests_per_second: 1,
            max_concurrency: 1,
        }
    }
}

/// Per-retailer configuration, immutable after startup.
#[derive(Debug, Clone)]
pub struct RetailerConfig {
    pub id: RetailerId,
    pub display_name: &'static str,
    pub base_url: &'static str,
    /// Listing pages need a headless-browser render to populate.
    pub requires_rendering: bool,
    /// "Next page" element to click during render replay.
    pub next_page_selector: Option<&'static str>,
    pub politeness: Politeness,
    pub enabled: bool,
}

/// Selector used by the CLI to pick which retailers a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetailerFilter {
    One(RetailerId),
    All,
    /// Only retailers that need headless rendering.
    RenderedOnly,
    /// Everything that can be fetched with a plain HTTP client.
    ExceptRendered,
}

impl RetailerFilter {
    pub fn parse(value: &str) -> Result<Self, ScrapeError> {
        match value {
            "all" => Ok(RetailerFilter::All),
            "rendered-only" => Ok(RetailerFilter::RenderedOnly),
            "except-rendered" => Ok(RetailerFilter::ExceptRendered),
            slug => RetailerId::from_slug(slug).map(RetailerFilter::One),
        }
    }

    /// Resolve the filter against the registry, skipping disabled
    /// retailers.
    pub fn resolve(&self) -> Vec<RetailerId> {
        RetailerId::ALL
            .iter()
            .copied()
            .filter(|id| {
                let config = id.config();
                if !config.enabled {
                    return false;
                }
                match self {
                    RetailerFilter::One(wanted) => id == wanted,
                    RetailerFilter::All => true,
                    RetailerFilter::RenderedOnly => config.requires_rendering,
                    RetailerFilter::ExceptRendered => !config.requires_rendering,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_round_trips_for_every_retailer() {
        for id in RetailerId::ALL {
            assert_eq!(RetailerId::from_slug(id.slug()).unwrap(), *id);
        }
    }

    #[test]
    fn unknown_slug_is_a_run_level_error() {
        assert!(matches!(
            RetailerId::from_slug("gadgetgrove"),
            Err(ScrapeError::UnknownRetailer(_))
        ));
    }

    #[test]
    fn filters_partition_by_rendering() {
        let rendered = RetailerFilter::RenderedOnly.resolve();
        let plain = RetailerFilter::ExceptRendered.resolve();

        assert!(rendered.iter().all(|id| id.config().requires_rendering));
        assert!(plain.iter().all(|id| !id.config().requires_rendering));
        assert_eq!(
            rendered.len() + plain.len(),
            RetailerFilter::All.resolve().len()
        );
    }

    #[test]
    fn rendered_retailers_declare_a_click_target() {
        for id in RetailerId::ALL {
            let config = id.config();
            if config.requires_rendering {
                assert!(config.next_page_selector.is_some());
            }
        }
    }
}
