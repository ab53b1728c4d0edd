//! Typed errors for the crawling framework.
//!
//! The taxonomy mirrors how failures are handled: dropped items and
//! failed single fetches keep the run going; only retailer-level
//! configuration problems abort a run, and even those never abort the
//! surrounding multi-retailer job.

use thiserror::Error;

/// Errors fetching a single page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status after retries were exhausted or skipped
    #[error("status {status} fetching {url}")]
    Status { status: u16, url: String },

    /// Rendering service refused or failed the replay
    #[error("render service error: {0}")]
    Render(String),

    /// Request timed out
    #[error("timeout fetching {url}")]
    Timeout { url: String },
}

impl FetchError {
    /// Whether a retry might help. Only server errors, timeouts and
    /// rate-limit responses qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            FetchError::Timeout { .. } => true,
            FetchError::Http(_) | FetchError::Render(_) => false,
        }
    }
}

/// Errors aborting a retailer's crawl run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No spider registered under this slug
    #[error("unknown retailer slug: {0}")]
    UnknownRetailer(String),

    /// Retailer exists but is switched off in its config
    #[error("retailer {0} is disabled")]
    RetailerDisabled(String),

    /// robots.txt disallows the whole site
    #[error("robots.txt disallows crawling {0}")]
    RobotsDisallowed(String),

    /// Fetch failed where the run cannot continue (e.g. first listing)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Product or price persistence failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        for status in [500, 502, 503, 408, 429] {
            assert!(FetchError::Status {
                status,
                url: "https://example.com".into()
            }
            .is_transient());
        }
        for status in [400, 403, 404] {
            assert!(!FetchError::Status {
                status,
                url: "https://example.com".into()
            }
            .is_transient());
        }
    }
}
