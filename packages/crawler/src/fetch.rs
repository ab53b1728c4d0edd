//! Page fetching: the trait seam the engine drives, plus the plain HTTP
//! implementation with bounded retry.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::FetchError;
use crate::spider::{FetchedPage, PageRequest};

/// Max attempts per page, counting the first.
pub const MAX_ATTEMPTS: u32 = 3;

const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_CEILING: Duration = Duration::from_secs(10);

pub const USER_AGENT: &str = "partscout/0.1 (+https://partscout.example/bot)";

/// Fetches one page per call. One in-flight request per host is the
/// engine's invariant — implementations stay request-at-a-time.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, FetchError>;

    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// Retry transient failures with exponential backoff, capped.
///
/// Non-transient failures return immediately — a 404 will not get
/// better by asking again.
pub(crate) async fn with_retries<T, Fut>(
    url: &str,
    mut op: impl FnMut() -> Fut,
) -> Result<T, FetchError>
where
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                let backoff = BACKOFF_CEILING.min(BACKOFF_BASE * 2u32.pow(attempt));
                warn!(
                    url = %url,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "transient fetch failure, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Plain HTTP fetcher for retailers whose listings render server-side.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http(Box::new(e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, FetchError> {
        let html = with_retries(&request.url, || self.fetch_once(&request.url)).await?;
        Ok(FetchedPage::new(request, html))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, FetchError> = with_retries("https://example.com", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FetchError::Status {
                        status: 503,
                        url: "https://example.com".into(),
                    })
                } else {
                    Ok("page")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "page");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FetchError> = with_retries("https://example.com", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(FetchError::Status {
                    status: 500,
                    url: "https://example.com".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn non_transient_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FetchError> = with_retries("https://example.com", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(FetchError::Status {
                    status: 404,
                    url: "https://example.com".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
