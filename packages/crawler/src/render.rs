//! Headless-browser rendering via a remote rendering service.
//!
//! Each request is a fresh, stateless browser session: the service
//! navigates to the URL, executes the supplied action chain and returns
//! the settled DOM. Reaching listing page N therefore replays N−1
//! (click next, wait for network idle) pairs from page 1 — O(N) work per
//! page, bounded by the engine's page cap. Sessions are never reused, so
//! no DOM state leaks between requests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::fetch::{with_retries, PageFetcher};
use crate::spider::{FetchedPage, PageRequest};

const DEFAULT_IDLE_TIMEOUT_MS: u64 = 10_000;

/// One step in a render replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderAction {
    Click { selector: String },
    WaitNetworkIdle { timeout_ms: u64 },
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
    actions: Vec<RenderAction>,
    wait_until: &'static str,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    success: bool,
    html: Option<String>,
    error: Option<String>,
}

/// Client for the rendering service. Implements [`PageFetcher`] so the
/// engine treats rendered and plain retailers identically.
pub struct RenderFetcher {
    client: reqwest::Client,
    service_url: String,
    api_key: Option<String>,
    next_selector: String,
}

impl RenderFetcher {
    pub fn new(
        service_url: impl Into<String>,
        next_selector: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;
        Ok(Self {
            client,
            service_url: service_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            next_selector: next_selector.into(),
        })
    }

    /// Read `RENDER_SERVICE_URL` / `RENDER_SERVICE_KEY` from the
    /// environment.
    pub fn from_env(next_selector: impl Into<String>) -> Result<Self, FetchError> {
        let service_url = std::env::var("RENDER_SERVICE_URL")
            .map_err(|_| FetchError::Render("RENDER_SERVICE_URL not set".to_string()))?;
        let mut fetcher = Self::new(service_url, next_selector)?;
        fetcher.api_key = std::env::var("RENDER_SERVICE_KEY").ok();
        Ok(fetcher)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// The click chain that reaches `page_number` from a fresh session.
    pub fn replay_actions(&self, page_number: u32) -> Vec<RenderAction> {
        let mut actions = Vec::new();
        for _ in 1..page_number {
            actions.push(RenderAction::Click {
                selector: self.next_selector.clone(),
            });
            actions.push(RenderAction::WaitNetworkIdle {
                timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            });
        }
        actions
    }

    async fn render_once(&self, request: &PageRequest) -> Result<String, FetchError> {
        let body = RenderRequest {
            url: &request.url,
            actions: self.replay_actions(request.page_number),
            wait_until: "networkidle",
        };

        let mut http = self
            .client
            .post(format!("{}/render", self.service_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            http = http.header("Authorization", format!("Bearer {}", key));
        }

        let response = http.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: request.url.clone(),
                }
            } else {
                FetchError::Http(Box::new(e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let rendered: RenderResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        if !rendered.success {
            return Err(FetchError::Render(
                rendered
                    .error
                    .unwrap_or_else(|| "render service reported failure".to_string()),
            ));
        }
        rendered
            .html
            .ok_or_else(|| FetchError::Render("render service returned no HTML".to_string()))
    }
}

#[async_trait]
impl PageFetcher for RenderFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, FetchError> {
        let html = with_retries(&request.url, || self.render_once(request)).await?;
        Ok(FetchedPage::new(request, html))
    }

    fn name(&self) -> &'static str {
        "render"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_one_needs_no_replay() {
        let fetcher = RenderFetcher::new("http://render.internal", "a.next").unwrap();
        assert!(fetcher.replay_actions(1).is_empty());
    }

    #[test]
    fn page_n_replays_n_minus_one_click_pairs() {
        let fetcher = RenderFetcher::new("http://render.internal", "a.next").unwrap();
        let actions = fetcher.replay_actions(4);

        assert_eq!(actions.len(), 6);
        assert_eq!(
            actions[0],
            RenderAction::Click {
                selector: "a.next".to_string()
            }
        );
        assert!(matches!(actions[1], RenderAction::WaitNetworkIdle { .. }));
    }

    #[test]
    fn actions_serialize_with_type_tags() {
        let action = RenderAction::Click {
            selector: "a.next".to_string(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "click");
        assert_eq!(json["selector"], "a.next");
    }
}
