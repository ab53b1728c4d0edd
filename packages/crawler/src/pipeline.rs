//! Item processing pipeline: Cleaning → Validation → Ingestion.
//!
//! A dropped item is logged and skipped, never fatal. Ingestion failures
//! are counted and the crawl moves on. Compatibility extraction runs as
//! a detached task per item so extraction trouble cannot stall the
//! crawl loop; `close()` drains those tasks before reporting.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use compat::{CompatStore, CompatibilityRecord};
use normalizer::{normalizer_for, ComponentType, ExtractionInput};

use crate::item::ScrapedItem;
use crate::repo::ProductRepository;
use crate::spider::base::{absolutize, collapse_whitespace};

/// Storage write attempts per item (first try included).
const STORAGE_ATTEMPTS: u32 = 3;
const STORAGE_BACKOFF: Duration = Duration::from_millis(200);

/// Why validation refused an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingName,
    NonPositivePrice,
    MissingUrl,
    MissingCategory,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DropReason::MissingName => "missing name",
            DropReason::NonPositivePrice => "non-positive price",
            DropReason::MissingUrl => "missing or relative product URL",
            DropReason::MissingCategory => "missing category",
        };
        f.write_str(text)
    }
}

/// Cleaning stage: normalize text, coerce the price, absolutize the URL,
/// stamp the observation time.
pub fn clean(mut item: ScrapedItem, base_url: &str) -> ScrapedItem {
    item.name = collapse_whitespace(&item.name);
    if item.price < Decimal::ZERO {
        // Negative means a parse went sideways; zero triggers the drop
        // downstream.
        item.price = Decimal::ZERO;
    }
    if !item.product_url.is_empty() && !item.product_url.starts_with("http") {
        if let Some(absolute) = absolutize(base_url, &item.product_url) {
            item.product_url = absolute;
        }
    }
    item.scraped_at = Some(Utc::now());
    item
}

/// Validation stage: enforce the invariants persistence relies on.
pub fn validate(mut item: ScrapedItem) -> Result<ScrapedItem, DropReason> {
    if item.name.is_empty() {
        return Err(DropReason::MissingName);
    }
    if item.price <= Decimal::ZERO {
        return Err(DropReason::NonPositivePrice);
    }
    if item.product_url.is_empty() || !item.product_url.starts_with("http") {
        return Err(DropReason::MissingUrl);
    }
    if item.category.is_empty() {
        return Err(DropReason::MissingCategory);
    }
    if item.in_stock.is_none() {
        item.in_stock = Some(true);
    }
    Ok(item)
}

/// Aggregate counts reported at spider close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub processed: usize,
    pub saved: usize,
    pub failed: usize,
    pub dropped: usize,
}

/// The three-stage pipeline, with optional persistence.
pub struct ItemPipeline {
    base_url: String,
    sinks: Option<Sinks>,
    report: PipelineReport,
    extraction_tasks: Vec<JoinHandle<()>>,
}

struct Sinks {
    repo: Arc<dyn ProductRepository>,
    compat: Arc<dyn CompatStore>,
}

impl ItemPipeline {
    /// Pipeline that cleans and validates but persists nothing — used
    /// for `--output`-only runs.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            sinks: None,
            report: PipelineReport::default(),
            extraction_tasks: Vec::new(),
        }
    }

    /// Pipeline that also upserts products/prices and triggers
    /// compatibility extraction.
    pub fn with_persistence(
        base_url: impl Into<String>,
        repo: Arc<dyn ProductRepository>,
        compat: Arc<dyn CompatStore>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            sinks: Some(Sinks { repo, compat }),
            report: PipelineReport::default(),
            extraction_tasks: Vec::new(),
        }
    }

    /// Run one item through the stages. Returns the cleaned item for
    /// collection, or `None` if it was dropped.
    pub async fn process(&mut self, item: ScrapedItem) -> Option<ScrapedItem> {
        let cleaned = clean(item, &self.base_url);
        let item = match validate(cleaned) {
            Ok(item) => item,
            Err(reason) => {
                debug!(reason = %reason, "dropping scraped item");
                self.report.dropped += 1;
                return None;
            }
        };
        self.report.processed += 1;

        if let Some(sinks) = &self.sinks {
            match persist(sinks.repo.as_ref(), &item).await {
                Ok(product_id) => {
                    self.report.saved += 1;
                    if let Some(task) = spawn_extraction(sinks.compat.clone(), product_id, &item)
                    {
                        self.extraction_tasks.push(task);
                    }
                }
                Err(e) => {
                    warn!(name = %item.name, error = %e, "failed to persist item");
                    self.report.failed += 1;
                }
            }
        }

        Some(item)
    }

    /// Drain extraction tasks and return the aggregate counts.
    pub async fn close(self) -> PipelineReport {
        for task in self.extraction_tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "extraction task panicked");
            }
        }
        info!(
            processed = self.report.processed,
            saved = self.report.saved,
            failed = self.report.failed,
            dropped = self.report.dropped,
            "pipeline closed"
        );
        self.report
    }

    pub fn report(&self) -> PipelineReport {
        self.report
    }
}

/// Upsert product and price with bounded retry on storage trouble.
async fn persist(
    repo: &dyn ProductRepository,
    item: &ScrapedItem,
) -> Result<uuid::Uuid, crate::error::ScrapeError> {
    let mut attempt = 0;
    loop {
        let outcome = async {
            let product_id = repo.upsert_product(item).await?;
            repo.upsert_price(product_id, item).await?;
            Ok(product_id)
        }
        .await;

        match outcome {
            Ok(id) => return Ok(id),
            Err(e) if attempt + 1 < STORAGE_ATTEMPTS => {
                warn!(attempt = attempt + 1, error = %e, "storage write failed, retrying");
                tokio::time::sleep(STORAGE_BACKOFF * 2u32.pow(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Kick off extraction + compatibility upsert for a persisted product.
/// Items in categories the normalizers do not cover are skipped.
fn spawn_extraction(
    store: Arc<dyn CompatStore>,
    product_id: uuid::Uuid,
    item: &ScrapedItem,
) -> Option<JoinHandle<()>> {
    let component_type = ComponentType::from_category(&item.category)?;
    let input = ExtractionInput {
        title: item.name.clone(),
        specs: item.specs.clone(),
        brand_hint: item.brand.clone(),
    };

    Some(tokio::spawn(async move {
        let result = normalizer_for(component_type).extract(&input);
        let record = CompatibilityRecord::from_extraction(product_id, &result);
        let mut attempt = 0;
        loop {
            match store.upsert(&record).await {
                Ok(()) => {
                    debug!(
                        product_id = %product_id,
                        component_type = %component_type,
                        confidence = record.confidence,
                        "stored compatibility record"
                    );
                    return;
                }
                Err(e) if attempt + 1 < STORAGE_ATTEMPTS => {
                    tokio::time::sleep(STORAGE_BACKOFF * 2u32.pow(attempt)).await;
                    attempt += 1;
                    warn!(product_id = %product_id, error = %e, "compat upsert failed, retrying");
                }
                Err(e) => {
                    warn!(product_id = %product_id, error = %e, "giving up on compat upsert");
                    return;
                }
            }
        }
    }))
}
