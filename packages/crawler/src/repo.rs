//! Narrow product persistence interface.
//!
//! The relational catalog itself is an external collaborator; the crawl
//! only ever needs upsert-by-key semantics. Products match by slug
//! first, then by URL, so retailers renaming a listing do not duplicate
//! it.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::ScrapeError;
use crate::item::ScrapedItem;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert or update the product, returning its id.
    async fn upsert_product(&self, item: &ScrapedItem) -> Result<Uuid, ScrapeError>;

    /// Insert or update the per-retailer price row.
    async fn upsert_price(&self, product_id: Uuid, item: &ScrapedItem) -> Result<(), ScrapeError>;
}

/// In-memory repository for tests and `--output`-only runs.
pub struct MemoryProductRepository {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    by_slug: HashMap<String, Uuid>,
    by_url: HashMap<String, Uuid>,
    products: HashMap<Uuid, ScrapedItem>,
    prices: HashMap<(Uuid, String), Decimal>,
}

impl Default for MemoryProductRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProductRepository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn product_count(&self) -> usize {
        self.inner.read().unwrap().products.len()
    }

    pub fn price_count(&self) -> usize {
        self.inner.read().unwrap().prices.len()
    }

    pub fn get(&self, product_id: Uuid) -> Option<ScrapedItem> {
        self.inner.read().unwrap().products.get(&product_id).cloned()
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<Uuid> {
        self.inner.read().unwrap().by_slug.get(slug).copied()
    }
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn upsert_product(&self, item: &ScrapedItem) -> Result<Uuid, ScrapeError> {
        let slug = item.slug();
        let mut inner = self.inner.write().unwrap();

        let id = inner
            .by_slug
            .get(&slug)
            .or_else(|| inner.by_url.get(&item.product_url))
            .copied()
            .unwrap_or_else(Uuid::new_v4);

        inner.by_slug.insert(slug, id);
        inner.by_url.insert(item.product_url.clone(), id);
        inner.products.insert(id, item.clone());
        Ok(id)
    }

    async fn upsert_price(&self, product_id: Uuid, item: &ScrapedItem) -> Result<(), ScrapeError> {
        self.inner
            .write()
            .unwrap()
            .prices
            .insert((product_id, item.retailer_slug.clone()), item.price);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, url: &str, retailer: &str, price: i64) -> ScrapedItem {
        ScrapedItem::new(name, retailer, "processor")
            .with_price(Decimal::from(price))
            .with_url(url)
    }

    #[tokio::test]
    async fn same_slug_upserts_into_one_product() {
        let repo = MemoryProductRepository::new();
        let a = item("AMD Ryzen 5 5600", "https://a.example/r5-5600", "startech", 17500);
        let b = item("AMD Ryzen 5 5600", "https://b.example/ryzen-5-5600", "techland", 17200);

        let id_a = repo.upsert_product(&a).await.unwrap();
        let id_b = repo.upsert_product(&b).await.unwrap();
        assert_eq!(id_a, id_b);
        assert_eq!(repo.product_count(), 1);

        repo.upsert_price(id_a, &a).await.unwrap();
        repo.upsert_price(id_b, &b).await.unwrap();
        assert_eq!(repo.price_count(), 2);
    }

    #[tokio::test]
    async fn url_match_covers_renamed_listings() {
        let repo = MemoryProductRepository::new();
        let first = item("Ryzen 7 5800X", "https://a.example/5800x", "startech", 31000);
        let renamed = item(
            "AMD Ryzen 7 5800X (8C/16T)",
            "https://a.example/5800x",
            "startech",
            30500,
        );

        let id1 = repo.upsert_product(&first).await.unwrap();
        let id2 = repo.upsert_product(&renamed).await.unwrap();
        assert_eq!(id1, id2);
    }
}
