//! PostgreSQL product repository.
//!
//! Products match by slug, then URL; prices are one row per
//! (product, retailer).

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::error::ScrapeError;
use crate::item::ScrapedItem;
use crate::repo::ProductRepository;

pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    pub async fn new(database_url: &str) -> Result<Self, ScrapeError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(storage_err)?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self, ScrapeError> {
        let repo = Self { pool };
        repo.run_migrations().await?;
        Ok(repo)
    }

    async fn run_migrations(&self) -> Result<(), ScrapeError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                product_url TEXT NOT NULL,
                category TEXT NOT NULL,
                brand TEXT,
                image_url TEXT,
                specs JSONB NOT NULL DEFAULT '{}',
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_products_url ON products(product_url)",
        )
        .execute(&self.pool)
        .await
        .ok();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS product_prices (
                product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                retailer_slug TEXT NOT NULL,
                price NUMERIC(12, 2) NOT NULL,
                in_stock BOOLEAN NOT NULL DEFAULT TRUE,
                scraped_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (product_id, retailer_slug)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn upsert_product(&self, item: &ScrapedItem) -> Result<Uuid, ScrapeError> {
        let slug = item.slug();

        // Slug first, URL second — renamed listings keep their identity.
        let existing = sqlx::query(
            "SELECT id FROM products WHERE slug = $1 OR product_url = $2 LIMIT 1",
        )
        .bind(&slug)
        .bind(&item.product_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let id = existing
            .map(|row| row.try_get("id").map_err(storage_err))
            .transpose()?
            .unwrap_or_else(Uuid::new_v4);

        let specs = serde_json::to_value(&item.specs).map_err(storage_err)?;
        sqlx::query(
            r#"
            INSERT INTO products (id, slug, name, product_url, category, brand, image_url, specs, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (id) DO UPDATE SET
                slug = EXCLUDED.slug,
                name = EXCLUDED.name,
                product_url = EXCLUDED.product_url,
                category = EXCLUDED.category,
                brand = EXCLUDED.brand,
                image_url = EXCLUDED.image_url,
                specs = EXCLUDED.specs,
                updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(&slug)
        .bind(&item.name)
        .bind(&item.product_url)
        .bind(&item.category)
        .bind(&item.brand)
        .bind(&item.image_url)
        .bind(specs)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(id)
    }

    async fn upsert_price(&self, product_id: Uuid, item: &ScrapedItem) -> Result<(), ScrapeError> {
        sqlx::query(
            r#"
            INSERT INTO product_prices (product_id, retailer_slug, price, in_stock, scraped_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (product_id, retailer_slug) DO UPDATE SET
                price = EXCLUDED.price,
                in_stock = EXCLUDED.in_stock,
                scraped_at = NOW()
            "#,
        )
        .bind(product_id)
        .bind(&item.retailer_slug)
        .bind(item.price)
        .bind(item.in_stock.unwrap_or(true))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> ScrapeError {
    ScrapeError::Storage(Box::new(e))
}
