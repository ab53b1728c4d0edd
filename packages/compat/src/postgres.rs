//! PostgreSQL compatibility store.
//!
//! One row per product; upserts go through `ON CONFLICT (product_id) DO
//! UPDATE`, which is what makes same-product races last-write-wins
//! without explicit locking.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use normalizer::{ComponentType, ExtractionSource};

use crate::error::{CompatError, Result};
use crate::record::CompatibilityRecord;
use crate::store::CompatStore;

const COLUMNS: &str = "product_id, component_type, brand, socket, chipset, generation, \
     tdp_watts, canonical_name, form_factor, memory_type, memory_slots, \
     memory_max_speed_mhz, memory_capacity_gb, memory_modules, ecc, \
     confidence, extraction_source, extraction_warnings, extracted_at";

/// sqlx-backed store, suitable for multi-process deployments.
pub struct PostgresCompatStore {
    pool: PgPool,
}

impl PostgresCompatStore {
    /// Connect and ensure the schema exists.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(storage_err)?;
        Self::from_pool(pool).await
    }

    /// Reuse an existing pool (e.g. the catalog API's).
    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS compatibility_records (
                product_id UUID PRIMARY KEY,
                component_type TEXT NOT NULL,
                brand TEXT,
                socket TEXT,
                chipset TEXT,
                generation TEXT,
                tdp_watts INTEGER,
                canonical_name TEXT,
                form_factor TEXT,
                memory_type TEXT,
                memory_slots INTEGER,
                memory_max_speed_mhz INTEGER,
                memory_capacity_gb INTEGER,
                memory_modules INTEGER,
                ecc BOOLEAN,
                confidence DOUBLE PRECISION NOT NULL,
                extraction_source TEXT NOT NULL,
                extraction_warnings JSONB NOT NULL DEFAULT '[]',
                extracted_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_compat_type_socket \
             ON compatibility_records(component_type, socket)",
        )
        .execute(&self.pool)
        .await
        .ok();

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_compat_type_memory \
             ON compatibility_records(component_type, memory_type)",
        )
        .execute(&self.pool)
        .await
        .ok();

        Ok(())
    }

    async fn fetch_where(
        &self,
        condition: &str,
        component_type: ComponentType,
        value: Option<&str>,
    ) -> Result<Vec<CompatibilityRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM compatibility_records \
             WHERE component_type = $1 {condition} ORDER BY product_id"
        );
        let mut query = sqlx::query(&sql).bind(component_type.as_str());
        if let Some(value) = value {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(storage_err)?;
        rows.iter().map(row_to_record).collect()
    }
}

#[async_trait]
impl CompatStore for PostgresCompatStore {
    async fn upsert(&self, record: &CompatibilityRecord) -> Result<()> {
        let warnings =
            serde_json::to_value(&record.extraction_warnings).map_err(|e| storage_err(e))?;
        sqlx::query(
            r#"
            INSERT INTO compatibility_records (
                product_id, component_type, brand, socket, chipset, generation,
                tdp_watts, canonical_name, form_factor, memory_type, memory_slots,
                memory_max_speed_mhz, memory_capacity_gb, memory_modules, ecc,
                confidence, extraction_source, extraction_warnings, extracted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19)
            ON CONFLICT (product_id) DO UPDATE SET
                component_type = EXCLUDED.component_type,
                brand = EXCLUDED.brand,
                socket = EXCLUDED.socket,
                chipset = EXCLUDED.chipset,
                generation = EXCLUDED.generation,
                tdp_watts = EXCLUDED.tdp_watts,
                canonical_name = EXCLUDED.canonical_name,
                form_factor = EXCLUDED.form_factor,
                memory_type = EXCLUDED.memory_type,
                memory_slots = EXCLUDED.memory_slots,
                memory_max_speed_mhz = EXCLUDED.memory_max_speed_mhz,
                memory_capacity_gb = EXCLUDED.memory_capacity_gb,
                memory_modules = EXCLUDED.memory_modules,
                ecc = EXCLUDED.ecc,
                confidence = EXCLUDED.confidence,
                extraction_source = EXCLUDED.extraction_source,
                extraction_warnings = EXCLUDED.extraction_warnings,
                extracted_at = EXCLUDED.extracted_at
            "#,
        )
        .bind(record.product_id)
        .bind(record.component_type.as_str())
        .bind(&record.brand)
        .bind(&record.socket)
        .bind(&record.chipset)
        .bind(&record.generation)
        .bind(record.tdp_watts.map(|v| v as i32))
        .bind(&record.canonical_name)
        .bind(&record.form_factor)
        .bind(&record.memory_type)
        .bind(record.memory_slots.map(|v| v as i32))
        .bind(record.memory_max_speed_mhz.map(|v| v as i32))
        .bind(record.memory_capacity_gb.map(|v| v as i32))
        .bind(record.memory_modules.map(|v| v as i32))
        .bind(record.ecc)
        .bind(record.confidence)
        .bind(record.extraction_source.as_str())
        .bind(warnings)
        .bind(record.extracted_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn get(&self, product_id: Uuid) -> Result<Option<CompatibilityRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM compatibility_records WHERE product_id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_by_socket(
        &self,
        component_type: ComponentType,
        socket: &str,
    ) -> Result<Vec<CompatibilityRecord>> {
        self.fetch_where("AND socket = $2", component_type, Some(socket))
            .await
    }

    async fn find_by_memory_type(
        &self,
        component_type: ComponentType,
        memory_type: &str,
    ) -> Result<Vec<CompatibilityRecord>> {
        self.fetch_where("AND memory_type = $2", component_type, Some(memory_type))
            .await
    }

    async fn list(&self, component_type: ComponentType) -> Result<Vec<CompatibilityRecord>> {
        self.fetch_where("", component_type, None).await
    }
}

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> CompatError {
    CompatError::Storage(Box::new(e))
}

fn row_to_record(row: &PgRow) -> Result<CompatibilityRecord> {
    let component_type: String = row.try_get("component_type").map_err(storage_err)?;
    let component_type = ComponentType::parse(&component_type).ok_or_else(|| {
        CompatError::Storage(format!("unknown component type {component_type:?}").into())
    })?;
    let source: String = row.try_get("extraction_source").map_err(storage_err)?;
    let extraction_source = ExtractionSource::parse(&source).ok_or_else(|| {
        CompatError::Storage(format!("unknown extraction source {source:?}").into())
    })?;
    let warnings: serde_json::Value =
        row.try_get("extraction_warnings").map_err(storage_err)?;
    let extraction_warnings: Vec<String> =
        serde_json::from_value(warnings).map_err(storage_err)?;

    let opt_u32 = |name: &str| -> Result<Option<u32>> {
        let v: Option<i32> = row.try_get(name).map_err(storage_err)?;
        Ok(v.map(|v| v as u32))
    };

    Ok(CompatibilityRecord {
        product_id: row.try_get("product_id").map_err(storage_err)?,
        component_type,
        brand: row.try_get("brand").map_err(storage_err)?,
        socket: row.try_get("socket").map_err(storage_err)?,
        chipset: row.try_get("chipset").map_err(storage_err)?,
        generation: row.try_get("generation").map_err(storage_err)?,
        tdp_watts: opt_u32("tdp_watts")?,
        canonical_name: row.try_get("canonical_name").map_err(storage_err)?,
        form_factor: row.try_get("form_factor").map_err(storage_err)?,
        memory_type: row.try_get("memory_type").map_err(storage_err)?,
        memory_slots: opt_u32("memory_slots")?,
        memory_max_speed_mhz: opt_u32("memory_max_speed_mhz")?,
        memory_capacity_gb: opt_u32("memory_capacity_gb")?,
        memory_modules: opt_u32("memory_modules")?,
        ecc: row.try_get("ecc").map_err(storage_err)?,
        confidence: row.try_get("confidence").map_err(storage_err)?,
        extraction_source,
        extraction_warnings,
        extracted_at: row.try_get("extracted_at").map_err(storage_err)?,
    })
}
