//! Compatibility storage and resolution.
//!
//! Persists the normalizer's confidence-scored extraction results, one
//! record per product, and answers the two questions the catalog cares
//! about: which motherboards work with this CPU, and which RAM works
//! with this motherboard.
//!
//! # Modules
//!
//! - [`record`] - the persisted [`CompatibilityRecord`]
//! - [`store`] - the narrow storage trait + in-memory backend
//! - [`postgres`] - sqlx backend (feature `postgres`)
//! - [`service`] - strict/lenient resolution queries
//! - [`admin`] - the manual override path

pub mod admin;
pub mod error;
pub mod record;
pub mod service;
pub mod store;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use admin::{allowed_fields, AdminOverride};
pub use error::{CompatError, Result};
pub use record::CompatibilityRecord;
pub use service::{
    CompatService, CpuSummary, MotherboardMatches, MotherboardSummary, QueryMode, RamMatches,
    CONFIDENCE_FLOOR,
};
pub use store::{CompatStore, MemoryCompatStore};

#[cfg(feature = "postgres")]
pub use postgres::PostgresCompatStore;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use uuid::Uuid;

    use normalizer::{ComponentType, ExtractionSource};

    use crate::record::CompatibilityRecord;

    /// Minimal record with just the fields resolution looks at.
    pub fn record(
        component_type: ComponentType,
        socket: Option<&str>,
        memory_type: Option<&str>,
        confidence: f64,
    ) -> CompatibilityRecord {
        CompatibilityRecord {
            product_id: Uuid::new_v4(),
            component_type,
            brand: None,
            socket: socket.map(str::to_string),
            chipset: None,
            generation: None,
            tdp_watts: None,
            canonical_name: None,
            form_factor: None,
            memory_type: memory_type.map(str::to_string),
            memory_slots: None,
            memory_max_speed_mhz: None,
            memory_capacity_gb: None,
            memory_modules: None,
            ecc: None,
            confidence,
            extraction_source: ExtractionSource::Specs,
            extraction_warnings: Vec::new(),
            extracted_at: Utc::now(),
        }
    }
}
