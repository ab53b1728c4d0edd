//! Persisted form of an extraction result, keyed by product id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use normalizer::{ComponentType, ExtractionResult, ExtractionSource};

/// One row per product: the canonical compatibility attributes for its
/// component type plus the extraction's provenance.
///
/// Created or overwritten (upsert) on every successful extraction; only
/// an admin override mutates it afterwards. Unused columns for a given
/// component type stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityRecord {
    pub product_id: Uuid,
    pub component_type: ComponentType,

    pub brand: Option<String>,
    /// CPU socket for CPUs, board socket for motherboards.
    pub socket: Option<String>,
    pub chipset: Option<String>,
    pub generation: Option<String>,
    pub tdp_watts: Option<u32>,
    pub canonical_name: Option<String>,
    pub form_factor: Option<String>,

    pub memory_type: Option<String>,
    pub memory_slots: Option<u32>,
    pub memory_max_speed_mhz: Option<u32>,
    /// Kit capacity for RAM, max supported capacity for motherboards.
    pub memory_capacity_gb: Option<u32>,
    pub memory_modules: Option<u32>,
    pub ecc: Option<bool>,

    pub confidence: f64,
    pub extraction_source: ExtractionSource,
    pub extraction_warnings: Vec<String>,
    pub extracted_at: DateTime<Utc>,
}

impl CompatibilityRecord {
    /// Build a record from a fresh extraction.
    pub fn from_extraction(product_id: Uuid, result: &ExtractionResult) -> Self {
        let text = |key: &str| result.text(key).map(str::to_string);
        let int = |key: &str| result.int(key);

        Self {
            product_id,
            component_type: result.component_type,
            brand: text("cpu_brand").or_else(|| text("mobo_brand")),
            socket: text("cpu_socket").or_else(|| text("mobo_socket")),
            chipset: text("mobo_chipset"),
            generation: text("cpu_generation"),
            tdp_watts: int("cpu_tdp_watts"),
            canonical_name: text("canonical_cpu_name").or_else(|| text("canonical_mobo_name")),
            form_factor: text("mobo_form_factor"),
            memory_type: text("memory_type"),
            memory_slots: int("memory_slots"),
            memory_max_speed_mhz: int("memory_max_speed_mhz"),
            memory_capacity_gb: int("memory_capacity_gb").or_else(|| int("memory_max_capacity_gb")),
            memory_modules: int("memory_modules"),
            ecc: result.flag("ecc"),
            confidence: result.confidence,
            extraction_source: result.source,
            extraction_warnings: result.warnings.clone(),
            extracted_at: Utc::now(),
        }
    }

    /// The attribute a compatibility query keys on for this component.
    pub fn deciding_field(&self) -> Option<&str> {
        match self.component_type {
            ComponentType::Cpu | ComponentType::Motherboard => self.socket.as_deref(),
            ComponentType::Ram => self.memory_type.as_deref(),
        }
    }
}
