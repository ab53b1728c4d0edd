//! Admin manual override of a stored compatibility record.
//!
//! The only writer besides extraction itself. Accepts a restricted field
//! set per component type, always stamps `confidence = 0.95` and
//! `extraction_source = admin_manual`.

use std::collections::BTreeMap;

use tracing::info;

use normalizer::{AttrValue, ComponentType, ExtractionSource, CONFIDENCE_ADMIN};

use crate::error::{CompatError, Result};
use crate::record::CompatibilityRecord;

/// Fields an admin may override, per component type.
pub fn allowed_fields(component_type: ComponentType) -> &'static [&'static str] {
    match component_type {
        ComponentType::Cpu => &[
            "socket",
            "brand",
            "generation",
            "tdp_watts",
            "canonical_name",
        ],
        ComponentType::Motherboard => &[
            "socket",
            "chipset",
            "brand",
            "form_factor",
            "memory_type",
            "memory_slots",
            "memory_max_speed_mhz",
            "memory_capacity_gb",
            "canonical_name",
        ],
        ComponentType::Ram => &[
            "memory_type",
            "memory_max_speed_mhz",
            "memory_capacity_gb",
            "memory_modules",
            "ecc",
        ],
    }
}

/// A manual correction to apply on top of an extracted record.
#[derive(Debug, Clone, Default)]
pub struct AdminOverride {
    pub fields: BTreeMap<String, AttrValue>,
}

impl AdminOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Apply the override in place.
    ///
    /// Rejects fields outside the component type's allowed set and values
    /// of the wrong shape; on success the record carries admin provenance
    /// and its extraction warnings are replaced with an override note.
    pub fn apply(&self, record: &mut CompatibilityRecord) -> Result<()> {
        let allowed = allowed_fields(record.component_type);
        for field in self.fields.keys() {
            if !allowed.contains(&field.as_str()) {
                return Err(CompatError::FieldNotAllowed {
                    field: field.clone(),
                    component_type: record.component_type,
                });
            }
        }

        for (field, value) in &self.fields {
            apply_field(record, field, value)?;
        }

        record.confidence = CONFIDENCE_ADMIN;
        record.extraction_source = ExtractionSource::AdminManual;
        record.extraction_warnings = vec!["manually overridden".to_string()];

        info!(
            product_id = %record.product_id,
            fields = self.fields.len(),
            "applied admin override"
        );
        Ok(())
    }
}

fn apply_field(record: &mut CompatibilityRecord, field: &str, value: &AttrValue) -> Result<()> {
    let text = || {
        value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| CompatError::InvalidFieldValue {
                field: field.to_string(),
            })
    };
    let int = || {
        value.as_int().ok_or_else(|| CompatError::InvalidFieldValue {
            field: field.to_string(),
        })
    };

    match field {
        "socket" => record.socket = Some(text()?),
        "chipset" => record.chipset = Some(text()?),
        "brand" => record.brand = Some(text()?),
        "generation" => record.generation = Some(text()?),
        "canonical_name" => record.canonical_name = Some(text()?),
        "form_factor" => record.form_factor = Some(text()?),
        "memory_type" => record.memory_type = Some(text()?),
        "tdp_watts" => record.tdp_watts = Some(int()?),
        "memory_slots" => record.memory_slots = Some(int()?),
        "memory_max_speed_mhz" => record.memory_max_speed_mhz = Some(int()?),
        "memory_capacity_gb" => record.memory_capacity_gb = Some(int()?),
        "memory_modules" => record.memory_modules = Some(int()?),
        "ecc" => {
            record.ecc = Some(value.as_flag().ok_or_else(|| CompatError::InvalidFieldValue {
                field: field.to_string(),
            })?)
        }
        _ => {
            return Err(CompatError::FieldNotAllowed {
                field: field.to_string(),
                component_type: record.component_type,
            })
        }
    }
    Ok(())
}
