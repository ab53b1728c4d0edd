//! Confidence-scored hardware-attribute extraction.
//!
//! Turns a retailer listing's free-text title and inconsistent spec table
//! into typed, confidence-ranked compatibility attributes. One normalizer
//! per component family, all sharing the same extraction cascade:
//!
//! 1. specs table under curated synonym keys — confidence 0.95
//! 2. free-text title — 0.90
//! 3. inference from a related attribute — 0.75–0.80
//! 4. give up: attribute omitted, warning appended
//!
//! Extraction is pure and deterministic; identical input always yields an
//! identical [`ExtractionResult`].
//!
//! # Modules
//!
//! - [`types`] - result/input types and the [`Normalizer`] contract
//! - [`cascade`] - spec-key normalization, value flattening, lookup
//! - [`sockets`] - socket pattern table shared by CPU and motherboard
//! - [`ddr`] - DDR generation detection and speed parsing
//! - [`cpu`], [`motherboard`], [`ram`] - the concrete normalizers

pub mod cascade;
pub mod cpu;
pub mod ddr;
pub mod motherboard;
pub mod ram;
pub mod sockets;
pub mod types;

pub use cpu::CpuNormalizer;
pub use motherboard::MotherboardNormalizer;
pub use ram::RamNormalizer;
pub use types::{
    AttrValue, ComponentType, ExtractionInput, ExtractionResult, ExtractionSource, Normalizer,
    CONFIDENCE_ADMIN, CONFIDENCE_INFERRED, CONFIDENCE_INFERRED_DUAL, CONFIDENCE_SPECS,
    CONFIDENCE_TITLE,
};

/// The normalizer for a component type.
pub fn normalizer_for(component_type: ComponentType) -> &'static dyn Normalizer {
    match component_type {
        ComponentType::Cpu => &CpuNormalizer,
        ComponentType::Motherboard => &MotherboardNormalizer,
        ComponentType::Ram => &RamNormalizer,
    }
}
