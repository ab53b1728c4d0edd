//! Core types for the normalization framework.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Confidence assigned to an attribute found in the specs table.
pub const CONFIDENCE_SPECS: f64 = 0.95;

/// Confidence assigned to an attribute found in the listing title.
pub const CONFIDENCE_TITLE: f64 = 0.90;

/// Confidence assigned to an attribute inferred from a related attribute.
pub const CONFIDENCE_INFERRED: f64 = 0.80;

/// Confidence assigned when a dual-DDR chipset is resolved by default
/// rather than by listing evidence.
pub const CONFIDENCE_INFERRED_DUAL: f64 = 0.75;

/// Confidence stamped by an admin manual override.
pub const CONFIDENCE_ADMIN: f64 = 0.95;

/// The hardware component families the framework extracts attributes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Cpu,
    Motherboard,
    Ram,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Cpu => "cpu",
            ComponentType::Motherboard => "motherboard",
            ComponentType::Ram => "ram",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cpu" => Some(ComponentType::Cpu),
            "motherboard" => Some(ComponentType::Motherboard),
            "ram" => Some(ComponentType::Ram),
            _ => None,
        }
    }

    /// Map a retailer category path to a component type, when the
    /// category is one the normalizers cover.
    pub fn from_category(category: &str) -> Option<Self> {
        let lower = category.to_lowercase();
        if lower.contains("processor") || lower.contains("cpu") {
            Some(ComponentType::Cpu)
        } else if lower.contains("motherboard") || lower.contains("mainboard") {
            Some(ComponentType::Motherboard)
        } else if lower.contains("ram") || lower.contains("memory") {
            Some(ComponentType::Ram)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an extracted attribute came from.
///
/// The variants are ordered by trustworthiness; the numeric confidence an
/// extraction carries always agrees with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// Found in the retailer's specification table.
    Specs,
    /// Found in the free-text listing title.
    Title,
    /// Inferred from a related attribute (chipset, series, speed).
    Inferred,
    /// Dual-DDR chipset resolved by the default-to-newer policy.
    InferredDual,
    /// Nothing usable was found.
    None,
    /// Set by a manual admin override.
    AdminManual,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionSource::Specs => "specs",
            ExtractionSource::Title => "title",
            ExtractionSource::Inferred => "inferred",
            ExtractionSource::InferredDual => "inferred_dual",
            ExtractionSource::None => "none",
            ExtractionSource::AdminManual => "admin_manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "specs" => Some(ExtractionSource::Specs),
            "title" => Some(ExtractionSource::Title),
            "inferred" => Some(ExtractionSource::Inferred),
            "inferred_dual" => Some(ExtractionSource::InferredDual),
            "none" => Some(ExtractionSource::None),
            "admin_manual" => Some(ExtractionSource::AdminManual),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single canonical attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Int(u32),
    Flag(bool),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u32> {
        match self {
            AttrValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AttrValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<u32> for AttrValue {
    fn from(n: u32) -> Self {
        AttrValue::Int(n)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Flag(b)
    }
}

/// Input handed to a normalizer: the listing title, the raw specs table
/// and an optional brand hint from the spider.
#[derive(Debug, Clone, Default)]
pub struct ExtractionInput {
    pub title: String,
    pub specs: BTreeMap<String, Value>,
    pub brand_hint: Option<String>,
}

impl ExtractionInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            specs: BTreeMap::new(),
            brand_hint: None,
        }
    }

    pub fn with_spec(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.specs.insert(key.into(), value.into());
        self
    }

    pub fn with_brand_hint(mut self, brand: impl Into<String>) -> Self {
        self.brand_hint = Some(brand.into());
        self
    }
}

/// The typed, confidence-scored output of a normalizer.
///
/// `confidence` and `source` reflect the provenance of the attribute
/// compatibility resolution keys on (the socket for CPUs and
/// motherboards, the memory type for RAM) — never an average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub component_type: ComponentType,
    pub attributes: BTreeMap<String, AttrValue>,
    pub confidence: f64,
    pub source: ExtractionSource,
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    pub fn new(component_type: ComponentType) -> Self {
        Self {
            component_type,
            attributes: BTreeMap::new(),
            confidence: 0.0,
            source: ExtractionSource::None,
            warnings: Vec::new(),
        }
    }

    /// Insert an attribute, ignoring `None`.
    pub fn set(&mut self, key: &str, value: Option<impl Into<AttrValue>>) {
        if let Some(v) = value {
            self.attributes.insert(key.to_string(), v.into());
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(AttrValue::as_text)
    }

    pub fn int(&self, key: &str) -> Option<u32> {
        self.attributes.get(key).and_then(AttrValue::as_int)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(AttrValue::as_flag)
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record the provenance of the deciding attribute.
    pub fn graded(mut self, source: ExtractionSource, confidence: f64) -> Self {
        self.source = source;
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// One normalizer per [`ComponentType`].
///
/// Extraction is pure: the same input always yields the same result.
pub trait Normalizer: Send + Sync {
    fn component_type(&self) -> ComponentType;

    fn extract(&self, input: &ExtractionInput) -> ExtractionResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_value_accessors() {
        assert_eq!(AttrValue::from("AM4").as_text(), Some("AM4"));
        assert_eq!(AttrValue::from(105u32).as_int(), Some(105));
        assert_eq!(AttrValue::from(true).as_flag(), Some(true));
        assert_eq!(AttrValue::from("AM4").as_int(), None);
    }

    #[test]
    fn source_round_trips() {
        for source in [
            ExtractionSource::Specs,
            ExtractionSource::Title,
            ExtractionSource::Inferred,
            ExtractionSource::InferredDual,
            ExtractionSource::None,
            ExtractionSource::AdminManual,
        ] {
            assert_eq!(ExtractionSource::parse(source.as_str()), Some(source));
        }
    }

    #[test]
    fn graded_clamps_confidence() {
        let result = ExtractionResult::new(ComponentType::Cpu)
            .graded(ExtractionSource::Specs, 1.7);
        assert_eq!(result.confidence, 1.0);
    }
}
