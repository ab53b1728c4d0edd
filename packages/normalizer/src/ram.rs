//! RAM attribute normalizer.
//!
//! The deciding attribute here is the DDR generation; capacity and
//! module count come from kit notation ("32GB (2x16GB)") with
//! cross-validation, and the ECC flag is tri-state: explicit yes,
//! explicit no, or absent entirely.

use lazy_static::lazy_static;
use regex::Regex;

use crate::cascade::{re, SpecMap};
use crate::ddr::{ddr_type_from_speed, ddr_type_in, max_speed_mhz};
use crate::types::{
    ComponentType, ExtractionInput, ExtractionResult, ExtractionSource, Normalizer,
    CONFIDENCE_INFERRED, CONFIDENCE_SPECS, CONFIDENCE_TITLE,
};

const MEMORY_TYPE_KEYS: &[&str] = &["memory type", "ram type", "type", "technology", "standard"];
const SPEED_KEYS: &[&str] = &[
    "speed",
    "frequency",
    "clock speed",
    "memory speed",
    "bus speed",
    "data rate",
];
const CAPACITY_KEYS: &[&str] = &["capacity", "size", "memory size", "total capacity", "kit capacity"];

lazy_static! {
    // "32GB (2x16GB)" — total, module count, per-module size.
    static ref KIT_RE: Regex =
        re(r"(?i)\b(\d{1,4})\s*GB\s*\(\s*(\d)\s*[x×]\s*(\d{1,3})\s*GB\s*\)");
    // "2x16GB" without the leading total.
    static ref MODULES_RE: Regex = re(r"(?i)\b(\d)\s*[x×]\s*(\d{1,3})\s*GB\b");
    static ref PLAIN_GB_RE: Regex = re(r"(?i)\b(\d{1,4})\s*GB\b");
    static ref DUAL_CHANNEL_RE: Regex = re(r"(?i)\bDual[- ]?Channel\b");
    static ref QUAD_CHANNEL_RE: Regex = re(r"(?i)\bQuad[- ]?Channel\b");
    static ref NON_ECC_RE: Regex = re(r"(?i)\bNon[- ]?ECC\b");
    static ref ECC_RE: Regex = re(r"(?i)\bECC\b");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Kit {
    capacity_gb: u32,
    modules: Option<u32>,
}

/// Parse capacity and module count from kit notation, falling back to a
/// plain size and then to channel keywords.
fn parse_kit(text: &str, warnings: &mut Vec<String>) -> Option<Kit> {
    if let Some(c) = KIT_RE.captures(text) {
        let total: u32 = c[1].parse().ok()?;
        let modules: u32 = c[2].parse().ok()?;
        let per_module: u32 = c[3].parse().ok()?;
        if modules * per_module != total {
            warnings.push(format!(
                "kit notation inconsistent: {}x{}GB does not equal {}GB",
                modules, per_module, total
            ));
        }
        return Some(Kit {
            capacity_gb: total,
            modules: Some(modules),
        });
    }
    if let Some(c) = MODULES_RE.captures(text) {
        let modules: u32 = c[1].parse().ok()?;
        let per_module: u32 = c[2].parse().ok()?;
        return Some(Kit {
            capacity_gb: modules * per_module,
            modules: Some(modules),
        });
    }
    if let Some(c) = PLAIN_GB_RE.captures(text) {
        let capacity: u32 = c[1].parse().ok()?;
        let modules = if DUAL_CHANNEL_RE.is_match(text) {
            Some(2)
        } else if QUAD_CHANNEL_RE.is_match(text) {
            Some(4)
        } else {
            None
        };
        return Some(Kit {
            capacity_gb: capacity,
            modules,
        });
    }
    None
}

/// RAM normalizer. Stateless; safe to share.
#[derive(Debug, Default, Clone, Copy)]
pub struct RamNormalizer;

impl Normalizer for RamNormalizer {
    fn component_type(&self) -> ComponentType {
        ComponentType::Ram
    }

    fn extract(&self, input: &ExtractionInput) -> ExtractionResult {
        let mut result = ExtractionResult::new(ComponentType::Ram);
        let title = input.title.replace(['®', '™', '©'], "");
        let specs = SpecMap::from_specs(&input.specs);

        let speed = specs
            .lookup(SPEED_KEYS)
            .and_then(max_speed_mhz)
            .or_else(|| max_speed_mhz(&specs.joined_values()))
            .or_else(|| max_speed_mhz(&title));

        // Memory type decides the record-level grade for RAM.
        let memory_type = specs
            .lookup(MEMORY_TYPE_KEYS)
            .and_then(|v| ddr_type_in(v))
            .or_else(|| ddr_type_in(&specs.joined_values()))
            .map(|t| (t, ExtractionSource::Specs, CONFIDENCE_SPECS))
            .or_else(|| {
                ddr_type_in(&title).map(|t| (t, ExtractionSource::Title, CONFIDENCE_TITLE))
            })
            .or_else(|| {
                speed.and_then(ddr_type_from_speed).map(|t| {
                    (
                        t.to_string(),
                        ExtractionSource::Inferred,
                        CONFIDENCE_INFERRED,
                    )
                })
            });

        match memory_type {
            Some((ddr, source, confidence)) => {
                result.set("memory_type", Some(ddr));
                result = result.graded(source, confidence);
            }
            None => {
                result.warn("DDR generation not stated and speed inconclusive");
            }
        }

        match speed {
            Some(mhz) => result.set("memory_max_speed_mhz", Some(mhz)),
            None => result.warn("module speed not found"),
        }

        let mut kit_warnings = Vec::new();
        let mut kit = specs
            .lookup(CAPACITY_KEYS)
            .and_then(|v| parse_kit(v, &mut kit_warnings));
        if kit.is_none() {
            kit = parse_kit(&title, &mut kit_warnings);
        }
        if kit.is_none() {
            kit = parse_kit(&specs.joined_values(), &mut kit_warnings);
        }
        for w in kit_warnings {
            result.warn(w);
        }
        match kit {
            Some(kit) => {
                result.set("memory_capacity_gb", Some(kit.capacity_gb));
                result.set("memory_modules", kit.modules);
            }
            None => result.warn("kit capacity not found"),
        }

        // Tri-state ECC: absence means unknown, not false.
        let ecc_text = format!("{} {}", title, specs.joined_values());
        if NON_ECC_RE.is_match(&ecc_text) {
            result.set("ecc", Some(false));
        } else if ECC_RE.is_match(&ecc_text) {
            result.set("ecc", Some(true));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(input: ExtractionInput) -> ExtractionResult {
        RamNormalizer.extract(&input)
    }

    #[test]
    fn kit_notation_with_cross_validation() {
        let result = extract(ExtractionInput::new(
            "Corsair Vengeance 32GB (2x16GB) DDR5-6000 CL30",
        ));
        assert_eq!(result.text("memory_type"), Some("DDR5"));
        assert_eq!(result.source, ExtractionSource::Title);
        assert_eq!(result.int("memory_capacity_gb"), Some(32));
        assert_eq!(result.int("memory_modules"), Some(2));
        assert_eq!(result.int("memory_max_speed_mhz"), Some(6000));
        assert!(result.warnings.is_empty() || !result
            .warnings
            .iter()
            .any(|w| w.contains("inconsistent")));
    }

    #[test]
    fn inconsistent_kit_keeps_total_and_warns() {
        let result = extract(ExtractionInput::new("48GB (2x16GB) DDR5 5600MHz kit"));
        assert_eq!(result.int("memory_capacity_gb"), Some(48));
        assert_eq!(result.int("memory_modules"), Some(2));
        assert!(result.warnings.iter().any(|w| w.contains("inconsistent")));
    }

    #[test]
    fn plain_capacity_with_channel_keyword() {
        let result = extract(ExtractionInput::new(
            "G.Skill Ripjaws V 16GB DDR4 3200MHz Dual Channel Kit",
        ));
        assert_eq!(result.int("memory_capacity_gb"), Some(16));
        assert_eq!(result.int("memory_modules"), Some(2));
    }

    #[test]
    fn pc_rating_converts_to_mts() {
        let input = ExtractionInput::new("Kingston FURY 16GB PC5-48000 module");
        let result = extract(input);
        assert_eq!(result.int("memory_max_speed_mhz"), Some(6000));
        // No explicit DDR mention: speed 6000 ⇒ DDR5 by inference.
        assert_eq!(result.text("memory_type"), Some("DDR5"));
        assert_eq!(result.source, ExtractionSource::Inferred);
        assert_eq!(result.confidence, 0.80);
    }

    #[test]
    fn specs_type_wins_over_title_inference() {
        let input = ExtractionInput::new("Value RAM 3200MHz 8GB")
            .with_spec("Memory Type", json!("DDR4"));
        let result = extract(input);
        assert_eq!(result.text("memory_type"), Some("DDR4"));
        assert_eq!(result.source, ExtractionSource::Specs);
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn ecc_is_tri_state() {
        let explicit_no = extract(ExtractionInput::new("Crucial 16GB DDR4 Non-ECC UDIMM"));
        assert_eq!(explicit_no.flag("ecc"), Some(false));

        let explicit_yes = extract(ExtractionInput::new("Samsung 32GB DDR4 ECC RDIMM"));
        assert_eq!(explicit_yes.flag("ecc"), Some(true));

        let unknown = extract(ExtractionInput::new("Corsair 16GB DDR4 3200"));
        assert_eq!(unknown.flag("ecc"), None);
        assert_eq!(unknown.attributes.get("ecc"), None);
    }

    #[test]
    fn speed_from_specs_map_with_nested_values() {
        let input = ExtractionInput::new("Server Memory Module")
            .with_spec("Frequency", json!(["4800 MT/s", "5600 MT/s"]))
            .with_spec("Capacity", json!("64GB (4x16GB)"));
        let result = extract(input);
        assert_eq!(result.int("memory_max_speed_mhz"), Some(5600));
        assert_eq!(result.int("memory_modules"), Some(4));
        assert_eq!(result.text("memory_type"), Some("DDR5"));
        assert_eq!(result.source, ExtractionSource::Inferred);
    }

    #[test]
    fn nothing_extractable_warns_and_grades_none() {
        let result = extract(ExtractionInput::new("Mystery Memory Product"));
        assert_eq!(result.source, ExtractionSource::None);
        assert_eq!(result.confidence, 0.0);
        assert!(result.warnings.len() >= 2);
    }

    #[test]
    fn extraction_is_deterministic() {
        let input = ExtractionInput::new("Corsair Vengeance 32GB (2x16GB) DDR5-6000")
            .with_spec("Speed", json!("6000MHz"));
        assert_eq!(extract(input.clone()), extract(input));
    }
}
