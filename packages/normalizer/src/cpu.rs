//! CPU attribute normalizer.
//!
//! Extracts the socket (the attribute compatibility resolution keys on),
//! brand, generation, TDP and a canonical model name used for
//! external-dataset joins.

use lazy_static::lazy_static;
use regex::Regex;

use crate::cascade::{re, SpecMap};
use crate::sockets::socket_in;
use crate::types::{
    ComponentType, ExtractionInput, ExtractionResult, ExtractionSource, Normalizer,
    CONFIDENCE_INFERRED, CONFIDENCE_SPECS, CONFIDENCE_TITLE,
};

/// Spec-table keys that may carry the socket.
const SOCKET_KEYS: &[&str] = &[
    "socket",
    "cpu socket",
    "socket type",
    "supported socket",
    "package",
];

/// Spec-table keys that may carry the TDP.
const TDP_KEYS: &[&str] = &[
    "tdp",
    "default tdp",
    "thermal design power",
    "processor base power",
    "wattage",
];

/// TDP values outside this range are treated as false positives from
/// unrelated numbers.
const TDP_RANGE_WATTS: std::ops::RangeInclusive<u32> = 5..=500;

lazy_static! {
    /// Series → (generation label, socket). Used when neither the specs
    /// table nor the title names the socket outright.
    static ref GENERATION_SOCKETS: Vec<(Regex, &'static str, &'static str)> = vec![
        (re(r"(?i)\bRyzen\s+[3579]\s*9\d{3}"), "Ryzen 9000 Series", "AM5"),
        (re(r"(?i)\bRyzen\s+[3579]\s*8\d{3}"), "Ryzen 8000 Series", "AM5"),
        (re(r"(?i)\bRyzen\s+[3579]\s*7\d{3}"), "Ryzen 7000 Series", "AM5"),
        (re(r"(?i)\bRyzen\s+[3579]\s*5\d{3}"), "Ryzen 5000 Series", "AM4"),
        (re(r"(?i)\bRyzen\s+[3579]\s*4\d{3}"), "Ryzen 4000 Series", "AM4"),
        (re(r"(?i)\bRyzen\s+[3579]\s*3\d{3}"), "Ryzen 3000 Series", "AM4"),
        (re(r"(?i)\bRyzen\s+[3579]\s*2\d{3}"), "Ryzen 2000 Series", "AM4"),
        (re(r"(?i)\bRyzen\s+[3579]\s*1\d{3}"), "Ryzen 1000 Series", "AM4"),
        (re(r"(?i)\bCore\s+Ultra\s+[579]\s*2\d{2}"), "Core Ultra Series 2", "LGA1851"),
        (re(r"(?i)\bi[3579][- ]?1[234]\d{3}"), "Intel 12th-14th Gen", "LGA1700"),
        (re(r"(?i)\bi[3579][- ]?1[01]\d{3}"), "Intel 10th/11th Gen", "LGA1200"),
        (re(r"(?i)\bi[3579][- ]?[6789]\d{3}"), "Intel 6th-9th Gen", "LGA1151"),
    ];

    static ref TDP_RE: Regex = re(r"(?i)\b(\d{1,3})\s*W(?:att)?s?\b");

    // Canonical model-name families, tried in fixed priority order.
    static ref CORE_I_RE: Regex = re(r"(?i)\b(i[3579])[- ]?(\d{3,5}[A-Z]{0,2})\b");
    static ref CORE_ULTRA_RE: Regex = re(r"(?i)\bCore\s+Ultra\s+([579])\s+(\d{3}[A-Z]{0,2})\b");
    static ref RYZEN_RE: Regex = re(r"(?i)\bRyzen\s+([3579])\s+(\d{4}[A-Z0-9]{0,3})\b");
    static ref THREADRIPPER_RE: Regex =
        re(r"(?i)\bThreadripper\s+(PRO\s+)?(\d{4}[A-Z]{0,3})\b");
    static ref XEON_RE: Regex = re(
        r"(?i)\bXeon\s+((?:E[357]?-?\d{3,4}(?:\s?v\d)?)|(?:[WD]-\d{4,5}[A-Z]{0,2})|(?:(?:Bronze|Silver|Gold|Platinum)\s+\d{4}[A-Z]?))"
    );
    static ref EPYC_RE: Regex = re(r"(?i)\bEPYC\s+(\d{4}[A-Z]{0,2})\b");
    static ref ATHLON_RE: Regex =
        re(r"(?i)\bAthlon\s+((?:X4|II\s+X[234]|Gold|Silver)\s+)?(\d{3,4}[A-Z]{0,2})\b");
    static ref APU_RE: Regex = re(r"(?i)\bA(\d{1,2})[- ](\d{4}[A-Z]{0,2})\b");
    static ref OPTERON_RE: Regex = re(r"(?i)\bOpteron\s+(X?\d{3,4}[A-Z]{0,2})\b");
    static ref I7_EXTREME_RE: Regex =
        re(r"(?i)\bi7\s+Extreme\s+(?:Edition\s+)?(\d{3,4}X?)\b");
    static ref PENTIUM_RE: Regex = re(r"(?i)\bPentium\s+(Gold\s+)?(G?\d{4,5}[A-Z]{0,2})\b");
    static ref CELERON_RE: Regex = re(r"(?i)\bCeleron\s+(G?\d{3,5}[A-Z]{0,2})\b");
}

const AMD_INDICATORS: &[&str] = &["amd", "ryzen", "threadripper", "epyc", "athlon", "opteron"];
const INTEL_INDICATORS: &[&str] = &[
    "intel", "core i", "core ultra", "xeon", "pentium", "celeron",
];

/// Strip trademark glyphs retailers love to paste into titles.
fn strip_trademarks(text: &str) -> String {
    text.replace(['®', '™', '©'], "")
}

/// Derive a canonical model name by trying the family regexes in fixed
/// priority order and returning the first structural match.
pub fn canonical_cpu_name(title: &str) -> Option<String> {
    let text = strip_trademarks(title);

    if let Some(c) = CORE_I_RE.captures(&text) {
        return Some(format!(
            "Core {}-{}",
            c[1].to_lowercase(),
            c[2].to_uppercase()
        ));
    }
    if let Some(c) = CORE_ULTRA_RE.captures(&text) {
        return Some(format!("Core Ultra {} {}", &c[1], c[2].to_uppercase()));
    }
    if let Some(c) = RYZEN_RE.captures(&text) {
        return Some(format!("Ryzen {} {}", &c[1], c[2].to_uppercase()));
    }
    if let Some(c) = THREADRIPPER_RE.captures(&text) {
        let pro = if c.get(1).is_some() { "PRO " } else { "" };
        return Some(format!("Ryzen Threadripper {}{}", pro, c[2].to_uppercase()));
    }
    if let Some(c) = XEON_RE.captures(&text) {
        return Some(format!("Xeon {}", normalize_model(&c[1])));
    }
    if let Some(c) = EPYC_RE.captures(&text) {
        return Some(format!("EPYC {}", c[1].to_uppercase()));
    }
    if let Some(c) = ATHLON_RE.captures(&text) {
        let line = c.get(1).map(|m| normalize_model(m.as_str())).unwrap_or_default();
        let line = if line.is_empty() { line } else { format!("{} ", line) };
        return Some(format!("Athlon {}{}", line, c[2].to_uppercase()));
    }
    if let Some(c) = APU_RE.captures(&text) {
        return Some(format!("A{}-{}", &c[1], c[2].to_uppercase()));
    }
    if let Some(c) = OPTERON_RE.captures(&text) {
        return Some(format!("Opteron {}", c[1].to_uppercase()));
    }
    if let Some(c) = I7_EXTREME_RE.captures(&text) {
        return Some(format!("Core i7 Extreme {}", c[1].to_uppercase()));
    }
    if let Some(c) = PENTIUM_RE.captures(&text) {
        let gold = if c.get(1).is_some() { "Gold " } else { "" };
        return Some(format!("Pentium {}{}", gold, c[2].to_uppercase()));
    }
    if let Some(c) = CELERON_RE.captures(&text) {
        return Some(format!("Celeron {}", c[1].to_uppercase()));
    }
    None
}

/// Collapse internal whitespace and canonicalize the casing of a captured
/// model fragment. Tier words keep title case, "v3"-style revisions stay
/// lowercase, everything else is a model code and goes uppercase.
fn normalize_model(fragment: &str) -> String {
    fragment
        .split_whitespace()
        .map(|tok| match tok.to_lowercase().as_str() {
            "bronze" => "Bronze".to_string(),
            "silver" => "Silver".to_string(),
            "gold" => "Gold".to_string(),
            "platinum" => "Platinum".to_string(),
            t if t.len() == 2 && t.starts_with('v') => t.to_string(),
            _ => tok.to_uppercase(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_brand(title: &str, hint: Option<&str>) -> Option<String> {
    let lower = title.to_lowercase();
    if AMD_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return Some("AMD".to_string());
    }
    if INTEL_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return Some("Intel".to_string());
    }
    hint.map(str::to_string)
}

fn extract_tdp(spec_value: Option<&str>, title: &str) -> Option<(u32, ExtractionSource)> {
    let parse = |text: &str| {
        TDP_RE
            .captures_iter(text)
            .filter_map(|c| c[1].parse::<u32>().ok())
            .find(|w| TDP_RANGE_WATTS.contains(w))
    };
    if let Some(w) = spec_value.and_then(|v| parse(v)) {
        return Some((w, ExtractionSource::Specs));
    }
    parse(title).map(|w| (w, ExtractionSource::Title))
}

/// CPU normalizer. Stateless; safe to share.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuNormalizer;

impl Normalizer for CpuNormalizer {
    fn component_type(&self) -> ComponentType {
        ComponentType::Cpu
    }

    fn extract(&self, input: &ExtractionInput) -> ExtractionResult {
        let mut result = ExtractionResult::new(ComponentType::Cpu);
        let title = strip_trademarks(&input.title);
        let specs = SpecMap::from_specs(&input.specs);

        let generation_row = GENERATION_SOCKETS
            .iter()
            .find(|(regex, _, _)| regex.is_match(&title));

        // Socket: specs → title → series inference.
        let socket_spec = specs.lookup(SOCKET_KEYS);
        let socket = socket_spec
            .and_then(socket_in)
            .map(|s| (s, ExtractionSource::Specs, CONFIDENCE_SPECS))
            .or_else(|| {
                socket_in(&title).map(|s| (s, ExtractionSource::Title, CONFIDENCE_TITLE))
            })
            .or_else(|| {
                generation_row.map(|(_, _, socket)| {
                    (*socket, ExtractionSource::Inferred, CONFIDENCE_INFERRED)
                })
            });

        match socket {
            Some((socket, source, confidence)) => {
                result.set("cpu_socket", Some(socket));
                result = result.graded(source, confidence);
            }
            None => {
                result.warn("CPU socket could not be determined from specs, title or series");
            }
        }

        result.set("cpu_brand", extract_brand(&title, input.brand_hint.as_deref()));

        if let Some((_, generation, _)) = generation_row {
            result.set("cpu_generation", Some(*generation));
        }

        let tdp_spec = specs.lookup(TDP_KEYS);
        match extract_tdp(tdp_spec, &title) {
            Some((watts, _)) => result.set("cpu_tdp_watts", Some(watts)),
            None => result.warn("no plausible TDP figure found"),
        }

        match canonical_cpu_name(&input.title) {
            Some(name) => result.set("canonical_cpu_name", Some(name)),
            None => result.warn("title matched no known CPU family"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(input: ExtractionInput) -> ExtractionResult {
        CpuNormalizer.extract(&input)
    }

    #[test]
    fn socket_from_specs_wins_with_specs_confidence() {
        let input = ExtractionInput::new("AMD Ryzen 7 5800X Processor")
            .with_spec("Socket", json!("AM4"))
            .with_spec("TDP", json!("105W"));
        let result = extract(input);

        assert_eq!(result.text("cpu_socket"), Some("AM4"));
        assert_eq!(result.source, ExtractionSource::Specs);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.text("cpu_brand"), Some("AMD"));
        assert_eq!(result.int("cpu_tdp_watts"), Some(105));
        assert_eq!(result.text("canonical_cpu_name"), Some("Ryzen 7 5800X"));
    }

    #[test]
    fn socket_from_title_when_specs_silent() {
        let result = extract(ExtractionInput::new(
            "Intel Core i5-12400F LGA1700 Desktop Processor",
        ));
        assert_eq!(result.text("cpu_socket"), Some("LGA1700"));
        assert_eq!(result.source, ExtractionSource::Title);
        assert_eq!(result.confidence, 0.90);
    }

    #[test]
    fn socket_inferred_from_series_when_not_stated() {
        let result = extract(ExtractionInput::new("AMD Ryzen 5 5600G Processor"));
        assert_eq!(result.text("cpu_socket"), Some("AM4"));
        assert_eq!(result.source, ExtractionSource::Inferred);
        assert_eq!(result.confidence, 0.80);
        assert_eq!(result.text("cpu_generation"), Some("Ryzen 5000 Series"));
    }

    #[test]
    fn specs_beat_title_when_both_resolvable() {
        // Title says AM4 via series inference AND directly; specs say AM5.
        let input = ExtractionInput::new("AMD Ryzen 7 5800X AM4 Processor")
            .with_spec("Socket", json!("Socket AM5"));
        let result = extract(input);
        assert_eq!(result.text("cpu_socket"), Some("AM5"));
        assert_eq!(result.source, ExtractionSource::Specs);
    }

    #[test]
    fn unknown_socket_yields_warning_and_none_source() {
        let result = extract(ExtractionInput::new("Mystery Processor 9000"));
        assert_eq!(result.text("cpu_socket"), None);
        assert_eq!(result.source, ExtractionSource::None);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn brand_title_overrides_hint_for_canonical_brands() {
        let input = ExtractionInput::new("Intel Core i7-13700K").with_brand_hint("MSI");
        assert_eq!(extract(input).text("cpu_brand"), Some("Intel"));

        let input = ExtractionInput::new("Octa-Core Workstation CPU").with_brand_hint("MSI");
        assert_eq!(extract(input).text("cpu_brand"), Some("MSI"));
    }

    #[test]
    fn tdp_rejects_out_of_range_numbers() {
        let input = ExtractionInput::new("AMD Ryzen 5 5600 with 4000W PSU bundle");
        let result = extract(input);
        assert_eq!(result.int("cpu_tdp_watts"), None);
    }

    #[test]
    fn tdp_from_nested_spec_value() {
        let input = ExtractionInput::new("AMD Ryzen 9 5950X")
            .with_spec("Default TDP", json!(["105W", "cTDP 65-105W"]));
        assert_eq!(extract(input).int("cpu_tdp_watts"), Some(105));
    }

    #[test]
    fn canonical_names_cover_the_family_table() {
        let cases = [
            ("Intel® Core™ i7-12700K Processor", "Core i7-12700K"),
            ("Intel Core Ultra 7 265K", "Core Ultra 7 265K"),
            ("AMD Ryzen 9 7950X3D", "Ryzen 9 7950X3D"),
            (
                "AMD Ryzen Threadripper PRO 5995WX",
                "Ryzen Threadripper PRO 5995WX",
            ),
            ("Intel Xeon E5-2690 v4", "Xeon E5-2690 v4"),
            ("AMD EPYC 7543 Server CPU", "EPYC 7543"),
            ("AMD Athlon Gold 3150G", "Athlon Gold 3150G"),
            ("AMD A10-7850K APU", "A10-7850K"),
            ("AMD Opteron 6380 Processor", "Opteron 6380"),
            ("Intel Pentium Gold G6400", "Pentium Gold G6400"),
            ("Intel Celeron G5905", "Celeron G5905"),
        ];
        for (title, expected) in cases {
            assert_eq!(
                canonical_cpu_name(title).as_deref(),
                Some(expected),
                "title: {title}"
            );
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        let input = ExtractionInput::new("AMD Ryzen 7 5800X Processor")
            .with_spec("Socket", json!("AM4"));
        assert_eq!(extract(input.clone()), extract(input));
    }
}
