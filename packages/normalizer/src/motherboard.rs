//! Motherboard attribute normalizer.
//!
//! Chipset resolves first; the socket and the memory generation lean on
//! it when neither the specs table nor the title is explicit. Dual-DDR
//! chipsets (Z690/B650-class boards shipping in both DDR4 and DDR5
//! flavors) resolve through the evidence ladder in
//! [`MotherboardNormalizer::resolve_memory_type`].

use lazy_static::lazy_static;
use regex::Regex;

use crate::cascade::{find_in, re, SpecMap};
use crate::ddr::{ddr_type_from_speed, ddr_type_in, max_speed_mhz};
use crate::sockets::socket_in;
use crate::types::{
    ComponentType, ExtractionInput, ExtractionResult, ExtractionSource, Normalizer,
    CONFIDENCE_INFERRED, CONFIDENCE_INFERRED_DUAL, CONFIDENCE_SPECS, CONFIDENCE_TITLE,
};

const SOCKET_KEYS: &[&str] = &["socket", "cpu socket", "socket type", "cpu support"];
const CHIPSET_KEYS: &[&str] = &["chipset", "chipset type", "north bridge"];
const FORM_FACTOR_KEYS: &[&str] = &["form factor", "board form factor", "form-factor"];
const MEMORY_TYPE_KEYS: &[&str] = &[
    "memory type",
    "memory standard",
    "ram type",
    "supported memory",
    "dimm type",
];
const MEMORY_SLOT_KEYS: &[&str] = &["memory slots", "dimm slots", "ram slots", "memory slot"];
const MEMORY_SPEED_KEYS: &[&str] = &[
    "memory speed",
    "memory frequency",
    "supported memory speed",
    "memory clock",
    "ram speed",
];
const MEMORY_CAP_KEYS: &[&str] = &[
    "max memory",
    "maximum memory",
    "max capacity",
    "maximum capacity",
    "memory max",
    "max ram",
];

/// Which DDR generations a chipset's boards ship with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdrSupport {
    Ddr4Only,
    Ddr5Only,
    /// Boards exist in both DDR4 and DDR5 variants under the same
    /// chipset name.
    Dual,
}

struct ChipsetInfo {
    socket: &'static str,
    ddr: DdrSupport,
}

const fn info(socket: &'static str, ddr: DdrSupport) -> ChipsetInfo {
    ChipsetInfo { socket, ddr }
}

lazy_static! {
    /// Known chipsets with the socket and memory generation they imply.
    static ref CHIPSET_TABLE: Vec<(&'static str, ChipsetInfo)> = vec![
        // AMD AM4
        ("A320", info("AM4", DdrSupport::Ddr4Only)),
        ("B350", info("AM4", DdrSupport::Ddr4Only)),
        ("X370", info("AM4", DdrSupport::Ddr4Only)),
        ("B450", info("AM4", DdrSupport::Ddr4Only)),
        ("X470", info("AM4", DdrSupport::Ddr4Only)),
        ("A520", info("AM4", DdrSupport::Ddr4Only)),
        ("B550", info("AM4", DdrSupport::Ddr4Only)),
        ("X570", info("AM4", DdrSupport::Ddr4Only)),
        // AMD AM5 — chipset naming stayed adjacent to AM4; the table is
        // what disambiguates.
        ("A620", info("AM5", DdrSupport::Ddr5Only)),
        ("B650", info("AM5", DdrSupport::Dual)),
        ("B650E", info("AM5", DdrSupport::Ddr5Only)),
        ("X670", info("AM5", DdrSupport::Ddr5Only)),
        ("X670E", info("AM5", DdrSupport::Ddr5Only)),
        ("B840", info("AM5", DdrSupport::Ddr5Only)),
        ("B850", info("AM5", DdrSupport::Ddr5Only)),
        ("X870", info("AM5", DdrSupport::Ddr5Only)),
        ("X870E", info("AM5", DdrSupport::Ddr5Only)),
        // AMD HEDT
        ("TRX40", info("sTRX4", DdrSupport::Ddr4Only)),
        ("WRX80", info("sWRX8", DdrSupport::Ddr4Only)),
        // Intel 300-series (LGA1151)
        ("H310", info("LGA1151", DdrSupport::Ddr4Only)),
        ("B360", info("LGA1151", DdrSupport::Ddr4Only)),
        ("B365", info("LGA1151", DdrSupport::Ddr4Only)),
        ("H370", info("LGA1151", DdrSupport::Ddr4Only)),
        ("Z370", info("LGA1151", DdrSupport::Ddr4Only)),
        ("Z390", info("LGA1151", DdrSupport::Ddr4Only)),
        // Intel 400/500-series (LGA1200)
        ("H410", info("LGA1200", DdrSupport::Ddr4Only)),
        ("B460", info("LGA1200", DdrSupport::Ddr4Only)),
        ("Z490", info("LGA1200", DdrSupport::Ddr4Only)),
        ("H510", info("LGA1200", DdrSupport::Ddr4Only)),
        ("B560", info("LGA1200", DdrSupport::Ddr4Only)),
        ("Z590", info("LGA1200", DdrSupport::Ddr4Only)),
        // Intel 600/700-series (LGA1700): DDR4 and DDR5 boards coexist.
        ("H610", info("LGA1700", DdrSupport::Dual)),
        ("B660", info("LGA1700", DdrSupport::Dual)),
        ("H670", info("LGA1700", DdrSupport::Dual)),
        ("Z690", info("LGA1700", DdrSupport::Dual)),
        ("H770", info("LGA1700", DdrSupport::Dual)),
        ("B760", info("LGA1700", DdrSupport::Dual)),
        ("Z790", info("LGA1700", DdrSupport::Dual)),
        ("W680", info("LGA1700", DdrSupport::Dual)),
        // Intel 800-series (LGA1851)
        ("H810", info("LGA1851", DdrSupport::Ddr5Only)),
        ("B860", info("LGA1851", DdrSupport::Ddr5Only)),
        ("Z890", info("LGA1851", DdrSupport::Ddr5Only)),
    ];

    /// Candidate chipset codes in free text; validated against the table
    /// before anything trusts them.
    static ref CHIPSET_CANDIDATE_RE: Regex =
        re(r"(?i)\b([ABHWXZ]\d{3}[EM]?|TRX40|WRX80)\b");

    /// Most-specific first, so "E-ATX" never reads as "ATX" and
    /// "Micro-ATX" never loses its prefix.
    static ref FORM_FACTOR_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("E-ATX", re(r"(?i)\bE[- ]?ATX\b|\bExtended\s+ATX\b")),
        ("Micro-ATX", re(r"(?i)\bM(?:icro)?[- ]?ATX\b|\buATX\b")),
        ("Mini-ITX", re(r"(?i)\bMini[- ]?ITX\b|\bITX\b")),
        ("Mini-DTX", re(r"(?i)\bMini[- ]?DTX\b")),
        ("ATX", re(r"(?i)\bATX\b")),
    ];

    static ref SLOT_COUNT_RE: Regex = re(r"([1-8])\b");
    static ref CAPACITY_RE: Regex = re(r"(?i)\b(\d{2,4})\s*GB\b");
    static ref WIFI_RE: Regex = re(r"(?i)\bWI[- ]?FI\b");
}

/// Motherboard brands recognized in titles, curated order, first match
/// wins.
const MOBO_BRANDS: &[&str] = &[
    "ASRock", "ASUS", "Gigabyte", "MSI", "Biostar", "EVGA", "NZXT", "Colorful", "Maxsun",
];

/// Title tokens that never belong in a canonical board name.
const NAME_NOISE: &[&str] = &[
    "motherboard", "mobo", "mainboard", "board", "ddr4", "ddr5", "socket", "am4", "am5", "lga1700",
    "lga1200", "lga1151", "lga1851", "atx", "e-atx", "eatx", "micro-atx", "matx", "m-atx",
    "mini-itx", "itx", "intel", "amd", "gen", "12th", "13th", "14th",
];

fn table_lookup(code: &str) -> Option<(&'static str, &'static ChipsetInfo)> {
    CHIPSET_TABLE
        .iter()
        .find(|(name, _)| *name == code)
        .map(|(name, info)| (*name, info))
}

/// Resolve a raw chipset code against the table, stripping the "M"/"E"
/// board-variant suffixes when the exact code is absent.
fn canonical_chipset(code: &str) -> Option<(&'static str, &'static ChipsetInfo)> {
    if let Some(hit) = table_lookup(code) {
        return Some(hit);
    }
    for suffix in ['M', 'E'] {
        if let Some(stripped) = code.strip_suffix(suffix) {
            if let Some(hit) = table_lookup(stripped) {
                return Some(hit);
            }
        }
    }
    None
}

/// Scan a text for the first candidate code that validates against the
/// chipset table.
fn chipset_in(text: &str) -> Option<&'static str> {
    for caps in CHIPSET_CANDIDATE_RE.captures_iter(text) {
        let raw = caps[1].to_uppercase();
        if let Some((name, _)) = canonical_chipset(&raw) {
            return Some(name);
        }
    }
    None
}

fn extract_brand(title: &str, hint: Option<&str>) -> Option<String> {
    let lower = title.to_lowercase();
    MOBO_BRANDS
        .iter()
        .find(|b| lower.contains(&b.to_lowercase()))
        .map(|b| b.to_string())
        .or_else(|| hint.map(str::to_string))
}

/// Brand + product-line tokens + chipset token + trailing model segment,
/// with a trailing Wi-Fi tag when the board advertises it.
fn canonical_mobo_name(title: &str, brand: Option<&str>) -> Option<String> {
    let brand = brand?;
    let cleaned = title.replace(['®', '™', '©'], "");

    let mut parts: Vec<String> = vec![brand.to_string()];
    let mut saw_wifi = false;

    for token in cleaned.split_whitespace() {
        let bare = token.trim_matches(|c: char| !c.is_alphanumeric());
        if bare.is_empty() || bare.eq_ignore_ascii_case(brand) {
            continue;
        }
        if WIFI_RE.is_match(bare) {
            saw_wifi = true;
            continue;
        }
        if NAME_NOISE.contains(&bare.to_lowercase().as_str()) {
            continue;
        }
        parts.push(token.trim_matches(',').to_string());
    }
    if saw_wifi {
        parts.push("WIFI".to_string());
    }
    Some(parts.join(" "))
}

/// Motherboard normalizer. Stateless; safe to share.
#[derive(Debug, Default, Clone, Copy)]
pub struct MotherboardNormalizer;

impl MotherboardNormalizer {
    /// Dual-DDR resolution ladder: specs mention → title mention →
    /// speed inference → chipset-table default. A dual-listed chipset
    /// with no other signal defaults to DDR5 — the newer-variant bias is
    /// deliberate and surfaced through `inferred_dual`.
    fn resolve_memory_type(
        specs: &SpecMap,
        title: &str,
        observed_speed: Option<u32>,
        chipset: Option<&ChipsetInfo>,
    ) -> Option<(String, ExtractionSource, f64)> {
        if let Some(ddr) = specs
            .lookup(MEMORY_TYPE_KEYS)
            .and_then(|v| ddr_type_in(v))
            .or_else(|| ddr_type_in(&specs.joined_values()))
        {
            return Some((ddr, ExtractionSource::Specs, CONFIDENCE_SPECS));
        }
        if let Some(ddr) = ddr_type_in(title) {
            return Some((ddr, ExtractionSource::Title, CONFIDENCE_TITLE));
        }
        if let Some(ddr) = observed_speed.and_then(ddr_type_from_speed) {
            return Some((
                ddr.to_string(),
                ExtractionSource::Inferred,
                CONFIDENCE_INFERRED,
            ));
        }
        match chipset.map(|c| c.ddr) {
            Some(DdrSupport::Ddr4Only) => Some((
                "DDR4".to_string(),
                ExtractionSource::Inferred,
                CONFIDENCE_INFERRED,
            )),
            Some(DdrSupport::Ddr5Only) => Some((
                "DDR5".to_string(),
                ExtractionSource::Inferred,
                CONFIDENCE_INFERRED,
            )),
            Some(DdrSupport::Dual) => Some((
                "DDR5".to_string(),
                ExtractionSource::InferredDual,
                CONFIDENCE_INFERRED_DUAL,
            )),
            None => None,
        }
    }
}

impl Normalizer for MotherboardNormalizer {
    fn component_type(&self) -> ComponentType {
        ComponentType::Motherboard
    }

    fn extract(&self, input: &ExtractionInput) -> ExtractionResult {
        let mut result = ExtractionResult::new(ComponentType::Motherboard);
        let title = input.title.replace(['®', '™', '©'], "");
        let specs = SpecMap::from_specs(&input.specs);

        // Chipset first; socket and memory type fall back on it.
        let chipset = specs
            .lookup(CHIPSET_KEYS)
            .and_then(chipset_in)
            .or_else(|| chipset_in(&title));
        let chipset_info = chipset.and_then(|name| table_lookup(name).map(|(_, info)| info));

        match chipset {
            Some(name) => result.set("mobo_chipset", Some(name)),
            None => result.warn("chipset not recognized in specs or title"),
        }

        let socket = specs
            .lookup(SOCKET_KEYS)
            .and_then(socket_in)
            .map(|s| (s, ExtractionSource::Specs, CONFIDENCE_SPECS))
            .or_else(|| {
                socket_in(&title).map(|s| (s, ExtractionSource::Title, CONFIDENCE_TITLE))
            })
            .or_else(|| {
                chipset_info.map(|info| {
                    (
                        info.socket,
                        ExtractionSource::Inferred,
                        CONFIDENCE_INFERRED,
                    )
                })
            });

        match socket {
            Some((socket, source, confidence)) => {
                result.set("mobo_socket", Some(socket));
                result = result.graded(source, confidence);
            }
            None => {
                result.warn("socket could not be determined; chipset unknown as well");
            }
        }

        let form_factor = specs
            .lookup(FORM_FACTOR_KEYS)
            .and_then(|v| find_in(&FORM_FACTOR_PATTERNS, v))
            .or_else(|| find_in(&FORM_FACTOR_PATTERNS, &title));
        match form_factor {
            Some(ff) => result.set("mobo_form_factor", Some(ff)),
            None => result.warn("form factor not stated"),
        }

        // Memory side. Observed speed feeds the DDR inference ladder.
        let observed_speed = specs
            .lookup(MEMORY_SPEED_KEYS)
            .and_then(max_speed_mhz)
            .or_else(|| max_speed_mhz(&specs.joined_values()))
            .or_else(|| max_speed_mhz(&title));

        match Self::resolve_memory_type(&specs, &title, observed_speed, chipset_info) {
            Some((ddr, source, _)) => {
                if source == ExtractionSource::InferredDual {
                    result.warn(
                        "chipset ships in DDR4 and DDR5 variants; defaulted to DDR5 without listing evidence",
                    );
                }
                result.set("memory_type", Some(ddr));
                // Memory-type provenance is recorded in the attribute map
                // only; the record-level grade stays with the socket.
                result.set("memory_type_source", Some(source.as_str()));
            }
            None => result.warn("memory generation unknown"),
        }

        match observed_speed {
            Some(speed) => result.set("memory_max_speed_mhz", Some(speed)),
            None => result.warn("no supported memory speed found"),
        }

        let slots = specs
            .lookup(MEMORY_SLOT_KEYS)
            .and_then(|v| SLOT_COUNT_RE.captures(v))
            .and_then(|c| c[1].parse::<u32>().ok());
        match slots {
            Some(n) => result.set("memory_slots", Some(n)),
            None => result.warn("memory slot count not stated"),
        }

        let capacity = specs
            .lookup(MEMORY_CAP_KEYS)
            .and_then(|v| {
                CAPACITY_RE
                    .captures_iter(v)
                    .filter_map(|c| c[1].parse::<u32>().ok())
                    .max()
            });
        match capacity {
            Some(gb) => result.set("memory_max_capacity_gb", Some(gb)),
            None => result.warn("max memory capacity not stated"),
        }

        let brand = extract_brand(&title, input.brand_hint.as_deref());
        result.set("mobo_brand", brand.clone());

        if chipset.is_some() {
            result.set(
                "canonical_mobo_name",
                canonical_mobo_name(&input.title, brand.as_deref()),
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(input: ExtractionInput) -> ExtractionResult {
        MotherboardNormalizer.extract(&input)
    }

    #[test]
    fn chipset_then_socket_inference_from_bare_title() {
        let result = extract(ExtractionInput::new(
            "MSI B550M PRO-VDH WIFI DDR4 Motherboard",
        ));

        assert_eq!(result.text("mobo_chipset"), Some("B550"));
        assert_eq!(result.text("mobo_socket"), Some("AM4"));
        assert_eq!(result.source, ExtractionSource::Inferred);
        assert_eq!(result.confidence, 0.80);
        assert_eq!(result.text("memory_type"), Some("DDR4"));
        assert_eq!(result.text("memory_type_source"), Some("title"));
        assert_eq!(
            result.text("canonical_mobo_name"),
            Some("MSI B550M PRO-VDH WIFI")
        );
    }

    #[test]
    fn specs_socket_wins_over_chipset_inference() {
        let input = ExtractionInput::new("Gigabyte B650 AORUS Elite AX")
            .with_spec("CPU Socket", json!("Socket AM5"))
            .with_spec("Chipset", json!("AMD B650"));
        let result = extract(input);

        assert_eq!(result.text("mobo_socket"), Some("AM5"));
        assert_eq!(result.source, ExtractionSource::Specs);
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn variant_suffix_strips_to_known_chipset() {
        let result = extract(ExtractionInput::new("ASRock Z790M-ITX WiFi"));
        assert_eq!(result.text("mobo_chipset"), Some("Z790"));
        assert_eq!(result.text("mobo_socket"), Some("LGA1700"));
    }

    #[test]
    fn e_variant_is_its_own_chipset() {
        let result = extract(ExtractionInput::new("ASUS ROG Strix X670E-E Gaming WiFi"));
        assert_eq!(result.text("mobo_chipset"), Some("X670E"));
        assert_eq!(result.text("mobo_socket"), Some("AM5"));
    }

    #[test]
    fn form_factor_most_specific_first() {
        let result = extract(ExtractionInput::new("MSI MAG B650 Tomahawk E-ATX DDR5"));
        assert_eq!(result.text("mobo_form_factor"), Some("E-ATX"));

        let result = extract(
            ExtractionInput::new("ASUS Prime B450M-A").with_spec("Form Factor", json!("Micro ATX")),
        );
        assert_eq!(result.text("mobo_form_factor"), Some("Micro-ATX"));
    }

    #[test]
    fn dual_ddr_resolves_from_specs_mention() {
        let input = ExtractionInput::new("MSI PRO Z690-A Motherboard")
            .with_spec("Memory Type", json!("DDR4"));
        let result = extract(input);
        assert_eq!(result.text("memory_type"), Some("DDR4"));
        assert_eq!(result.text("memory_type_source"), Some("specs"));
    }

    #[test]
    fn dual_ddr_resolves_from_speed_when_text_is_silent() {
        let input = ExtractionInput::new("MSI PRO Z690-A Motherboard")
            .with_spec("Memory Speed", json!("Up to 6400MHz (OC)"));
        let result = extract(input);
        assert_eq!(result.text("memory_type"), Some("DDR5"));
        assert_eq!(result.text("memory_type_source"), Some("inferred"));
        assert_eq!(result.int("memory_max_speed_mhz"), Some(6400));
    }

    #[test]
    fn dual_ddr_defaults_to_ddr5_with_inferred_dual() {
        let result = extract(ExtractionInput::new("MSI PRO Z690-A Motherboard"));
        assert_eq!(result.text("memory_type"), Some("DDR5"));
        assert_eq!(result.text("memory_type_source"), Some("inferred_dual"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("defaulted to DDR5")));
    }

    #[test]
    fn single_ddr_chipset_needs_no_disambiguation() {
        let result = extract(ExtractionInput::new("ASUS TUF Gaming X570-Plus"));
        assert_eq!(result.text("memory_type"), Some("DDR4"));
        assert_eq!(result.text("memory_type_source"), Some("inferred"));
    }

    #[test]
    fn memory_slots_and_capacity_from_specs() {
        let input = ExtractionInput::new("Gigabyte B550 AORUS Elite")
            .with_spec("Memory Slots", json!("4 x DIMM"))
            .with_spec("Max Memory", json!("128GB"));
        let result = extract(input);
        assert_eq!(result.int("memory_slots"), Some(4));
        assert_eq!(result.int("memory_max_capacity_gb"), Some(128));
    }

    #[test]
    fn unknown_board_reports_warnings_not_errors() {
        let result = extract(ExtractionInput::new("Generic Industrial Board Rev 2.1"));
        assert_eq!(result.text("mobo_chipset"), None);
        assert_eq!(result.text("mobo_socket"), None);
        assert_eq!(result.source, ExtractionSource::None);
        assert!(result.warnings.len() >= 2);
    }

    #[test]
    fn lenient_chipset_candidates_skip_non_chipset_codes() {
        // "X16" looks like a chipset code shape but fails table
        // validation; the real chipset later in the title still resolves.
        let result = extract(ExtractionInput::new(
            "PCIe X990 riser bundle with ASUS Z790 board",
        ));
        assert_eq!(result.text("mobo_chipset"), Some("Z790"));
    }
}
