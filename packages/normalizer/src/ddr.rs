//! DDR generation detection and memory-speed parsing.
//!
//! Shared by the motherboard and RAM normalizers so both sides of a
//! compatibility check apply identical thresholds.

use lazy_static::lazy_static;
use regex::Regex;

use crate::cascade::re;

/// Observed max memory speed at or above this is treated as DDR5.
pub const DDR5_SPEED_FLOOR_MHZ: u32 = 4800;

/// Observed max memory speed at or below this is treated as DDR4.
pub const DDR4_SPEED_CEILING_MHZ: u32 = 3600;

lazy_static! {
    static ref DDR_RE: Regex = re(r"(?i)\bDDR([2345])\b");
    // "DDR5-6000" / "DDR4 3200" style.
    static ref DDR_SPEED_RE: Regex = re(r"(?i)\bDDR[2345][- ](\d{3,5})\b");
    // "PC5-48000" module naming: bandwidth in MB/s, divide by 8 for MT/s.
    static ref PC_RATING_RE: Regex = re(r"(?i)\bPC[2345][- ](\d{4,6})\b");
    // Plain "6000MHz" / "6000 MT/s" mentions.
    static ref MHZ_RE: Regex = re(r"(?i)\b(\d{3,5})\s*(?:MHz|MT/?s)\b");
}

/// Find an explicit DDR generation mention ("DDR4", "DDR5") in a text.
pub fn ddr_type_in(text: &str) -> Option<String> {
    DDR_RE
        .captures(text)
        .map(|c| format!("DDR{}", &c[1]))
}

/// Classify a memory speed into a DDR generation, when unambiguous.
pub fn ddr_type_from_speed(speed_mhz: u32) -> Option<&'static str> {
    if speed_mhz >= DDR5_SPEED_FLOOR_MHZ {
        Some("DDR5")
    } else if speed_mhz <= DDR4_SPEED_CEILING_MHZ && speed_mhz >= 1600 {
        Some("DDR4")
    } else {
        None
    }
}

/// Extract the highest memory speed mentioned in a text, in MT/s.
///
/// Understands "DDR5-6000", "PC5-48000" (divided by 8) and bare
/// "6000MHz"/"6000MT/s" notations.
pub fn max_speed_mhz(text: &str) -> Option<u32> {
    let mut best: Option<u32> = None;
    let mut push = |v: u32| {
        // Reject values no DDR generation has ever shipped at.
        if (400..=12000).contains(&v) {
            best = Some(best.map_or(v, |b| b.max(v)));
        }
    };

    for caps in DDR_SPEED_RE.captures_iter(text) {
        if let Ok(v) = caps[1].parse::<u32>() {
            push(v);
        }
    }
    for caps in PC_RATING_RE.captures_iter(text) {
        if let Ok(v) = caps[1].parse::<u32>() {
            push(v / 8);
        }
    }
    for caps in MHZ_RE.captures_iter(text) {
        if let Ok(v) = caps[1].parse::<u32>() {
            push(v);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_ddr_generation() {
        assert_eq!(ddr_type_in("Corsair 32GB DDR5 kit"), Some("DDR5".into()));
        assert_eq!(ddr_type_in("ddr4-3200 dimm"), Some("DDR4".into()));
        assert_eq!(ddr_type_in("GDDR6 graphics memory"), None);
        assert_eq!(ddr_type_in("no memory here"), None);
    }

    #[test]
    fn speed_thresholds_classify_generations() {
        assert_eq!(ddr_type_from_speed(6000), Some("DDR5"));
        assert_eq!(ddr_type_from_speed(4800), Some("DDR5"));
        assert_eq!(ddr_type_from_speed(3200), Some("DDR4"));
        // The 3600..4800 gap is ambiguous by design.
        assert_eq!(ddr_type_from_speed(4000), None);
    }

    #[test]
    fn parses_all_speed_notations() {
        assert_eq!(max_speed_mhz("DDR5-6000 CL30"), Some(6000));
        assert_eq!(max_speed_mhz("PC5-48000 UDIMM"), Some(6000));
        assert_eq!(max_speed_mhz("3200MHz CL16"), Some(3200));
        assert_eq!(max_speed_mhz("speed 3200 MT/s"), Some(3200));
        assert_eq!(max_speed_mhz("no speeds"), None);
    }

    #[test]
    fn takes_the_maximum_of_multiple_mentions() {
        assert_eq!(
            max_speed_mhz("DDR4 2133/2400/2666/3200 MHz supported"),
            Some(3200)
        );
    }
}
