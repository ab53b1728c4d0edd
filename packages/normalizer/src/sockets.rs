//! Socket name patterns shared by the CPU and motherboard normalizers.

use lazy_static::lazy_static;
use regex::Regex;

use crate::cascade::{find_in, re};

lazy_static! {
    /// Ordered socket patterns; more specific names first so "sTRX4"
    /// never resolves as "sTR4".
    pub static ref SOCKET_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("sTRX4", re(r"(?i)\bsTRX4\b")),
        ("sTR5", re(r"(?i)\bsTR5\b")),
        ("sTR4", re(r"(?i)\bsTR4\b")),
        ("sWRX8", re(r"(?i)\bsWRX8\b")),
        ("SP3", re(r"(?i)\bSP3\b")),
        ("AM5", re(r"(?i)\bAM5\b")),
        ("AM4", re(r"(?i)\bAM4\b")),
        ("AM3+", re(r"(?i)\bAM3\+")),
        ("LGA1851", re(r"(?i)\b(?:FC)?LGA\s*1851\b")),
        ("LGA1700", re(r"(?i)\b(?:FC)?LGA\s*1700\b")),
        ("LGA1200", re(r"(?i)\b(?:FC)?LGA\s*1200\b")),
        ("LGA2066", re(r"(?i)\b(?:FC)?LGA\s*2066\b")),
        ("LGA1151", re(r"(?i)\b(?:FC)?LGA\s*1151\b")),
        ("LGA4677", re(r"(?i)\b(?:FC)?LGA\s*4677\b")),
    ];
}

/// Find the first known socket named in a text.
pub fn socket_in(text: &str) -> Option<&'static str> {
    find_in(&SOCKET_PATTERNS, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_common_notations() {
        assert_eq!(socket_in("Socket AM4 Ready"), Some("AM4"));
        assert_eq!(socket_in("FCLGA1700 package"), Some("LGA1700"));
        assert_eq!(socket_in("lga 1200"), Some("LGA1200"));
        assert_eq!(socket_in("Threadripper sTRX4"), Some("sTRX4"));
        assert_eq!(socket_in("no socket here"), None);
    }
}
