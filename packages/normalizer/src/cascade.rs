//! Shared extraction cascade used by every normalizer.
//!
//! All attributes resolve through the same ladder: specs table under
//! synonym keys, then the free-text title, then inference from a related
//! attribute, then give up with a warning. Spec values arriving as nested
//! arrays or objects are flattened to a single searchable string first, so
//! key lookup survives inconsistent retailer JSON shapes.

use std::collections::BTreeMap;

use serde_json::Value;

/// Normalize a spec key for lookup: lowercase, spaces/hyphens/underscores
/// removed.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | '\t'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Flatten an arbitrary spec value (string, number, bool, array, object)
/// into one searchable string.
pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(flatten_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(map) => map
            .values()
            .map(flatten_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null => String::new(),
    }
}

/// A specs table preprocessed for synonym lookup.
#[derive(Debug, Clone, Default)]
pub struct SpecMap {
    entries: Vec<(String, String)>,
}

impl SpecMap {
    pub fn from_specs(specs: &BTreeMap<String, Value>) -> Self {
        let entries = specs
            .iter()
            .map(|(k, v)| (normalize_key(k), flatten_value(v)))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the first spec value whose key matches one of the synonyms.
    ///
    /// Synonym order is the priority order. A key matches on equality
    /// first, then on containment, so "memory type (ram)" still answers a
    /// lookup for "memorytype".
    pub fn lookup(&self, synonyms: &[&str]) -> Option<&str> {
        for synonym in synonyms {
            let wanted = normalize_key(synonym);
            if let Some((_, v)) = self.entries.iter().find(|(k, _)| *k == wanted) {
                return Some(v.as_str());
            }
            if let Some((_, v)) = self.entries.iter().find(|(k, _)| k.contains(&wanted)) {
                return Some(v.as_str());
            }
        }
        None
    }

    /// All flattened values joined, for whole-table pattern sweeps.
    pub fn joined_values(&self) -> String {
        self.entries
            .iter()
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Compile a static pattern table entry.
pub(crate) fn re(pattern: &str) -> regex::Regex {
    regex::Regex::new(pattern).expect("static pattern compiles")
}

/// Try an ordered pattern table against a text, returning the first
/// matching canonical name.
pub fn find_in(table: &[(&'static str, regex::Regex)], text: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_normalization_is_case_space_hyphen_insensitive() {
        assert_eq!(normalize_key("Memory Type"), "memorytype");
        assert_eq!(normalize_key("memory-type"), "memorytype");
        assert_eq!(normalize_key("MEMORY_TYPE"), "memorytype");
    }

    #[test]
    fn nested_values_flatten_to_searchable_text() {
        assert_eq!(flatten_value(&json!("AM4")), "AM4");
        assert_eq!(flatten_value(&json!(["DDR4", "DDR5"])), "DDR4 DDR5");
        assert_eq!(
            flatten_value(&json!({"en": "Socket AM4", "bn": null})),
            "Socket AM4"
        );
        assert_eq!(flatten_value(&json!(105)), "105");
    }

    #[test]
    fn lookup_prefers_synonym_order_then_exact_keys() {
        let mut specs = BTreeMap::new();
        specs.insert("Socket Type".to_string(), json!("AM4"));
        specs.insert("CPU Socket (Supported)".to_string(), json!("AM5"));
        let map = SpecMap::from_specs(&specs);

        // "sockettype" matches exactly; it wins over containment matches.
        assert_eq!(map.lookup(&["socket type", "cpu socket"]), Some("AM4"));
        // First synonym has priority even when both would match.
        assert_eq!(map.lookup(&["cpu socket", "socket type"]), Some("AM5"));
    }

    #[test]
    fn lookup_misses_return_none() {
        let map = SpecMap::from_specs(&BTreeMap::new());
        assert_eq!(map.lookup(&["socket"]), None);
    }
}
