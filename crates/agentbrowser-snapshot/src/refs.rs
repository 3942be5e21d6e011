//! Ref table produced by a snapshot.

use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// How to find one element again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefEntry {
    /// Structural selector that re-locates the element on the live page.
    pub selector: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Zero-based occurrence index among elements sharing role and name.
    /// Absent when the pair is unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

/// Ordered map from ref id to entry. Insertion order is discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefMap {
    entries: Vec<(String, RefEntry)>,
    index: HashMap<String, usize>,
}

impl RefMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: String, entry: RefEntry) {
        if let Some(&pos) = self.index.get(&id) {
            self.entries[pos].1 = entry;
            return;
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push((id, entry));
    }

    /// Look up a ref. Accepts any of the forms understood by [`parse_ref`].
    pub fn get(&self, reference: &str) -> Option<&RefEntry> {
        let id = parse_ref(reference).unwrap_or(reference);
        self.index.get(id).map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RefEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut RefEntry> {
        self.entries.iter_mut().map(|(_, entry)| entry)
    }
}

impl Serialize for RefMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, entry) in &self.entries {
            map.serialize_entry(id, entry)?;
        }
        map.end()
    }
}

/// Extract the bare ref id from `@e7`, `ref=e7` or `e7`.
///
/// Returns `None` when the input does not look like a ref, so that ordinary
/// selectors such as `em` or `#e7` pass through untouched.
pub fn parse_ref(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    let id = trimmed
        .strip_prefix('@')
        .or_else(|| trimmed.strip_prefix("ref="))
        .unwrap_or(trimmed);

    let digits = id.strip_prefix('e')?;
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(role: &str, name: &str) -> RefEntry {
        RefEntry {
            selector: format!("role={}[name=\"{}\"]", role, name),
            role: role.to_string(),
            name: Some(name.to_string()),
            nth: None,
        }
    }

    #[test]
    fn test_parse_ref_forms() {
        assert_eq!(parse_ref("@e7"), Some("e7"));
        assert_eq!(parse_ref("ref=e7"), Some("e7"));
        assert_eq!(parse_ref("e7"), Some("e7"));
        assert_eq!(parse_ref(" @e12 "), Some("e12"));
    }

    #[test]
    fn test_parse_ref_rejects_selectors() {
        assert_eq!(parse_ref("em"), None);
        assert_eq!(parse_ref("#e7"), None);
        assert_eq!(parse_ref("e"), None);
        assert_eq!(parse_ref("@button"), None);
        assert_eq!(parse_ref("e7.x"), None);
    }

    #[test]
    fn test_ref_map_preserves_insertion_order() {
        let mut refs = RefMap::new();
        for i in 1..=12 {
            refs.insert(format!("e{}", i), entry("button", &format!("b{}", i)));
        }
        let ids: Vec<&str> = refs.iter().map(|(id, _)| id).collect();
        assert_eq!(ids[1], "e2");
        assert_eq!(ids[9], "e10");

        let json = serde_json::to_string(&refs).unwrap();
        let e2 = json.find("\"e2\"").unwrap();
        let e10 = json.find("\"e10\"").unwrap();
        assert!(e2 < e10);
    }

    #[test]
    fn test_ref_map_lookup_accepts_any_form() {
        let mut refs = RefMap::new();
        refs.insert("e3".to_string(), entry("link", "Docs"));
        assert!(refs.get("@e3").is_some());
        assert!(refs.get("ref=e3").is_some());
        assert!(refs.get("e3").is_some());
        assert!(refs.get("e4").is_none());
    }

    #[test]
    fn test_entry_serialization_skips_absent_fields() {
        let value = serde_json::to_value(entry("button", "OK")).unwrap();
        assert!(value.get("nth").is_none());
        assert_eq!(value["role"], "button");
    }
}
