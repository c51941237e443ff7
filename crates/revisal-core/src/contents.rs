use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exclude-list entry that removes every attribute
pub const WILDCARD: &str = "*";

/// Ordered attribute map captured into a version
///
/// Stores raw (pre-cast) attribute values as JSON values. Backed by a
/// BTreeMap so that serialized JSON is stable across runs, which the diff
/// engine relies on when encoding non-string values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Contents {
    data: BTreeMap<String, serde_json::Value>,
}

impl Contents {
    /// Create a new empty Contents instance
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Set a value by key
    pub fn insert(&mut self, key: String, value: serde_json::Value) {
        self.data.insert(key, value);
    }

    /// Remove a value by key
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Check if a key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Get all keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Iterate over entries in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.data.iter()
    }

    /// Get the number of attributes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if there are no attributes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Overlay `other` onto self; keys in `other` win
    pub fn merge(&mut self, other: &Contents) {
        for (key, value) in &other.data {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// Restrict to the given keys
    pub fn only<S: AsRef<str>>(&self, keys: &[S]) -> Contents {
        let mut data = BTreeMap::new();
        for key in keys {
            if let Some(value) = self.data.get(key.as_ref()) {
                data.insert(key.as_ref().to_string(), value.clone());
            }
        }
        Contents { data }
    }

    /// Remove the given keys; a `"*"` entry removes everything
    pub fn except<S: AsRef<str>>(&self, keys: &[S]) -> Contents {
        if keys.iter().any(|k| k.as_ref() == WILDCARD) {
            return Contents::new();
        }
        let mut data = self.data.clone();
        for key in keys {
            data.remove(key.as_ref());
        }
        Contents { data }
    }
}

impl From<BTreeMap<String, serde_json::Value>> for Contents {
    fn from(data: BTreeMap<String, serde_json::Value>) -> Self {
        Self { data }
    }
}

impl From<Contents> for BTreeMap<String, serde_json::Value> {
    fn from(contents: Contents) -> Self {
        contents.data
    }
}

impl FromIterator<(String, serde_json::Value)> for Contents {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Contents {
        [
            ("title".to_string(), json!("v1")),
            ("content".to_string(), json!("v1 content")),
            ("count".to_string(), json!(3)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_merge_right_side_wins() {
        let mut base = sample();
        let overlay: Contents = [("title".to_string(), json!("v2"))].into_iter().collect();

        base.merge(&overlay);

        assert_eq!(base.get("title"), Some(&json!("v2")));
        assert_eq!(base.get("content"), Some(&json!("v1 content")));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn test_only_ignores_missing_keys() {
        let restricted = sample().only(&["title", "missing"]);
        assert_eq!(restricted.len(), 1);
        assert!(restricted.contains_key("title"));
    }

    #[test]
    fn test_except_removes_keys() {
        let remaining = sample().except(&["count"]);
        assert_eq!(remaining.len(), 2);
        assert!(!remaining.contains_key("count"));
    }

    #[test]
    fn test_except_wildcard_removes_everything() {
        let remaining = sample().except(&[WILDCARD]);
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_serialization_is_a_plain_map() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"content":"v1 content","count":3,"title":"v1"}"#
        );
    }
}
