use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Tag/label set attached to provider resources.
///
/// Ordered by key so that rendered tags and log output are deterministic.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(pub BTreeMap<String, String>);

impl Labels {
    /// Create an empty set of labels.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns `true` if no labels are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Insert or overwrite a label.
    ///
    /// Returns `self` for chaining.
    pub fn insert<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), val.into());
        self
    }

    /// Get the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Returns `true` if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate through all labels as `(&str, &str)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of `self`; keys from `other` win.
    pub fn overlay(mut self, other: &Labels) -> Self {
        for (k, v) in other.iter() {
            self.0.insert(k.to_string(), v.to_string());
        }
        self
    }

    /// Convert into a plain hash map (wire representation).
    pub fn into_hash_map(self) -> HashMap<String, String> {
        self.0.into_iter().collect()
    }
}

impl From<HashMap<String, String>> for Labels {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_prefers_other() {
        let base: Labels = [("scope", "nb-dev"), ("user", "a")].into_iter().collect();
        let top: Labels = [("user", "b")].into_iter().collect();

        let merged = base.overlay(&top);
        assert_eq!(merged.get("scope"), Some("nb-dev"));
        assert_eq!(merged.get("user"), Some("b"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn from_hash_map_keeps_all_pairs() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), "1".to_string());
        map.insert("b".to_string(), "2".to_string());

        let labels = Labels::from(map);
        assert_eq!(labels.get("a"), Some("1"));
        assert_eq!(labels.get("b"), Some("2"));
        assert_eq!(labels.clone().into_hash_map().len(), 2);
    }

    #[test]
    fn serializes_as_plain_map() {
        let labels: Labels = [("k", "v")].into_iter().collect();
        let json = serde_json::to_string(&labels).unwrap();
        assert_eq!(json, r#"{"k":"v"}"#);
    }
}
