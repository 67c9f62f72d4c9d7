use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One configuration value: a scalar, a sequence or a nested mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<ConfigValue>),
    Map(ConfigDocument),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConfigValue::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigDocument> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<u64> for ConfigValue {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(ConfigValue::Int)
            .unwrap_or(ConfigValue::Float(v as f64))
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(v: Vec<T>) -> Self {
        ConfigValue::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ConfigValue::Null)
    }
}

impl From<ConfigDocument> for ConfigValue {
    fn from(v: ConfigDocument) -> Self {
        ConfigValue::Map(v)
    }
}

/// One configuration layer: string keys to [`ConfigValue`]s.
///
/// Documents are never edited in place by the resolvers; [`merged`](Self::merged)
/// and [`diff`](Self::diff) always build a new document. Keys are kept sorted so
/// the persisted YAML is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument(BTreeMap<String, ConfigValue>);

impl ConfigDocument {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// String at `key`; `None` when absent, null or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(ConfigValue::as_u64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Recursive merge of `overlay` over `self`.
    ///
    /// A mapping over a mapping merges key by key; any other overlay value,
    /// sequences included, replaces the base value wholesale. Keys missing
    /// from `overlay` keep the base value.
    pub fn merged(&self, overlay: &ConfigDocument) -> ConfigDocument {
        let mut out = self.0.clone();
        for (key, value) in &overlay.0 {
            let next = match (out.get(key), value) {
                (Some(ConfigValue::Map(base)), ConfigValue::Map(over)) => {
                    ConfigValue::Map(base.merged(over))
                }
                _ => value.clone(),
            };
            out.insert(key.clone(), next);
        }
        ConfigDocument(out)
    }

    /// Keys of `self` whose value is absent from or differs in `reference`.
    ///
    /// Comparison is structural, so nested mappings and sequences compare deeply.
    pub fn diff(&self, reference: &ConfigDocument) -> ConfigDocument {
        self.0
            .iter()
            .filter(|(k, v)| reference.0.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigDocument {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        ConfigDocument(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pairs: &[(&str, ConfigValue)]) -> ConfigDocument {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn merge_overlay_wins_and_absent_keys_fall_through() {
        let base = doc(&[("threads", 4i64.into()), ("mode", "auto".into())]);
        let overlay = doc(&[("threads", 8i64.into())]);

        let merged = base.merged(&overlay);
        assert_eq!(merged.get_u64("threads"), Some(8));
        assert_eq!(merged.get_str("mode"), Some("auto"));
    }

    #[test]
    fn merge_nested_preserves_siblings() {
        let base = doc(&[(
            "a",
            doc(&[("x", 0i64.into()), ("y", 2i64.into())]).into(),
        )]);
        let overlay = doc(&[("a", doc(&[("x", 1i64.into())]).into())]);

        let merged = base.merged(&overlay);
        let expected = doc(&[(
            "a",
            doc(&[("x", 1i64.into()), ("y", 2i64.into())]).into(),
        )]);
        assert_eq!(merged, expected);
    }

    #[test]
    fn merge_replaces_sequences_wholesale() {
        let base = doc(&[("intList", vec!["a.bed", "b.bed"].into())]);
        let overlay = doc(&[("intList", vec!["c.bed"].into())]);

        let merged = base.merged(&overlay);
        assert_eq!(merged.get("intList"), Some(&vec!["c.bed"].into()));
    }

    #[test]
    fn merge_scalar_over_map_replaces() {
        let base = doc(&[("a", doc(&[("x", 0i64.into())]).into())]);
        let overlay = doc(&[("a", ConfigValue::Null)]);

        assert_eq!(base.merged(&overlay).get("a"), Some(&ConfigValue::Null));
    }

    #[test]
    fn merge_does_not_touch_inputs() {
        let base = doc(&[("k", 1i64.into())]);
        let overlay = doc(&[("k", 2i64.into())]);
        let _ = base.merged(&overlay);

        assert_eq!(base.get_u64("k"), Some(1));
        assert_eq!(overlay.get_u64("k"), Some(2));
    }

    #[test]
    fn layering_precedence() {
        let l1 = doc(&[("a", 1i64.into()), ("b", 1i64.into()), ("c", 1i64.into())]);
        let l2 = doc(&[("b", 2i64.into()), ("c", 2i64.into())]);
        let l3 = doc(&[("c", 3i64.into())]);

        let resolved = l1.merged(&l2).merged(&l3);
        assert_eq!(resolved.get_u64("a"), Some(1));
        assert_eq!(resolved.get_u64("b"), Some(2));
        assert_eq!(resolved.get_u64("c"), Some(3));
    }

    #[test]
    fn diff_keeps_changed_and_new_keys_only() {
        let reference = doc(&[("threads", 4i64.into()), ("mode", "auto".into())]);
        let candidate = doc(&[
            ("threads", 8i64.into()),
            ("mode", "auto".into()),
            ("genome", "mm10".into()),
        ]);

        let d = candidate.diff(&reference);
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["genome", "threads"]);
    }

    #[test]
    fn diff_compares_nested_values_deeply() {
        let reference = doc(&[("a", doc(&[("x", 1i64.into())]).into())]);
        let same = doc(&[("a", doc(&[("x", 1i64.into())]).into())]);
        let changed = doc(&[("a", doc(&[("x", 2i64.into())]).into())]);

        assert!(same.diff(&reference).is_empty());
        assert_eq!(changed.diff(&reference).len(), 1);
    }

    #[test]
    fn diff_then_merge_reproduces_candidate() {
        let reference = doc(&[
            ("threads", 4i64.into()),
            ("mode", "auto".into()),
            ("trim", false.into()),
        ]);
        let candidate = doc(&[
            ("threads", 8i64.into()),
            ("mode", "auto".into()),
            ("extra", vec![1i64, 2].into()),
        ]);

        let roundtrip = reference.merged(&candidate.diff(&reference));
        for (k, v) in candidate.iter() {
            assert_eq!(roundtrip.get(k), Some(v), "key {k}");
        }
        assert_eq!(roundtrip.get("trim"), Some(&false.into()));
    }

    #[test]
    fn yaml_scalars_keep_their_types() {
        let parsed: ConfigDocument =
            serde_yaml::from_str("a: 1\nb: 1.5\nc: true\nd: text\ne: ~\nf: [1, x]\ng: {h: 2}\n")
                .unwrap();

        assert_eq!(parsed.get("a"), Some(&ConfigValue::Int(1)));
        assert_eq!(parsed.get("b"), Some(&ConfigValue::Float(1.5)));
        assert_eq!(parsed.get("c"), Some(&ConfigValue::Bool(true)));
        assert_eq!(parsed.get_str("d"), Some("text"));
        assert_eq!(parsed.get("e"), Some(&ConfigValue::Null));
        assert_eq!(
            parsed.get("f"),
            Some(&ConfigValue::Seq(vec![ConfigValue::Int(1), "x".into()]))
        );
        assert_eq!(
            parsed.get("g").and_then(ConfigValue::as_map).and_then(|m| m.get_u64("h")),
            Some(2)
        );
    }
}
