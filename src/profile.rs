//! Component Profile - Flat Attribute Snapshot
//!
//! One profile describes one configured component instance. Values are
//! scalars only; the map is immutable for the duration of a generation run.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;

/// A scalar profile attribute.
///
/// `Null` is accepted on input but treated as "attribute absent" everywhere:
/// conditions referencing it do not match and placeholders stay TBD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// String form used for equality comparison: rendered, then trimmed.
    /// Comparison is case-sensitive; numbers use their canonical rendering,
    /// so a numeric `1` matches the condition literal `1`.
    pub fn normalized(&self) -> String {
        self.to_string().trim().to_string()
    }

    /// Numeric view for comparison conditions. Text values that parse as a
    /// number count as numeric; booleans and nulls do not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => n.as_f64(),
            AttributeValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(Number::from(n))
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        match Number::from_f64(n) {
            Some(num) => AttributeValue::Number(num),
            None => AttributeValue::Null,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

/// Flat attribute map describing one component instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    values: BTreeMap<String, AttributeValue>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up an attribute. Explicit `null` values read as absent.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Best-effort inference of the primary tag field: the first `*_tag`
    /// key (keys iterate sorted) that carries a non-empty value.
    pub fn infer_tag_field(&self) -> Option<&str> {
        self.values
            .iter()
            .filter(|(k, v)| k.ends_with("_tag") && !v.is_null() && !v.normalized().is_empty())
            .map(|(k, _)| k.as_str())
            .next()
    }

    /// The trimmed tag value for a field, if present and non-empty.
    pub fn tag_value(&self, tag_field: &str) -> Option<String> {
        self.get(tag_field)
            .map(|v| v.normalized())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_mixed_scalars() {
        let profile: Profile = serde_json::from_str(
            r#"{"valve_tag": "FCV-101", "design_pressure": 150.5, "seismic": 1, "fail_safe": true, "notes": null}"#,
        )
        .unwrap();

        assert_eq!(
            profile.get("valve_tag"),
            Some(&AttributeValue::Text("FCV-101".to_string()))
        );
        assert_eq!(profile.get("design_pressure").unwrap().as_number(), Some(150.5));
        assert_eq!(profile.get("fail_safe"), Some(&AttributeValue::Bool(true)));
        // null reads as absent
        assert_eq!(profile.get("notes"), None);
        assert!(!profile.contains("notes"));
    }

    #[test]
    fn numeric_rendering_is_lossless() {
        let profile: Profile =
            serde_json::from_str(r#"{"pressure": 150, "ratio": 0.125}"#).unwrap();
        assert_eq!(profile.get("pressure").unwrap().to_string(), "150");
        assert_eq!(profile.get("ratio").unwrap().to_string(), "0.125");
    }

    #[test]
    fn normalized_trims_text() {
        let v = AttributeValue::Text("  motor  ".to_string());
        assert_eq!(v.normalized(), "motor");
    }

    #[test]
    fn text_numbers_are_numeric() {
        let v = AttributeValue::Text("12".to_string());
        assert_eq!(v.as_number(), Some(12.0));
        let v = AttributeValue::Text("abc".to_string());
        assert_eq!(v.as_number(), None);
    }

    #[test]
    fn infers_first_tag_field() {
        let mut profile = Profile::new();
        profile.set("pump_tag", "P-001");
        profile.set("aux_tag", "A-9");
        profile.set("size", 4_i64);
        // BTreeMap iterates sorted: aux_tag before pump_tag
        assert_eq!(profile.infer_tag_field(), Some("aux_tag"));
    }

    #[test]
    fn tag_value_trims_and_rejects_empty() {
        let mut profile = Profile::new();
        profile.set("valve_tag", "  FCV-101 ");
        profile.set("blank_tag", "   ");
        assert_eq!(profile.tag_value("valve_tag").as_deref(), Some("FCV-101"));
        assert_eq!(profile.tag_value("blank_tag"), None);
        assert_eq!(profile.tag_value("missing"), None);
    }
}
