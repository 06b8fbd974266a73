//! Feature values and the single-row Feature Frame

use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed cell in a Feature Frame or an encoder's category list.
///
/// Integers stay integers so that categorical encoders fitted on integer
/// columns match exactly at inference time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl FeatureValue {
    /// Numeric view of the value. `Missing` maps to NaN, text has no numeric view.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Missing => Some(f64::NAN),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Missing or a floating NaN
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Equality as used by categorical encoders: text compares exactly,
    /// numbers compare by value regardless of integer/float storage.
    pub fn same_category(&self, other: &FeatureValue) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Missing, Self::Missing) => true,
            (Self::Text(_), _) | (_, Self::Text(_)) => false,
            (Self::Missing, _) | (_, Self::Missing) => false,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "str",
            Self::Missing => "missing",
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{:?}", s),
            Self::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for FeatureValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Single-row table with named, ordered columns.
///
/// Built fresh for each request and dropped once inference returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureFrame {
    columns: Vec<String>,
    values: Vec<FeatureValue>,
}

impl FeatureFrame {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Append a column. Column order is insertion order.
    pub fn push(&mut self, column: impl Into<String>, value: FeatureValue) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    /// Look up a cell by column name
    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_deserialization_keeps_integers() {
        let values: Vec<FeatureValue> = serde_json::from_str(r#"[3, 2.5, "Yes", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FeatureValue::Int(3),
                FeatureValue::Float(2.5),
                FeatureValue::Text("Yes".into()),
                FeatureValue::Missing,
            ]
        );
    }

    #[test]
    fn test_same_category() {
        assert!(FeatureValue::Int(2).same_category(&FeatureValue::Float(2.0)));
        assert!(!FeatureValue::Text("2".into()).same_category(&FeatureValue::Int(2)));
        assert!(FeatureValue::from("Male").same_category(&FeatureValue::from("Male")));
        assert!(!FeatureValue::from("male").same_category(&FeatureValue::from("Male")));
    }

    #[test]
    fn test_frame_preserves_order() {
        let mut frame = FeatureFrame::with_capacity(2);
        frame.push("b", FeatureValue::Int(1));
        frame.push("a", FeatureValue::from("x"));

        assert_eq!(frame.columns(), &["b".to_string(), "a".to_string()]);
        assert_eq!(frame.get("a"), Some(&FeatureValue::from("x")));
        assert_eq!(frame.get("c"), None);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_missing_is_nan() {
        assert!(FeatureValue::Missing.as_f64().unwrap().is_nan());
        assert!(FeatureValue::Float(f64::NAN).is_missing());
        assert_eq!(FeatureValue::from("x").as_f64(), None);
    }
}
