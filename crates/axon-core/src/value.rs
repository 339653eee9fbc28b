//! Generic attribute values and the documented invalid sentinels
//!
//! Attribute values are typed per-class at the proxy level but stored
//! generically here. The sentinels are returned by accessors in
//! return-code mode and are distinguishable from any real device value.

use serde::{Deserialize, Serialize};

/// Invalid sentinel for string-valued attributes
pub const INVALID_STRING: &str = "!INVALID!";

/// Invalid sentinel for integer-valued attributes
pub const INVALID_INT: i64 = i64::MIN;

/// Invalid sentinel for float-valued attributes
pub const INVALID_FLOAT: f64 = -f64::MAX;

/// One attribute value as exchanged with a hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttrValue {
    /// Convert a JSON value coming off the wire. Nulls and nested
    /// structures are not attribute values and map to `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(AttrValue::Str(s.clone())),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(AttrValue::Int(i))
                } else {
                    n.as_f64().map(AttrValue::Float)
                }
            }
            serde_json::Value::Bool(b) => Some(AttrValue::Bool(*b)),
            _ => None,
        }
    }

    /// Encode for a hub write request
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::Str(s) => serde_json::Value::String(s.clone()),
            AttrValue::Int(i) => serde_json::Value::from(*i),
            AttrValue::Float(f) => {
                serde_json::Number::from_f64(*f).map(serde_json::Value::Number).unwrap_or(
                    // Non-finite floats have no JSON form; hubs expect strings then
                    serde_json::Value::String(f.to_string()),
                )
            }
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
        }
    }

    /// String form of the value, regardless of wire type
    pub fn as_string(&self) -> String {
        match self {
            AttrValue::Str(s) => s.clone(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Float(f) => f.to_string(),
            AttrValue::Bool(b) => b.to_string(),
        }
    }

    /// Integer form, if the value is or parses as one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            AttrValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            AttrValue::Str(s) => s.trim().parse().ok(),
            AttrValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Float form, if the value is or parses as one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Str(s) => s.trim().parse().ok(),
            AttrValue::Bool(_) => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        assert_eq!(
            AttrValue::from_json(&serde_json::json!("mm")),
            Some(AttrValue::Str("mm".to_string()))
        );
        assert_eq!(
            AttrValue::from_json(&serde_json::json!(42)),
            Some(AttrValue::Int(42))
        );
        assert_eq!(
            AttrValue::from_json(&serde_json::json!(12.5)),
            Some(AttrValue::Float(12.5))
        );
        assert_eq!(AttrValue::from_json(&serde_json::Value::Null), None);
        assert_eq!(AttrValue::from_json(&serde_json::json!([1, 2])), None);
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(AttrValue::Str("17".to_string()).as_i64(), Some(17));
        assert_eq!(AttrValue::Str("12.5".to_string()).as_f64(), Some(12.5));
        assert_eq!(AttrValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(AttrValue::Float(4.0).as_i64(), Some(4));
        assert_eq!(AttrValue::Float(4.5).as_i64(), None);
        assert_eq!(AttrValue::Str("lux".to_string()).as_i64(), None);
    }

    #[test]
    fn test_sentinels_are_not_real_values() {
        // A hub never reports these: the string is reserved, the numbers
        // sit at the extreme of their ranges.
        assert_eq!(INVALID_INT, i64::MIN);
        assert!(INVALID_FLOAT < -1e300);
        assert_eq!(INVALID_STRING, "!INVALID!");
    }
}
