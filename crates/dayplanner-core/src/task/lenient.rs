//! Forgiving field decoders for raw task records.
//!
//! Raw records arrive from calendar feeds, older payloads and hand-edited
//! JSON. A field holding the wrong JSON type must read as "absent" instead
//! of failing the whole record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A numeric field that may arrive as a number, a numeric string or junk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
    Other(Value),
}

impl Numeric {
    /// The finite numeric value, if any.
    pub fn finite(&self) -> Option<f64> {
        let n = match self {
            Numeric::Number(n) => *n,
            Numeric::Text(s) => s.trim().parse::<f64>().ok()?,
            Numeric::Other(_) => return None,
        };
        n.is_finite().then_some(n)
    }
}

impl From<f64> for Numeric {
    fn from(n: f64) -> Self {
        Numeric::Number(n)
    }
}

impl From<u32> for Numeric {
    fn from(n: u32) -> Self {
        Numeric::Number(f64::from(n))
    }
}

impl From<u8> for Numeric {
    fn from(n: u8) -> Self {
        Numeric::Number(f64::from(n))
    }
}

impl From<i32> for Numeric {
    fn from(n: i32) -> Self {
        Numeric::Number(f64::from(n))
    }
}

impl From<&str> for Numeric {
    fn from(s: &str) -> Self {
        Numeric::Text(s.to_string())
    }
}

/// Decode any JSON scalar as an optional string; numbers are stringified,
/// empty strings, objects and arrays read as absent.
pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Decode a truthy flag: booleans, non-zero numbers, "true"/"1"/"yes".
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
