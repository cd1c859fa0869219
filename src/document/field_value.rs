//! Field value types for documents.
//!
//! ```
//! use lucerna::document::field_value::FieldValue;
//!
//! let text_value = FieldValue::Text("hello".to_string());
//! assert_eq!(text_value.as_text(), Some("hello"));
//!
//! let int_value = FieldValue::Integer(42);
//! assert_eq!(int_value.to_index_string(), Some("42".to_string()));
//!
//! let text = FieldValue::Text("yes".to_string());
//! assert_eq!(text.as_boolean(), Some(true));
//! ```

use serde::{Deserialize, Serialize};

/// A value stored in a document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text content, analyzed before indexing
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Raw bytes, stored but never indexed
    Binary(Vec<u8>),
    DateTime(chrono::DateTime<chrono::Utc>),
    /// Explicit null, stored but never indexed
    Null,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            FieldValue::Text(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" | "on" => Some(true),
                "false" | "f" | "no" | "n" | "0" | "off" => Some(false),
                _ => None,
            },
            FieldValue::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Binary(data) => Some(data),
            _ => None,
        }
    }

    /// The string fed to the analyzer at index time.
    ///
    /// Binary and null values are stored only, so they yield `None`.
    pub fn to_index_string(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Boolean(b) => Some(b.to_string()),
            FieldValue::DateTime(dt) => Some(dt.to_rfc3339()),
            FieldValue::Binary(_) | FieldValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_string() {
        assert_eq!(FieldValue::Float(1.5).to_index_string(), Some("1.5".to_string()));
        assert_eq!(FieldValue::Boolean(false).to_index_string(), Some("false".to_string()));
        assert_eq!(FieldValue::Binary(vec![1, 2]).to_index_string(), None);
        assert_eq!(FieldValue::Null.to_index_string(), None);
        assert!(FieldValue::Null.is_null());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(FieldValue::from("7").as_integer(), Some(7));
        assert_eq!(FieldValue::from(true).as_boolean(), Some(true));
        assert_eq!(FieldValue::Text("off".into()).as_boolean(), Some(false));
        assert_eq!(FieldValue::from(3i64), FieldValue::Integer(3));
    }
}
