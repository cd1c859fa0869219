//! Document structure.
//!
//! ```
//! use lucerna::document::{Document, RID};
//!
//! let doc = Document::builder()
//!     .add_text(RID, "#1:0")
//!     .add_text("text", "hello world")
//!     .build();
//!
//! assert_eq!(doc.rid(), Some("#1:0"));
//! assert_eq!(doc.len(), 2);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::RID;
use crate::document::field_value::FieldValue;

/// A flexible collection of named field values.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Document {
    fields: HashMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            fields: HashMap::new(),
        }
    }

    /// Add or replace a field.
    pub fn add_field<S: Into<String>>(&mut self, name: S, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text of a field, if it is a text field.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    /// The record identifier, if present.
    pub fn rid(&self) -> Option<&str> {
        self.get_text(RID)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Field names in sorted order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn fields(&self) -> &HashMap<String, FieldValue> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }
}

/// Fluent builder for [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    pub fn add_text<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document
            .add_field(name, FieldValue::Text(value.into()));
        self
    }

    pub fn add_integer<S: Into<String>>(mut self, name: S, value: i64) -> Self {
        self.document.add_field(name, FieldValue::Integer(value));
        self
    }

    pub fn add_float<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.document.add_field(name, FieldValue::Float(value));
        self
    }

    pub fn add_boolean<S: Into<String>>(mut self, name: S, value: bool) -> Self {
        self.document.add_field(name, FieldValue::Boolean(value));
        self
    }

    pub fn add_datetime<S: Into<String>>(
        mut self,
        name: S,
        value: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        self.document.add_field(name, FieldValue::DateTime(value));
        self
    }

    pub fn add_field<S: Into<String>>(mut self, name: S, value: FieldValue) -> Self {
        self.document.add_field(name, value);
        self
    }

    pub fn build(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let doc = Document::builder()
            .add_text(RID, "#3:7")
            .add_text("name", "Rome")
            .add_integer("population", 2_800_000)
            .add_boolean("capital", true)
            .build();

        assert_eq!(doc.rid(), Some("#3:7"));
        assert_eq!(doc.get_text("name"), Some("Rome"));
        assert_eq!(doc.field_names(), vec!["RID", "capital", "name", "population"]);
        assert!(doc.get_text("population").is_none());
    }

    #[test]
    fn test_replace_and_remove() {
        let mut doc = Document::new();
        assert!(doc.is_empty());
        doc.add_field("a", FieldValue::from("x"));
        doc.add_field("a", FieldValue::from("y"));
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.remove_field("a"), Some(FieldValue::from("y")));
        assert!(!doc.has_field("a"));
    }
}
