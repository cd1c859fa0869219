//! Translation between host records/keys and documents/queries.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::analyzer::Analyzer;
use crate::document::{Document, FieldValue, RID};
use crate::engine::definition::IndexDefinition;
use crate::error::{LucernaError, Result};
use crate::query::{Query, QueryParser};

/// A key handed over by the host. Composite keys are JSON arrays.
pub type IndexKey = Value;

/// Field name used when a key is indexed without a definition field.
pub const KEY_FIELD: &str = "key";

/// Identity of a host record, displayed as `#<cluster>:<position>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub cluster: i32,
    pub position: i64,
}

impl RecordId {
    pub const fn new(cluster: i32, position: i64) -> Self {
        RecordId { cluster, position }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

impl FromStr for RecordId {
    type Err = LucernaError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LucernaError::invalid_argument(format!("invalid record id '{s}'"));

        let body = s.strip_prefix('#').ok_or_else(invalid)?;
        let (cluster, position) = body.split_once(':').ok_or_else(invalid)?;
        Ok(RecordId {
            cluster: cluster.parse().map_err(|_| invalid())?,
            position: position.parse().map_err(|_| invalid())?,
        })
    }
}

/// A host record: its id, class and field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub rid: RecordId,
    pub class_name: Option<String>,
    pub fields: serde_json::Map<String, Value>,
}

impl Record {
    pub fn new(rid: RecordId) -> Self {
        Record {
            rid,
            class_name: None,
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_class<S: Into<String>>(mut self, class_name: S) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_field<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Builds the document indexed for a key or record.
pub trait DocumentBuilder: Send + Sync {
    fn build_document(
        &self,
        definition: &IndexDefinition,
        key: &IndexKey,
        rid: &RecordId,
    ) -> Result<Document>;

    fn build_from_record(&self, definition: &IndexDefinition, record: &Record) -> Result<Document>;
}

/// Builds the native query for a key.
pub trait QueryBuilder: Send + Sync {
    /// Fails with [`LucernaError::QueryParse`] when the key text is malformed.
    fn build_query(
        &self,
        definition: &IndexDefinition,
        key: &IndexKey,
        analyzer: &Arc<dyn Analyzer>,
    ) -> Result<Box<dyn Query>>;
}

/// Maps key parts onto the definition's fields, in order.
#[derive(Debug, Clone, Default)]
pub struct DefaultDocumentBuilder;

impl DefaultDocumentBuilder {
    pub fn new() -> Self {
        DefaultDocumentBuilder
    }
}

impl DocumentBuilder for DefaultDocumentBuilder {
    fn build_document(
        &self,
        definition: &IndexDefinition,
        key: &IndexKey,
        rid: &RecordId,
    ) -> Result<Document> {
        let mut doc = Document::new();
        doc.add_field(RID, FieldValue::Text(rid.to_string()));

        let fields = definition.fields();
        match (key, fields.len()) {
            (_, 0) => add_value(&mut doc, KEY_FIELD, key),
            (Value::Array(parts), n) if n > 1 => {
                if parts.len() > n {
                    return Err(LucernaError::invalid_argument(format!(
                        "key has {} parts but the index covers {n} fields",
                        parts.len()
                    )));
                }
                for (field, part) in fields.iter().zip(parts) {
                    add_value(&mut doc, field, part);
                }
            }
            _ => add_value(&mut doc, &fields[0], key),
        }
        Ok(doc)
    }

    fn build_from_record(&self, definition: &IndexDefinition, record: &Record) -> Result<Document> {
        let mut doc = Document::new();
        doc.add_field(RID, FieldValue::Text(record.rid.to_string()));

        for field in definition.fields() {
            if let Some(value) = record.fields.get(field) {
                add_value(&mut doc, field, value);
            }
        }
        Ok(doc)
    }
}

fn add_value(doc: &mut Document, field: &str, value: &Value) {
    let value = match value {
        Value::Null => return,
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Bool(b) => FieldValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => FieldValue::Float(n.as_f64().unwrap_or_default()),
        },
        Value::Array(items) => FieldValue::Text(
            items
                .iter()
                .map(key_text)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        Value::Object(_) => FieldValue::Text(value.to_string()),
    };
    doc.add_field(field, value);
}

/// Textual form of a key as seen by the query parser.
pub fn key_text(key: &IndexKey) -> String {
    match key {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(key_text).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

/// Parses the key text as a classic query against every field.
///
/// A key wrapped in double quotes, as the host SQL layer passes it, loses the
/// first quote and everything from the last one on.
#[derive(Debug, Clone, Default)]
pub struct SimpleQueryBuilder;

impl SimpleQueryBuilder {
    pub fn new() -> Self {
        SimpleQueryBuilder
    }

    pub fn query_text(key: &IndexKey) -> String {
        let text = key_text(key);
        let text = text.trim();
        let text = text.replacen('"', "", 1);
        match text.rfind('"') {
            Some(end) => text[..end].to_string(),
            None => text,
        }
    }
}

impl QueryBuilder for SimpleQueryBuilder {
    fn build_query(
        &self,
        _definition: &IndexDefinition,
        key: &IndexKey,
        analyzer: &Arc<dyn Analyzer>,
    ) -> Result<Box<dyn Query>> {
        QueryParser::new(Arc::clone(analyzer))
            .with_default_field("")
            .parse(&Self::query_text(key))
    }
}
