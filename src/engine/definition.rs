//! Index definitions and descriptors handed over by the host.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::capability::IndexCapabilities;

/// Free-form index metadata (analyzer names, flags).
pub type Metadata = serde_json::Map<String, Value>;

/// Host-side type of an indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    DateTime,
    Binary,
    Link,
}

/// Which class and fields an index covers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    class_name: Option<String>,
    fields: Vec<String>,
    types: HashMap<String, KeyType>,
}

impl IndexDefinition {
    pub fn new<S: Into<String>>(class_name: S) -> Self {
        IndexDefinition {
            class_name: Some(class_name.into()),
            ..Self::default()
        }
    }

    /// A definition not bound to a class (manual index).
    pub fn manual() -> Self {
        Self::default()
    }

    /// Append a field. Adding a field twice only updates its type.
    pub fn with_field<S: Into<String>>(mut self, name: S, key_type: KeyType) -> Self {
        let name = name.into();
        if !self.fields.contains(&name) {
            self.fields.push(name.clone());
        }
        self.types.insert(name, key_type);
        self
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Indexed fields in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field_type(&self, field: &str) -> Option<KeyType> {
        self.types.get(field).copied()
    }

    /// Field types in declaration order.
    pub fn key_types(&self) -> Vec<KeyType> {
        self.fields
            .iter()
            .filter_map(|field| self.field_type(field))
            .collect()
    }
}

/// Arguments of `create`/`load`.
///
/// Key and value codecs of ordered indexes have no counterpart here: keys are
/// analyzed text and values are record ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexCreateParams {
    pub automatic: bool,
    pub key_types: Vec<KeyType>,
    pub null_values_support: bool,
    pub key_size: usize,
}

impl Default for IndexCreateParams {
    fn default() -> Self {
        IndexCreateParams {
            automatic: true,
            key_types: vec![KeyType::String],
            null_values_support: false,
            key_size: 1,
        }
    }
}

/// Everything the engine knows about the index it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescriptor {
    pub name: String,
    pub definition: IndexDefinition,
    pub automatic: bool,
    pub key_types: Vec<KeyType>,
    pub null_values_support: bool,
    pub key_size: usize,
    pub capabilities: IndexCapabilities,
}

impl IndexDescriptor {
    pub fn new<S: Into<String>>(name: S, definition: IndexDefinition) -> Self {
        let key_types = definition.key_types();
        IndexDescriptor {
            name: name.into(),
            key_size: key_types.len().max(1),
            key_types,
            definition,
            automatic: true,
            null_values_support: false,
            capabilities: IndexCapabilities::search_only(),
        }
    }

    pub(crate) fn apply(&mut self, params: &IndexCreateParams) {
        self.automatic = params.automatic;
        self.key_types = params.key_types.clone();
        self.null_values_support = params.null_values_support;
        self.key_size = params.key_size;
    }
}
