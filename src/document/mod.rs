//! Documents handed to the index writer.
//!
//! A [`Document`] is the projection of one host record: the indexed fields
//! plus the record identifier stored under [`RID`]. Documents are built fresh
//! for every write and owned by the writer call that consumes them.

#[allow(clippy::module_inception)]
pub mod document;
pub mod field_value;

pub use document::{Document, DocumentBuilder};
pub use field_value::FieldValue;

/// Name of the field holding the record identifier.
///
/// Upserts and deletes are keyed on this field.
pub const RID: &str = "RID";
