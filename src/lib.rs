//! # Lucerna
//!
//! A near-real-time full-text secondary index engine for page-organized
//! databases.
//!
//! ## Features
//!
//! - Segment-based inverted index with positional postings
//! - Generation-stamped writes and `wait_for_generation` read-your-writes
//! - Background reopen loop and periodic commits
//! - File or in-memory index directories
//! - Classic query syntax: terms, phrases, fields, boolean operators
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use lucerna::prelude::*;
//! use serde_json::json;
//!
//! let context = EngineContext::new().unwrap();
//! let definition = IndexDefinition::new("Post").with_field("text", KeyType::String);
//! let engine = Arc::new(
//!     SearchIndexEngine::new(
//!         "Post.text",
//!         StorageLocation::Memory,
//!         definition,
//!         Metadata::new(),
//!         EngineConfig::default(),
//!         &context,
//!     )
//!     .unwrap(),
//! );
//!
//! engine.start().unwrap();
//! engine.put(&json!("hello world"), &RecordId::new(1, 0)).unwrap();
//! assert_eq!(engine.get(&json!("hello")).unwrap(), vec![RecordId::new(1, 0)]);
//! engine.close();
//! context.shutdown();
//! ```

pub mod analysis;
pub mod directory;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod lifecycle;
pub mod query;
pub mod storage;

pub mod prelude {
    pub use crate::directory::StorageLocation;
    pub use crate::document::{Document, FieldValue, RID};
    pub use crate::engine::{
        EngineConfig, EngineContext, IndexDefinition, IndexEngine, KeyType, Metadata, RecordId,
        SearchIndexEngine,
    };
    pub use crate::error::{LucernaError, Result};
    pub use crate::index::Generation;
    pub use crate::query::{Query, QueryParser};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
