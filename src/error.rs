//! Error types for the Lucerna library.
//!
//! All errors are represented by the [`LucernaError`] enum. The variants follow the
//! failure taxonomy of the index engine:
//!
//! - [`LucernaError::Open`] - the directory or writer could not be opened. The engine
//!   stays unusable until a later `start` succeeds.
//! - [`LucernaError::Commit`] - a commit failed. Background commits log and swallow it.
//! - [`LucernaError::QueryParse`] - a key or query string could not be parsed.
//! - [`LucernaError::Closed`] - the component was used after it was closed.
//!
//! Unsupported operations (range scans, ordered cursors) are never errors; they are
//! reported through [`IndexCapabilities`](crate::engine::capability::IndexCapabilities)
//! and empty results.
//!
//! # Examples
//!
//! ```
//! use lucerna::error::{LucernaError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(LucernaError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Lucerna operations.
#[derive(Error, Debug)]
pub enum LucernaError {
    /// I/O errors (file operations, directory removal, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The index directory or writer could not be opened.
    #[error("Open error: {0}")]
    Open(String),

    /// A commit of the writer state failed.
    #[error("Commit error: {0}")]
    Commit(String),

    /// A key or query string is malformed.
    #[error("Query parse error: {0}")]
    QueryParse(String),

    /// The component has been closed.
    #[error("Closed: {0}")]
    Closed(String),

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with LucernaError.
pub type Result<T> = std::result::Result<T, LucernaError>;

impl LucernaError {
    /// Create a new open error.
    pub fn open<S: Into<String>>(msg: S) -> Self {
        LucernaError::Open(msg.into())
    }

    /// Create a new commit error.
    pub fn commit<S: Into<String>>(msg: S) -> Self {
        LucernaError::Commit(msg.into())
    }

    /// Create a new query parse error.
    pub fn query_parse<S: Into<String>>(msg: S) -> Self {
        LucernaError::QueryParse(msg.into())
    }

    /// Create a new closed error.
    pub fn closed<S: Into<String>>(msg: S) -> Self {
        LucernaError::Closed(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        LucernaError::Index(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        LucernaError::Analysis(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        LucernaError::Storage(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        LucernaError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LucernaError::Other(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        LucernaError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        LucernaError::Other(format!("Invalid configuration: {}", msg.into()))
    }

    /// Whether this error came from parsing a key or query.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, LucernaError::QueryParse(_))
    }
}

impl From<bincode::Error> for LucernaError {
    fn from(err: bincode::Error) -> Self {
        LucernaError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = LucernaError::index("Test index error");
        assert_eq!(error.to_string(), "Index error: Test index error");

        let error = LucernaError::query_parse("unbalanced quote");
        assert_eq!(error.to_string(), "Query parse error: unbalanced quote");
        assert!(error.is_parse_error());

        let error = LucernaError::commit("disk full");
        assert_eq!(error.to_string(), "Commit error: disk full");
        assert!(!error.is_parse_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = LucernaError::from(io_error);

        match error {
            LucernaError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
