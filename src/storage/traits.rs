//! Storage traits shared by the memory and file backends.

use std::io::{Read, Seek, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{LucernaError, Result};

/// A flat namespace of named files bound to one index.
///
/// Implementations must be safe to share between the writer, the reader pool
/// and the background commit task.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open a file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing, truncating any existing content.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Get the size of a file in bytes.
    fn file_size(&self, name: &str) -> Result<u64>;

    /// Rename a file, replacing the target if it exists.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Make previous writes durable.
    fn sync(&self) -> Result<()>;

    /// Close the storage. Later operations fail with [`StorageError::StorageClosed`].
    fn close(&self) -> Result<()>;

    /// Whether [`Storage::close`] has been called.
    fn is_closed(&self) -> bool;

    /// Human-readable location used in log messages.
    fn describe(&self) -> String;
}

/// Readable handle to a stored file.
pub trait StorageInput: Read + Seek + Send + std::fmt::Debug {
    /// Get the size of the input.
    fn size(&self) -> Result<u64>;
}

/// Writable handle to a stored file.
///
/// Content becomes visible to readers once the output is closed.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush buffers and sync to the backing medium.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Bytes written so far.
    fn position(&self) -> u64;

    /// Flush and publish the file.
    fn close(&mut self) -> Result<()>;
}

/// Configuration shared by storage backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Buffer size for file I/O in bytes.
    pub buffer_size: usize,

    /// Sync every file to disk when it is closed.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            buffer_size: 65536,
            sync_writes: false,
        }
    }
}

/// Storage-level failures.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Checksum mismatch in {0}")]
    Corrupted(String),

    #[error("Storage is closed")]
    StorageClosed,
}

impl From<StorageError> for LucernaError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::StorageClosed => LucernaError::closed(err.to_string()),
            other => LucernaError::storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();

        assert_eq!(config.buffer_size, 65536);
        assert!(!config.sync_writes);
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: LucernaError = StorageError::FileNotFound("_1.seg".to_string()).into();
        assert_eq!(err.to_string(), "Storage error: File not found: _1.seg");

        let err: LucernaError = StorageError::StorageClosed.into();
        assert!(matches!(err, LucernaError::Closed(_)));
    }
}
