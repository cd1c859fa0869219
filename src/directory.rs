//! Chooses where an index keeps its files.
//!
//! A disk-backed host database gets a [`FileStorage`] directory at
//! `<storage-path>/<base-dir>/<index-name>`; anything else gets a fresh
//! [`MemoryStorage`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::error::{LucernaError, Result};
use crate::storage::{FileStorage, MemoryStorage, Storage, StorageConfig};

/// Default directory, under the database storage path, holding all indexes.
pub const DEFAULT_INDEX_BASE_DIR: &str = "luceneIndexes";

/// Kind and base path of the host storage an index belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// Paginated storage on local disk rooted at `path`.
    Disk { path: PathBuf },
    /// Any non-local storage; the index lives in memory.
    Memory,
}

impl StorageLocation {
    pub fn disk<P: Into<PathBuf>>(path: P) -> Self {
        StorageLocation::Disk { path: path.into() }
    }

    pub fn is_disk(&self) -> bool {
        matches!(self, StorageLocation::Disk { .. })
    }

    /// Directory for `index_name`, or `None` for in-memory storage.
    pub fn index_path(&self, base_dir: &str, index_name: &str) -> Option<PathBuf> {
        match self {
            StorageLocation::Disk { path } => Some(path.join(base_dir).join(index_name)),
            StorageLocation::Memory => None,
        }
    }
}

fn validate_index_name(index_name: &str) -> Result<()> {
    if index_name.is_empty()
        || index_name == "."
        || index_name == ".."
        || index_name.contains(['/', '\\'])
    {
        return Err(LucernaError::open(format!(
            "invalid index name '{index_name}'"
        )));
    }
    Ok(())
}

/// Open the directory for `index_name` at `location`.
///
/// Filesystem failures are reported as [`LucernaError::Open`].
pub fn open_directory(
    location: &StorageLocation,
    base_dir: &str,
    index_name: &str,
    config: &StorageConfig,
) -> Result<Arc<dyn Storage>> {
    validate_index_name(index_name)?;

    match location.index_path(base_dir, index_name) {
        Some(path) => {
            info!("Opening file index {index_name}, path={}", path.display());
            let storage = FileStorage::new(&path, config.clone()).map_err(|e| {
                LucernaError::open(format!("cannot open {}: {e}", path.display()))
            })?;
            Ok(Arc::new(storage))
        }
        None => {
            info!("Opening RAM index {index_name}");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}

/// Recursively remove the directory of `index_name`.
///
/// Returns `true` if a directory was removed. In-memory locations have
/// nothing to remove.
pub fn remove_directory(
    location: &StorageLocation,
    base_dir: &str,
    index_name: &str,
) -> Result<bool> {
    validate_index_name(index_name)?;

    match location.index_path(base_dir, index_name) {
        Some(path) => remove_dir_if_exists(&path),
        None => Ok(false),
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            info!("Removed index directory {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
