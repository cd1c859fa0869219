//! The secondary-index contract the host storage engine programs against.

use crate::engine::builder::{IndexKey, RecordId};
use crate::engine::capability::IndexCapabilities;
use crate::engine::definition::IndexCreateParams;
use crate::error::Result;
use crate::index::Generation;

/// Expands one stored value into the values a caller wants to see.
pub trait ValuesTransformer: Send + Sync {
    fn transform(&self, value: RecordId) -> Vec<RecordId>;
}

/// Cursor over `(key, value)` entries.
pub type IndexCursor = Box<dyn Iterator<Item = (IndexKey, RecordId)> + Send>;

/// Cursor over keys.
pub type IndexKeyCursor = Box<dyn Iterator<Item = IndexKey> + Send>;

/// An empty entry cursor.
pub fn empty_cursor() -> IndexCursor {
    Box::new(std::iter::empty())
}

/// Operations every secondary index engine offers.
///
/// Ordered operations are part of the contract for every engine; an engine
/// whose [`capabilities`](IndexEngine::capabilities) are search-only answers
/// them with `None` or an empty cursor instead of an error.
pub trait IndexEngine: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> u32;

    fn capabilities(&self) -> IndexCapabilities;

    fn has_range_query_support(&self) -> bool {
        self.capabilities().supports_range_queries()
    }

    fn create(&self, params: IndexCreateParams) -> Result<()>;

    fn load(&self, name: &str, params: IndexCreateParams) -> Result<()>;

    /// Close the index and remove its files.
    fn delete(&self) -> Result<()>;

    /// Remove the files of index `name` without opening it.
    fn delete_without_load(&self, name: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    fn size(&self) -> u64;

    fn size_with(&self, transformer: &dyn ValuesTransformer) -> u64;

    fn put(&self, key: &IndexKey, rid: &RecordId) -> Result<Generation>;

    fn get(&self, key: &IndexKey) -> Result<Vec<RecordId>>;

    fn contains(&self, key: &IndexKey) -> Result<bool>;

    fn remove(&self, key: &IndexKey) -> Result<bool>;

    fn remove_value(&self, key: &IndexKey, rid: &RecordId) -> Result<bool>;

    fn first_key(&self) -> Option<IndexKey>;

    fn last_key(&self) -> Option<IndexKey>;

    fn iterate_entries_between(
        &self,
        from: &IndexKey,
        from_inclusive: bool,
        to: &IndexKey,
        to_inclusive: bool,
        ascending: bool,
        transformer: Option<&dyn ValuesTransformer>,
    ) -> IndexCursor;

    fn iterate_entries_major(
        &self,
        from: &IndexKey,
        inclusive: bool,
        ascending: bool,
        transformer: Option<&dyn ValuesTransformer>,
    ) -> IndexCursor;

    fn iterate_entries_minor(
        &self,
        to: &IndexKey,
        inclusive: bool,
        ascending: bool,
        transformer: Option<&dyn ValuesTransformer>,
    ) -> IndexCursor;

    fn cursor(&self, transformer: Option<&dyn ValuesTransformer>) -> IndexCursor;

    fn desc_cursor(&self, transformer: Option<&dyn ValuesTransformer>) -> IndexCursor;

    fn key_cursor(&self) -> IndexKeyCursor;

    /// Release every resource. Calling it again does nothing.
    fn close(&self);
}
