//! Base query trait.

use std::any::Any;
use std::fmt::Debug;

use ahash::AHashMap;

use crate::error::Result;
use crate::index::segment::{DocId, SegmentReader};

/// Matching live documents of one segment with their scores.
pub type ScoredDocs = AHashMap<DocId, f32>;

/// Trait for search queries.
pub trait Query: Send + Sync + Debug {
    /// Score every live document of `segment` that matches this query.
    fn score_segment(&self, segment: &SegmentReader) -> Result<ScoredDocs>;

    /// Get a human-readable description of this query.
    fn description(&self) -> String;

    /// Clone this query.
    fn clone_box(&self) -> Box<dyn Query>;

    /// Get this query as Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The field this query is restricted to, if any.
    fn field(&self) -> Option<&str> {
        None
    }
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Inverse document frequency.
pub(crate) fn idf(doc_freq: usize, max_doc: usize) -> f32 {
    1.0 + ((max_doc as f32 + 1.0) / (doc_freq as f32 + 1.0)).ln()
}
