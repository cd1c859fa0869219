//! Point-in-time view over a set of segments.

use crate::document::Document;
use crate::index::segment::{DocId, SegmentReader};

/// Address of a document within one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocAddress {
    pub segment: usize,
    pub doc: DocId,
}

/// An immutable snapshot of the index.
///
/// Later writes never change what a reader sees.
#[derive(Debug, Clone, Default)]
pub struct IndexReader {
    segments: Vec<SegmentReader>,
}

impl IndexReader {
    pub fn new(segments: Vec<SegmentReader>) -> Self {
        IndexReader { segments }
    }

    pub fn segments(&self) -> &[SegmentReader] {
        &self.segments
    }

    /// Live documents.
    pub fn num_docs(&self) -> usize {
        self.segments.iter().map(SegmentReader::num_docs).sum()
    }

    /// Documents including deleted ones.
    pub fn max_doc(&self) -> usize {
        self.segments.iter().map(SegmentReader::max_doc).sum()
    }

    pub fn has_deletions(&self) -> bool {
        self.num_docs() != self.max_doc()
    }

    /// The stored document at `address`, unless it is deleted.
    pub fn document(&self, address: DocAddress) -> Option<&Document> {
        let segment = self.segments.get(address.segment)?;
        if segment.is_deleted(address.doc) {
            return None;
        }
        segment.document(address.doc)
    }
}
