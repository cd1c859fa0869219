//! Immutable segments: stored documents plus positional postings.
//!
//! A segment is written once (from the writer's RAM buffer or by a merge) and
//! never modified afterwards. Deletions live next to it in a bitset owned by
//! the writer and snapshotted into every reader.

use std::collections::HashMap;
use std::sync::Arc;

use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Result;
use crate::storage::{Storage, read_checksummed, write_checksummed};

/// Segment-local document number.
pub type DocId = u32;

/// Occurrences of one term in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocId,
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn term_freq(&self) -> usize {
        self.positions.len()
    }
}

/// field -> term -> postings sorted by doc id.
pub type FieldPostings = HashMap<String, HashMap<String, Vec<Posting>>>;

/// The serialized body of a segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentData {
    pub name: String,
    pub docs: Vec<Document>,
    pub postings: FieldPostings,
}

impl SegmentData {
    pub fn file_name(name: &str) -> String {
        format!("{name}.seg")
    }

    pub fn max_doc(&self) -> usize {
        self.docs.len()
    }

    /// Postings of `text` in `field`.
    pub fn postings(&self, field: &str, text: &str) -> Option<&[Posting]> {
        self.postings
            .get(field)
            .and_then(|terms| terms.get(text))
            .map(Vec::as_slice)
    }

    /// Postings of `text` in every field that contains it.
    pub fn postings_any_field<'a>(
        &'a self,
        text: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a [Posting])> + 'a {
        self.postings.iter().filter_map(move |(field, terms)| {
            terms
                .get(text)
                .map(|postings| (field.as_str(), postings.as_slice()))
        })
    }

    /// Persist this segment to `storage`.
    pub fn write(&self, storage: &dyn Storage) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        write_checksummed(storage, &Self::file_name(&self.name), &bytes)
    }

    /// Load the segment called `name` from `storage`.
    pub fn read(storage: &dyn Storage, name: &str) -> Result<Self> {
        let bytes = read_checksummed(storage, &Self::file_name(name))?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// Build a segment from `docs` and `postings`, skipping the documents
    /// flagged in `deleted` and renumbering the rest.
    pub fn compact(name: String, sources: &[(&SegmentData, &BitVec)]) -> SegmentData {
        let mut docs = Vec::new();
        let mut postings: FieldPostings = HashMap::new();

        for (source, deleted) in sources {
            let mut remap: Vec<Option<DocId>> = Vec::with_capacity(source.docs.len());
            for (old, doc) in source.docs.iter().enumerate() {
                if deleted.get(old).unwrap_or(false) {
                    remap.push(None);
                } else {
                    remap.push(Some(docs.len() as DocId));
                    docs.push(doc.clone());
                }
            }

            for (field, terms) in &source.postings {
                let target = postings.entry(field.clone()).or_default();
                for (term, list) in terms {
                    let remapped = list.iter().filter_map(|posting| {
                        remap[posting.doc as usize].map(|doc| Posting {
                            doc,
                            positions: posting.positions.clone(),
                        })
                    });
                    let entry = target.entry(term.clone()).or_default();
                    entry.extend(remapped);
                    if entry.is_empty() {
                        target.remove(term);
                    }
                }
            }
        }

        postings.retain(|_, terms| !terms.is_empty());

        SegmentData {
            name,
            docs,
            postings,
        }
    }
}

/// A segment plus the deletions visible to one reader.
#[derive(Debug, Clone)]
pub struct SegmentReader {
    data: Arc<SegmentData>,
    deleted: Arc<BitVec>,
    num_deleted: usize,
}

impl SegmentReader {
    pub fn new(data: Arc<SegmentData>, deleted: Arc<BitVec>) -> Self {
        let num_deleted = deleted.iter().filter(|d| *d).count();
        SegmentReader {
            data,
            deleted,
            num_deleted,
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn data(&self) -> &SegmentData {
        &self.data
    }

    pub fn max_doc(&self) -> usize {
        self.data.max_doc()
    }

    pub fn num_docs(&self) -> usize {
        self.max_doc() - self.num_deleted
    }

    pub fn is_deleted(&self, doc: DocId) -> bool {
        self.deleted.get(doc as usize).unwrap_or(false)
    }

    pub fn document(&self, doc: DocId) -> Option<&Document> {
        self.data.docs.get(doc as usize)
    }

    /// Live documents in doc id order.
    pub fn live_docs(&self) -> impl Iterator<Item = DocId> + '_ {
        (0..self.max_doc() as DocId).filter(|doc| !self.is_deleted(*doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RID;
    use crate::storage::MemoryStorage;

    fn sample() -> SegmentData {
        let mut postings: FieldPostings = HashMap::new();
        let text = postings.entry("text".to_string()).or_default();
        text.insert(
            "hello".to_string(),
            vec![
                Posting { doc: 0, positions: vec![0] },
                Posting { doc: 1, positions: vec![0, 2] },
            ],
        );
        text.insert("world".to_string(), vec![Posting { doc: 1, positions: vec![1] }]);

        SegmentData {
            name: "_0".to_string(),
            docs: vec![
                Document::builder().add_text(RID, "#1:0").build(),
                Document::builder().add_text(RID, "#1:1").build(),
            ],
            postings,
        }
    }

    #[test]
    fn test_write_and_read() {
        let storage = MemoryStorage::new();
        let segment = sample();
        segment.write(&storage).unwrap();

        assert!(storage.file_exists("_0.seg"));
        let loaded = SegmentData::read(&storage, "_0").unwrap();
        assert_eq!(loaded.max_doc(), 2);
        assert_eq!(loaded.postings("text", "hello").unwrap().len(), 2);
    }

    #[test]
    fn test_compact_drops_deleted_and_renumbers() {
        let segment = sample();
        let mut deleted = BitVec::from_elem(2, false);
        deleted.set(0, true);

        let compacted = SegmentData::compact("_1".to_string(), &[(&segment, &deleted)]);

        assert_eq!(compacted.max_doc(), 1);
        assert_eq!(compacted.docs[0].rid(), Some("#1:1"));
        let hello = compacted.postings("text", "hello").unwrap();
        assert_eq!(hello, &[Posting { doc: 0, positions: vec![0, 2] }]);
    }

    #[test]
    fn test_reader_live_docs() {
        let mut deleted = BitVec::from_elem(2, false);
        deleted.set(1, true);
        let reader = SegmentReader::new(Arc::new(sample()), Arc::new(deleted));

        assert_eq!(reader.num_docs(), 1);
        assert!(reader.is_deleted(1));
        assert_eq!(reader.live_docs().collect::<Vec<_>>(), vec![0]);
        assert_eq!(reader.data().postings_any_field("world").count(), 1);
    }
}
