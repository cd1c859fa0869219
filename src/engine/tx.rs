//! Staged index changes of one host transaction.
//!
//! Nothing staged here is visible to other readers. The buffer is applied to
//! the writer in one step when the transaction commits.

use ahash::AHashSet;

use crate::document::{Document, RID};
use crate::error::{LucernaError, Result};
use crate::index::term::Term;
use crate::index::writer::IndexWriter;

#[derive(Debug, Clone)]
enum TxOp {
    Upsert(Document),
    Delete(String),
    Clear,
}

/// Changes recorded by a transaction and not yet applied.
#[derive(Debug, Clone, Default)]
pub struct TxChanges {
    ops: Vec<TxOp>,
    updated: AHashSet<String>,
    deleted: AHashSet<String>,
    cleared: bool,
}

impl TxChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an upsert keyed by the document's `RID` field.
    pub fn put(&mut self, doc: Document) -> Result<()> {
        let rid = doc
            .rid()
            .ok_or_else(|| LucernaError::invalid_argument(format!("document has no {RID} field")))?
            .to_string();

        self.deleted.remove(&rid);
        self.updated.insert(rid);
        self.ops.push(TxOp::Upsert(doc));
        Ok(())
    }

    /// Stage removal of every document of record `rid`.
    pub fn delete<S: Into<String>>(&mut self, rid: S) {
        let rid = rid.into();
        self.updated.remove(&rid);
        self.deleted.insert(rid.clone());
        self.ops.push(TxOp::Delete(rid));
    }

    /// Stage removal of every document, including ones staged before.
    pub fn clear(&mut self) {
        self.ops.push(TxOp::Clear);
        self.updated.clear();
        self.deleted.clear();
        self.cleared = true;
    }

    /// Whether this transaction removed `rid` (directly or by clearing).
    pub fn is_deleted(&self, rid: &str) -> bool {
        self.deleted.contains(rid) || (self.cleared && !self.updated.contains(rid))
    }

    /// Whether this transaction wrote a new version of `rid`.
    pub fn is_updated(&self, rid: &str) -> bool {
        self.updated.contains(rid)
    }

    /// Documents staged and still live at the end of the transaction.
    pub fn staged_documents(&self) -> impl Iterator<Item = &Document> {
        let mut seen = AHashSet::new();
        let mut live: Vec<&Document> = Vec::new();
        for op in self.ops.iter().rev() {
            match op {
                TxOp::Upsert(doc) => {
                    if let Some(rid) = doc.rid()
                        && self.updated.contains(rid)
                        && seen.insert(rid)
                    {
                        live.push(doc);
                    }
                }
                TxOp::Delete(_) => {}
                TxOp::Clear => break,
            }
        }
        live.into_iter().rev()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Replay the staged operations in order.
    pub(crate) fn apply_to(self, writer: &mut IndexWriter) -> Result<()> {
        for op in self.ops {
            match op {
                TxOp::Upsert(doc) => {
                    let term = match doc.rid() {
                        Some(rid) => Term::new(RID, rid),
                        None => continue,
                    };
                    writer.update_document(&term, doc)?;
                }
                TxOp::Delete(rid) => writer.delete_documents(&Term::new(RID, rid))?,
                TxOp::Clear => writer.delete_all()?,
            }
        }
        Ok(())
    }
}
