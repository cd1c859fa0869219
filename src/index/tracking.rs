//! Generation-stamped access to the index writer.
//!
//! Every mutation runs under the writer mutex and is stamped with the next
//! generation, so generations are strictly increasing and totally ordered with
//! the writes they stand for. Opening a reader under the same mutex records
//! the generation it reflects.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::document::Document;
use crate::error::Result;
use crate::index::Generation;
use crate::index::reader::IndexReader;
use crate::index::term::Term;
use crate::index::writer::IndexWriter;
use crate::query::Query;

#[derive(Debug)]
pub struct TrackingIndexWriter {
    writer: Mutex<IndexWriter>,
    generation: AtomicU64,
}

impl TrackingIndexWriter {
    pub fn new(writer: IndexWriter) -> Self {
        TrackingIndexWriter {
            writer: Mutex::new(writer),
            generation: AtomicU64::new(0),
        }
    }

    /// Generation of the most recent mutation (0 before the first).
    pub fn generation(&self) -> Generation {
        self.generation.load(Ordering::SeqCst)
    }

    /// Run `op` under the writer lock and stamp it with a new generation.
    ///
    /// A failed operation consumes no generation.
    pub fn apply<F>(&self, op: F) -> Result<Generation>
    where
        F: FnOnce(&mut IndexWriter) -> Result<()>,
    {
        let mut writer = self.writer.lock();
        op(&mut writer)?;
        Ok(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn update_document(&self, term: &Term, doc: Document) -> Result<Generation> {
        self.apply(|writer| writer.update_document(term, doc))
    }

    pub fn add_document(&self, doc: Document) -> Result<Generation> {
        self.apply(|writer| writer.add_document(doc))
    }

    pub fn delete_documents(&self, term: &Term) -> Result<Generation> {
        self.apply(|writer| writer.delete_documents(term))
    }

    pub fn delete_by_query(&self, query: &dyn Query) -> Result<Generation> {
        self.apply(|writer| writer.delete_by_query(query))
    }

    pub fn delete_all(&self) -> Result<Generation> {
        self.apply(|writer| writer.delete_all())
    }

    /// Open a reader together with the generation it reflects.
    pub fn open_reader(&self) -> Result<(Generation, IndexReader)> {
        let mut writer = self.writer.lock();
        let generation = self.generation.load(Ordering::SeqCst);
        let reader = writer.get_reader()?;
        Ok((generation, reader))
    }

    /// Run `f` with exclusive access to the writer, without a new generation.
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut IndexWriter) -> R) -> R {
        f(&mut self.writer.lock())
    }

    pub fn commit(&self) -> Result<bool> {
        self.with_writer(|writer| writer.commit())
    }

    pub fn force_merge_deletes(&self) -> Result<()> {
        self.with_writer(|writer| writer.force_merge_deletes())
    }

    pub fn max_doc(&self) -> usize {
        self.with_writer(|writer| writer.max_doc())
    }

    pub fn is_closed(&self) -> bool {
        self.with_writer(|writer| writer.is_closed())
    }

    pub fn close(&self) -> Result<()> {
        self.with_writer(|writer| writer.close())
    }
}
