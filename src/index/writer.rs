//! The single writable handle of an index.
//!
//! Documents are analyzed into a RAM buffer. The buffer becomes an immutable
//! segment when it fills up, when a near-real-time reader is opened, or when
//! the writer commits. A commit writes every new segment and then a commit
//! point (`segments_<n>.json`) naming the live segments and their deletions;
//! files no longer referenced are removed afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use ahash::AHashSet;
use bit_vec::BitVec;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::{Analyzer, analyze_field};
use crate::document::{Document, RID};
use crate::error::{LucernaError, Result};
use crate::index::reader::IndexReader;
use crate::index::segment::{DocId, FieldPostings, Posting, SegmentData, SegmentReader};
use crate::index::term::Term;
use crate::query::Query;
use crate::storage::{Storage, read_checksummed, write_checksummed};

const COMMIT_PREFIX: &str = "segments_";
const COMMIT_SUFFIX: &str = ".json";

/// Writer tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexWriterConfig {
    /// Buffered documents that trigger a segment flush.
    pub max_buffered_docs: usize,

    /// Segment count above which all segments are merged into one.
    pub max_segments: usize,
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            max_buffered_docs: 1000,
            max_segments: 10,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriterStats {
    pub docs_added: u64,
    pub delete_ops: u64,
    pub segments_flushed: u64,
    pub merges: u64,
    pub commits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CommittedSegment {
    name: String,
    max_doc: usize,
    deleted: Vec<DocId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CommitPoint {
    generation: u64,
    next_segment: u64,
    timestamp: DateTime<Utc>,
    segments: Vec<CommittedSegment>,
}

impl CommitPoint {
    fn file_name(generation: u64) -> String {
        format!("{COMMIT_PREFIX}{generation}{COMMIT_SUFFIX}")
    }

    fn parse_generation(file_name: &str) -> Option<u64> {
        file_name
            .strip_prefix(COMMIT_PREFIX)?
            .strip_suffix(COMMIT_SUFFIX)?
            .parse()
            .ok()
    }
}

#[derive(Debug, Clone)]
struct SegmentEntry {
    data: Arc<SegmentData>,
    deleted: Arc<BitVec>,
    persisted: bool,
}

impl SegmentEntry {
    fn has_deletions(&self) -> bool {
        self.deleted.any()
    }

    fn live_count(&self) -> usize {
        self.data.max_doc() - self.deleted.iter().filter(|d| *d).count()
    }
}

/// An analyzed document waiting in the RAM buffer.
#[derive(Debug, Clone)]
struct BufferedDoc {
    doc: Document,
    terms: HashMap<String, HashMap<String, Vec<u32>>>,
}

impl BufferedDoc {
    fn contains(&self, term: &Term) -> bool {
        self.terms
            .get(term.field())
            .is_some_and(|terms| terms.contains_key(term.text()))
    }
}

pub struct IndexWriter {
    storage: Arc<dyn Storage>,
    analyzer: Arc<dyn Analyzer>,
    config: IndexWriterConfig,
    keyword_fields: AHashSet<String>,
    segments: Vec<SegmentEntry>,
    buffer: Vec<BufferedDoc>,
    next_segment: u64,
    commit_generation: u64,
    dirty: bool,
    closed: bool,
    stats: WriterStats,
}

impl std::fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriter")
            .field("storage", &self.storage.describe())
            .field("config", &self.config)
            .field("segments", &self.segments.len())
            .field("buffered_docs", &self.buffer.len())
            .field("commit_generation", &self.commit_generation)
            .field("closed", &self.closed)
            .finish()
    }
}

impl IndexWriter {
    /// Open a writer on `storage`, loading the latest commit point if any.
    pub fn open(
        storage: Arc<dyn Storage>,
        analyzer: Arc<dyn Analyzer>,
        config: IndexWriterConfig,
    ) -> Result<Self> {
        let mut writer = IndexWriter {
            storage,
            analyzer,
            config,
            keyword_fields: AHashSet::from_iter([RID.to_string()]),
            segments: Vec::new(),
            buffer: Vec::new(),
            next_segment: 0,
            commit_generation: 0,
            dirty: false,
            closed: false,
            stats: WriterStats::default(),
        };

        if let Some(generation) = writer.latest_commit_generation()? {
            writer.load_commit(generation)?;
        }
        writer.delete_unreferenced_files();

        debug!(
            "opened writer on {} with {} segments",
            writer.storage.describe(),
            writer.segments.len()
        );
        Ok(writer)
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }

    /// Replace the analyzer used for documents added from now on.
    pub fn set_analyzer(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.analyzer = analyzer;
    }

    pub fn config(&self) -> &IndexWriterConfig {
        &self.config
    }

    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Generation of the last successful commit (0 before the first).
    pub fn commit_generation(&self) -> u64 {
        self.commit_generation
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn has_uncommitted_changes(&self) -> bool {
        self.dirty || !self.buffer.is_empty()
    }

    /// Documents including deleted ones not yet merged away.
    pub fn max_doc(&self) -> usize {
        self.segments.iter().map(|s| s.data.max_doc()).sum::<usize>() + self.buffer.len()
    }

    /// Live documents.
    pub fn num_docs(&self) -> usize {
        self.segments.iter().map(SegmentEntry::live_count).sum::<usize>() + self.buffer.len()
    }

    fn check_closed(&self) -> Result<()> {
        if self.closed {
            Err(LucernaError::closed("index writer is closed"))
        } else {
            Ok(())
        }
    }

    pub fn add_document(&mut self, doc: Document) -> Result<()> {
        self.check_closed()?;

        let buffered = self.analyze_document(doc)?;
        self.buffer.push(buffered);
        self.stats.docs_added += 1;
        self.dirty = true;

        if self.buffer.len() >= self.config.max_buffered_docs {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Atomically delete every document containing `term`, then add `doc`.
    pub fn update_document(&mut self, term: &Term, doc: Document) -> Result<()> {
        self.check_closed()?;

        let buffered = self.analyze_document(doc)?;
        self.delete_term(term);
        self.buffer.push(buffered);
        self.stats.docs_added += 1;
        self.dirty = true;

        if self.buffer.len() >= self.config.max_buffered_docs {
            self.flush_buffer()?;
        }
        Ok(())
    }

    pub fn delete_documents(&mut self, term: &Term) -> Result<()> {
        self.check_closed()?;
        self.delete_term(term);
        Ok(())
    }

    pub fn delete_by_query(&mut self, query: &dyn Query) -> Result<()> {
        self.check_closed()?;
        self.flush_buffer()?;
        self.stats.delete_ops += 1;

        for entry in &mut self.segments {
            let reader = SegmentReader::new(Arc::clone(&entry.data), Arc::clone(&entry.deleted));
            let matches = query.score_segment(&reader)?;
            if matches.is_empty() {
                continue;
            }

            let deleted = Arc::make_mut(&mut entry.deleted);
            for doc in matches.keys() {
                deleted.set(*doc as usize, true);
            }
            self.dirty = true;
        }
        Ok(())
    }

    pub fn delete_all(&mut self) -> Result<()> {
        self.check_closed()?;

        self.buffer.clear();
        self.segments.clear();
        self.stats.delete_ops += 1;
        self.dirty = true;
        Ok(())
    }

    /// Open a near-real-time reader reflecting every change made so far.
    pub fn get_reader(&mut self) -> Result<IndexReader> {
        self.check_closed()?;
        self.flush_buffer()?;

        let segments = self
            .segments
            .iter()
            .map(|entry| SegmentReader::new(Arc::clone(&entry.data), Arc::clone(&entry.deleted)))
            .collect();
        Ok(IndexReader::new(segments))
    }

    /// Rewrite every segment that has deletions, dropping the deleted docs.
    pub fn force_merge_deletes(&mut self) -> Result<()> {
        self.check_closed()?;
        self.flush_buffer()?;

        let mut rewritten = Vec::with_capacity(self.segments.len());
        let mut changed = false;

        for entry in std::mem::take(&mut self.segments) {
            if !entry.has_deletions() {
                rewritten.push(entry);
                continue;
            }

            changed = true;
            if entry.live_count() == 0 {
                continue;
            }
            let name = self.next_segment_name();
            let data = SegmentData::compact(name, &[(&entry.data, &entry.deleted)]);
            rewritten.push(Self::fresh_entry(data));
        }

        self.segments = rewritten;
        if changed {
            self.stats.merges += 1;
            self.dirty = true;
        }
        Ok(())
    }

    /// Durably commit all changes. Returns `false` if there was nothing to commit.
    pub fn commit(&mut self) -> Result<bool> {
        self.check_closed()?;
        self.flush_buffer()?;

        if !self.dirty {
            return Ok(false);
        }

        self.write_commit()
            .map_err(|e| LucernaError::commit(format!("{}: {e}", self.storage.describe())))?;
        self.dirty = false;
        self.stats.commits += 1;
        self.delete_unreferenced_files();

        info!(
            "committed generation {} of {}",
            self.commit_generation,
            self.storage.describe()
        );
        Ok(true)
    }

    /// Force-merge deletes, commit and release the writer.
    ///
    /// Every step is attempted; the first failure is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let merged = self.force_merge_deletes();
        if let Err(e) = &merged {
            warn!("force merge deletes failed while closing: {e}");
        }
        let committed = self.commit().map(|_| ());
        if let Err(e) = &committed {
            warn!("commit failed while closing: {e}");
        }

        self.closed = true;
        self.buffer.clear();
        self.segments.clear();

        merged.and(committed)
    }

    fn delete_term(&mut self, term: &Term) {
        self.stats.delete_ops += 1;

        let before = self.buffer.len();
        self.buffer.retain(|doc| !doc.contains(term));
        if self.buffer.len() != before {
            self.dirty = true;
        }

        for entry in &mut self.segments {
            let Some(postings) = entry.data.postings(term.field(), term.text()) else {
                continue;
            };
            let targets: Vec<usize> = postings
                .iter()
                .map(|p| p.doc as usize)
                .filter(|doc| !entry.deleted.get(*doc).unwrap_or(false))
                .collect();
            if targets.is_empty() {
                continue;
            }

            let deleted = Arc::make_mut(&mut entry.deleted);
            for doc in targets {
                deleted.set(doc, true);
            }
            self.dirty = true;
        }
    }

    fn analyze_document(&self, doc: Document) -> Result<BufferedDoc> {
        let mut terms: HashMap<String, HashMap<String, Vec<u32>>> = HashMap::new();

        for (field, value) in doc.fields() {
            let Some(text) = value.to_index_string() else {
                continue;
            };
            let field_terms = terms.entry(field.clone()).or_default();

            if self.keyword_fields.contains(field) {
                field_terms.entry(text).or_default().push(0);
                continue;
            }

            for token in analyze_field(self.analyzer.as_ref(), field, &text)? {
                if token.is_stopped() || token.is_empty() {
                    continue;
                }
                field_terms
                    .entry(token.text)
                    .or_default()
                    .push(token.position as u32);
            }
        }

        terms.retain(|_, field_terms| !field_terms.is_empty());
        Ok(BufferedDoc { doc, terms })
    }

    fn next_segment_name(&mut self) -> String {
        let name = format!("_{}", self.next_segment);
        self.next_segment += 1;
        name
    }

    fn fresh_entry(data: SegmentData) -> SegmentEntry {
        let max_doc = data.max_doc();
        SegmentEntry {
            data: Arc::new(data),
            deleted: Arc::new(BitVec::from_elem(max_doc, false)),
            persisted: false,
        }
    }

    /// Turn the RAM buffer into an in-memory segment.
    fn flush_buffer(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let name = self.next_segment_name();
        let mut docs = Vec::with_capacity(self.buffer.len());
        let mut postings: FieldPostings = HashMap::new();

        for (doc_id, buffered) in self.buffer.drain(..).enumerate() {
            for (field, terms) in buffered.terms {
                let field_postings = postings.entry(field).or_default();
                for (term, positions) in terms {
                    field_postings.entry(term).or_default().push(Posting {
                        doc: doc_id as DocId,
                        positions,
                    });
                }
            }
            docs.push(buffered.doc);
        }

        debug!("flushed segment {name} with {} docs", docs.len());
        self.segments.push(Self::fresh_entry(SegmentData {
            name,
            docs,
            postings,
        }));
        self.stats.segments_flushed += 1;
        self.dirty = true;

        self.maybe_merge();
        Ok(())
    }

    fn maybe_merge(&mut self) {
        if self.segments.len() <= self.config.max_segments.max(1) {
            return;
        }

        let name = self.next_segment_name();
        let sources: Vec<(&SegmentData, &BitVec)> = self
            .segments
            .iter()
            .map(|entry| (entry.data.as_ref(), entry.deleted.as_ref()))
            .collect();
        let merged = SegmentData::compact(name, &sources);

        debug!(
            "merged {} segments into {} ({} docs)",
            self.segments.len(),
            merged.name,
            merged.max_doc()
        );
        self.segments = vec![Self::fresh_entry(merged)];
        self.stats.merges += 1;
    }

    fn write_commit(&mut self) -> Result<()> {
        for entry in &mut self.segments {
            if !entry.persisted {
                entry.data.write(self.storage.as_ref())?;
                entry.persisted = true;
            }
        }

        let generation = self.commit_generation + 1;
        let point = CommitPoint {
            generation,
            next_segment: self.next_segment,
            timestamp: Utc::now(),
            segments: self
                .segments
                .iter()
                .map(|entry| CommittedSegment {
                    name: entry.data.name.clone(),
                    max_doc: entry.data.max_doc(),
                    deleted: entry
                        .deleted
                        .iter()
                        .enumerate()
                        .filter(|(_, d)| *d)
                        .map(|(doc, _)| doc as DocId)
                        .collect(),
                })
                .collect(),
        };

        let json = serde_json::to_vec_pretty(&point)?;
        write_checksummed(
            self.storage.as_ref(),
            &CommitPoint::file_name(generation),
            &json,
        )?;
        self.storage.sync()?;
        self.commit_generation = generation;
        Ok(())
    }

    fn latest_commit_generation(&self) -> Result<Option<u64>> {
        Ok(self
            .storage
            .list_files()?
            .iter()
            .filter_map(|name| CommitPoint::parse_generation(name))
            .max())
    }

    fn load_commit(&mut self, generation: u64) -> Result<()> {
        let bytes = read_checksummed(self.storage.as_ref(), &CommitPoint::file_name(generation))?;
        let point: CommitPoint = serde_json::from_slice(&bytes)?;

        let mut segments = Vec::with_capacity(point.segments.len());
        for committed in &point.segments {
            let data = SegmentData::read(self.storage.as_ref(), &committed.name)?;
            if data.max_doc() != committed.max_doc {
                return Err(LucernaError::index(format!(
                    "segment {} has {} docs, commit point expects {}",
                    committed.name,
                    data.max_doc(),
                    committed.max_doc
                )));
            }

            let mut deleted = BitVec::from_elem(data.max_doc(), false);
            for doc in &committed.deleted {
                let doc = *doc as usize;
                if doc >= data.max_doc() {
                    return Err(LucernaError::index(format!(
                        "segment {} deletes doc {doc} past its end",
                        committed.name
                    )));
                }
                deleted.set(doc, true);
            }
            segments.push(SegmentEntry {
                data: Arc::new(data),
                deleted: Arc::new(deleted),
                persisted: true,
            });
        }

        self.segments = segments;
        self.next_segment = point.next_segment;
        self.commit_generation = point.generation;
        Ok(())
    }

    /// Remove files no commit point or live segment refers to.
    fn delete_unreferenced_files(&self) {
        let files = match self.storage.list_files() {
            Ok(files) => files,
            Err(e) => {
                warn!("cannot list {}: {e}", self.storage.describe());
                return;
            }
        };

        let current_commit = CommitPoint::file_name(self.commit_generation);
        let live: AHashSet<String> = self
            .segments
            .iter()
            .filter(|entry| entry.persisted)
            .map(|entry| SegmentData::file_name(&entry.data.name))
            .collect();

        for file in files {
            let obsolete = if CommitPoint::parse_generation(&file).is_some() {
                file != current_commit
            } else if file.ends_with(".seg") {
                !live.contains(&file)
            } else {
                file.ends_with(".tmp")
            };

            if obsolete && let Err(e) = self.storage.delete_file(&file) {
                warn!("cannot delete obsolete file {file}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::StandardAnalyzer;
    use crate::storage::MemoryStorage;

    fn writer_on(storage: Arc<dyn Storage>) -> IndexWriter {
        IndexWriter::open(
            storage,
            Arc::new(StandardAnalyzer::new().unwrap()),
            IndexWriterConfig::default(),
        )
        .unwrap()
    }

    fn doc(rid: &str, text: &str) -> Document {
        Document::builder()
            .add_text(RID, rid)
            .add_text("text", text)
            .build()
    }

    #[test]
    fn test_update_replaces_by_term() {
        let mut writer = writer_on(Arc::new(MemoryStorage::new()));

        writer
            .update_document(&Term::new(RID, "#1:0"), doc("#1:0", "hello world"))
            .unwrap();
        writer.get_reader().unwrap();
        writer
            .update_document(&Term::new(RID, "#1:0"), doc("#1:0", "goodbye world"))
            .unwrap();

        let reader = writer.get_reader().unwrap();
        assert_eq!(reader.num_docs(), 1);
        assert_eq!(reader.max_doc(), 2);
        assert_eq!(writer.num_docs(), 1);
    }

    #[test]
    fn test_update_within_buffer() {
        let mut writer = writer_on(Arc::new(MemoryStorage::new()));
        let term = Term::new(RID, "#1:0");

        writer.update_document(&term, doc("#1:0", "a")).unwrap();
        writer.update_document(&term, doc("#1:0", "b")).unwrap();

        assert_eq!(writer.max_doc(), 1);
    }

    #[test]
    fn test_commit_and_reopen() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        {
            let mut writer = writer_on(Arc::clone(&storage));
            writer.add_document(doc("#1:0", "hello")).unwrap();
            writer.add_document(doc("#1:1", "world")).unwrap();
            writer.get_reader().unwrap();
            writer.delete_documents(&Term::new(RID, "#1:1")).unwrap();
            assert!(writer.commit().unwrap());
            assert!(!writer.commit().unwrap());
            assert_eq!(writer.commit_generation(), 1);
        }

        let files = storage.list_files().unwrap();
        assert!(files.contains(&"segments_1.json".to_string()));

        let mut writer = writer_on(storage);
        assert_eq!(writer.num_docs(), 1);
        assert_eq!(writer.max_doc(), 2);

        writer.force_merge_deletes().unwrap();
        assert_eq!(writer.max_doc(), 1);
        assert!(writer.has_uncommitted_changes());
    }

    #[test]
    fn test_obsolete_files_removed_after_commit() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut writer = writer_on(Arc::clone(&storage));

        writer.add_document(doc("#1:0", "hello")).unwrap();
        writer.commit().unwrap();
        writer.delete_documents(&Term::new(RID, "#1:0")).unwrap();
        writer.force_merge_deletes().unwrap();
        writer.commit().unwrap();

        assert_eq!(storage.list_files().unwrap(), vec!["segments_2.json"]);
    }

    #[test]
    fn test_merge_policy_bounds_segment_count() {
        let mut writer = IndexWriter::open(
            Arc::new(MemoryStorage::new()),
            Arc::new(StandardAnalyzer::new().unwrap()),
            IndexWriterConfig {
                max_buffered_docs: 1,
                max_segments: 3,
            },
        )
        .unwrap();

        for i in 0..10 {
            writer.add_document(doc(&format!("#1:{i}"), "x")).unwrap();
        }

        assert!(writer.segment_count() <= 3);
        assert_eq!(writer.num_docs(), 10);
    }

    #[test]
    fn test_delete_all_and_close() {
        let mut writer = writer_on(Arc::new(MemoryStorage::new()));
        writer.add_document(doc("#1:0", "hello")).unwrap();
        writer.delete_all().unwrap();
        assert_eq!(writer.max_doc(), 0);

        writer.close().unwrap();
        assert!(writer.is_closed());
        assert!(writer.add_document(doc("#1:1", "x")).is_err());
        writer.close().unwrap();
    }
}
