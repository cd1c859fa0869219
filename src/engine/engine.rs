//! The full-text secondary index engine.
//!
//! A [`SearchIndexEngine`] owns one index: its directory, the single tracking
//! writer, the searcher manager with its reopen thread and the periodic commit
//! task. Construction has no side effects; [`SearchIndexEngine::start`] opens
//! the index and [`IndexEngine::close`] releases it again.
//!
//! Writes return a [`Generation`]. A write becomes visible to
//! [`acquire_searcher`](SearchIndexEngine::acquire_searcher) within the
//! configured staleness window, and to [`searcher`](SearchIndexEngine::searcher)
//! immediately, since that waits for the engine's last write.
//!
//! Keys are analyzed like any other text, so two keys that differ only in
//! case (`"Rome"` and `"rome"`) find the same documents.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::analysis::analyzer::{Analyzer, AnalyzerFactory, AnalyzerKind};
use crate::analysis::analyzer::factory::PREFIX_WITH_CLASS_NAME;
use crate::directory::{StorageLocation, open_directory, remove_directory};
use crate::document::{Document, RID};
use crate::engine::builder::{
    DefaultDocumentBuilder, DocumentBuilder, IndexKey, QueryBuilder, Record, RecordId,
    SimpleQueryBuilder,
};
use crate::engine::capability::IndexCapabilities;
use crate::engine::commit::{CommitScheduler, CommitStats, CommitTarget};
use crate::engine::config::EngineConfig;
use crate::engine::context::EngineContext;
use crate::engine::contract::{
    IndexCursor, IndexEngine, IndexKeyCursor, ValuesTransformer, empty_cursor,
};
use crate::engine::definition::{IndexCreateParams, IndexDefinition, IndexDescriptor, Metadata};
use crate::engine::tx::TxChanges;
use crate::error::{LucernaError, Result};
use crate::index::Generation;
use crate::index::reopen::ReopenThread;
use crate::index::searcher_manager::{SearcherLease, SearcherManager};
use crate::index::term::Term;
use crate::index::tracking::TrackingIndexWriter;
use crate::index::writer::IndexWriter;
use crate::lifecycle::{LifecycleListener, ListenerId, ListenerRegistry};
use crate::query::{BooleanQueryBuilder, Query, TermQuery};

/// Version reported through [`IndexEngine::version`].
pub const ENGINE_VERSION: u32 = 1;

/// Where an engine is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Unopened,
    Open,
    Closing,
    Closed,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub rid: String,
    pub score: f32,
    pub document: Document,
}

struct OpenIndex {
    writer: Arc<TrackingIndexWriter>,
    manager: Arc<SearcherManager>,
    reopen: ReopenThread,
    last_generation: AtomicU64,
}

#[derive(Debug)]
struct LifecycleState {
    phase: EnginePhase,
    listener: Option<ListenerId>,
}

pub struct SearchIndexEngine {
    name: String,
    location: StorageLocation,
    config: EngineConfig,
    capabilities: IndexCapabilities,
    descriptor: RwLock<IndexDescriptor>,
    metadata: RwLock<Metadata>,
    index_analyzer: RwLock<Arc<dyn Analyzer>>,
    query_analyzer: RwLock<Arc<dyn Analyzer>>,
    document_builder: Arc<dyn DocumentBuilder>,
    query_builder: Arc<dyn QueryBuilder>,
    registry: Arc<ListenerRegistry>,
    commit_task: CommitScheduler,
    open: RwLock<Option<Arc<OpenIndex>>>,
    lifecycle: Mutex<LifecycleState>,
    closed: AtomicBool,
}

impl std::fmt::Debug for SearchIndexEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndexEngine")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("phase", &self.phase())
            .field("last_generation", &self.last_generation())
            .finish()
    }
}

impl SearchIndexEngine {
    /// Describe an index without opening it.
    pub fn new<S: Into<String>>(
        name: S,
        location: StorageLocation,
        definition: IndexDefinition,
        metadata: Metadata,
        config: EngineConfig,
        context: &EngineContext,
    ) -> Result<Self> {
        config.validate()?;
        let name = name.into();

        let factory = AnalyzerFactory::new();
        let index_analyzer = factory.create_analyzer(&definition, AnalyzerKind::Index, &metadata)?;
        let query_analyzer = factory.create_analyzer(&definition, AnalyzerKind::Query, &metadata)?;

        let commit_task = CommitScheduler::new(
            Arc::clone(context.timer()),
            config.commit_delay(),
            config.commit_interval(),
        );

        Ok(SearchIndexEngine {
            descriptor: RwLock::new(IndexDescriptor::new(name.clone(), definition)),
            name,
            location,
            config,
            capabilities: IndexCapabilities::search_only(),
            metadata: RwLock::new(metadata),
            index_analyzer: RwLock::new(index_analyzer),
            query_analyzer: RwLock::new(query_analyzer),
            document_builder: Arc::new(DefaultDocumentBuilder::new()),
            query_builder: Arc::new(SimpleQueryBuilder::new()),
            registry: Arc::clone(context.registry()),
            commit_task,
            open: RwLock::new(None),
            lifecycle: Mutex::new(LifecycleState {
                phase: EnginePhase::Unopened,
                listener: None,
            }),
            closed: AtomicBool::new(true),
        })
    }

    pub fn with_document_builder(mut self, builder: Arc<dyn DocumentBuilder>) -> Self {
        self.document_builder = builder;
        self
    }

    pub fn with_query_builder(mut self, builder: Arc<dyn QueryBuilder>) -> Self {
        self.query_builder = builder;
        self
    }

    /// Open the index, start the reopen thread and schedule the commit task.
    ///
    /// Starting an open engine does nothing. A closed engine can be started
    /// again.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if self.open.read().is_some() {
            info!("index storage {} is open, don't reopen", self.name);
            return Ok(());
        }

        let opened = self.open_index().inspect_err(|e| {
            error!("error initializing index {}: {e}", self.name);
        })?;
        *self.open.write() = Some(Arc::new(opened));
        self.closed.store(false, Ordering::SeqCst);
        lifecycle.phase = EnginePhase::Open;

        self.flush();

        if lifecycle.listener.is_none() {
            let listener: Arc<dyn LifecycleListener> = Arc::clone(self) as Arc<dyn LifecycleListener>;
            lifecycle.listener = Some(self.registry.register(&listener));
        }

        let target = Arc::downgrade(self) as Weak<dyn CommitTarget>;
        match self.commit_task.schedule(target) {
            Ok(()) => info!("index storage {} created, commit task scheduled", self.name),
            Err(e) => warn!("cannot schedule commits of index {}: {e}", self.name),
        }

        info!("REOPEN DONE for index {}", self.name);
        Ok(())
    }

    /// Same as [`IndexEngine::close`].
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if self.open.read().is_none() {
            debug!("index {} is not open, nothing to close", self.name);
            return;
        }

        info!("closing engine {}", self.name);
        lifecycle.phase = EnginePhase::Closing;
        self.closed.store(true, Ordering::SeqCst);
        let taken = self.open.write().take();
        let Some(open) = taken else {
            return;
        };

        open.reopen.close();
        self.commit_task.cancel();
        open.manager.close();

        if let Err(e) = open.writer.force_merge_deletes() {
            error!("error merging deletes of index {} on close: {e}", self.name);
        }
        if let Err(e) = open.writer.commit() {
            error!("error committing index {} on close: {e}", self.name);
        }
        if let Err(e) = open.writer.close() {
            error!("error closing writer of index {}: {e}", self.name);
        }

        if let Some(id) = lifecycle.listener.take() {
            self.registry.unregister(id);
        }
        lifecycle.phase = EnginePhase::Closed;
        debug!("engine {} closed", self.name);
    }

    fn open_index(&self) -> Result<OpenIndex> {
        let storage = open_directory(
            &self.location,
            &self.config.index_base_dir,
            &self.name,
            &self.config.storage,
        )?;

        let writer = IndexWriter::open(storage, self.index_analyzer(), self.config.writer.clone())
            .map_err(|e| LucernaError::open(format!("cannot open index {}: {e}", self.name)))?;
        let writer = Arc::new(TrackingIndexWriter::new(writer));
        let manager = Arc::new(SearcherManager::new(Arc::clone(&writer))?);
        let reopen = ReopenThread::start(
            &self.name,
            Arc::clone(&writer),
            Arc::clone(&manager),
            self.config.max_stale(),
            self.config.min_stale(),
        )?;

        Ok(OpenIndex {
            writer,
            manager,
            reopen,
            last_generation: AtomicU64::new(0),
        })
    }

    fn require_open(&self) -> Result<Arc<OpenIndex>> {
        self.open
            .read()
            .clone()
            .ok_or_else(|| LucernaError::closed(format!("index {} is not open", self.name)))
    }

    pub fn phase(&self) -> EnginePhase {
        self.lifecycle.lock().phase
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn descriptor(&self) -> IndexDescriptor {
        self.descriptor.read().clone()
    }

    pub fn metadata(&self) -> Metadata {
        self.metadata.read().clone()
    }

    pub fn index_analyzer(&self) -> Arc<dyn Analyzer> {
        Arc::clone(&self.index_analyzer.read())
    }

    pub fn query_analyzer(&self) -> Arc<dyn Analyzer> {
        Arc::clone(&self.query_analyzer.read())
    }

    /// Generation of the last write made through this engine since it was
    /// opened, or 0 when it is not open.
    pub fn last_generation(&self) -> Generation {
        self.open
            .read()
            .as_ref()
            .map_or(0, |open| open.last_generation.load(Ordering::SeqCst))
    }

    pub fn commit_stats(&self) -> CommitStats {
        self.commit_task.stats()
    }

    /// Rebuild both analyzers from `definition` and `metadata`.
    ///
    /// Per-field analyzers are registered under `Class.field` as well.
    pub fn init_index(&self, definition: IndexDefinition, mut metadata: Metadata) -> Result<()> {
        info!("init index {} with definition {definition:?}", self.name);
        metadata.insert(PREFIX_WITH_CLASS_NAME.to_string(), Value::Bool(true));

        let factory = AnalyzerFactory::new();
        let index_analyzer = factory.create_analyzer(&definition, AnalyzerKind::Index, &metadata)?;
        let query_analyzer = factory.create_analyzer(&definition, AnalyzerKind::Query, &metadata)?;

        *self.index_analyzer.write() = Arc::clone(&index_analyzer);
        *self.query_analyzer.write() = query_analyzer;
        if let Some(open) = self.open.read().as_ref() {
            open.writer.with_writer(|writer| writer.set_analyzer(index_analyzer));
        }

        self.descriptor.write().definition = definition;
        *self.metadata.write() = metadata;
        debug!("done init index {}", self.name);
        Ok(())
    }

    /// Upsert `doc`, replacing every document with the same `RID`.
    pub fn add_document(&self, doc: Document) -> Result<Generation> {
        let rid = doc
            .rid()
            .ok_or_else(|| LucernaError::invalid_argument(format!("document has no {RID} field")))?
            .to_string();
        debug!("add document {rid} to index {}", self.name);

        let open = self.require_open()?;
        let generation = open.writer.update_document(&Term::new(RID, rid), doc)?;
        Ok(record_write(&open, generation))
    }

    /// Index the definition's fields of `record`.
    pub fn put_record(&self, record: &Record) -> Result<Generation> {
        let doc = self
            .document_builder
            .build_from_record(&self.descriptor.read().definition, record)?;
        self.add_document(doc)
    }


    /// Block until writes up to `generation` are searchable.
    pub fn wait_for_generation(&self, generation: Generation) -> Result<()> {
        self.require_open()?.reopen.wait_for_generation(generation)
    }

    /// Like [`wait_for_generation`](Self::wait_for_generation), returning
    /// `false` if `timeout` elapses first.
    pub fn wait_for_generation_timeout(
        &self,
        generation: Generation,
        timeout: Duration,
    ) -> Result<bool> {
        self.require_open()?
            .reopen
            .wait_for_generation_timeout(generation, timeout)
    }

    /// A searcher that sees every write made through this engine so far.
    pub fn searcher(&self) -> Result<SearcherLease> {
        let open = self.require_open()?;
        fresh_searcher(&open)
    }

    /// The current searcher, possibly missing recent writes.
    pub fn acquire_searcher(&self) -> Result<SearcherLease> {
        self.require_open()?.manager.acquire()
    }

    fn build_query(&self, key: &IndexKey) -> Result<Box<dyn Query>> {
        let analyzer = self.query_analyzer();
        self.query_builder
            .build_query(&self.descriptor.read().definition, key, &analyzer)
    }

    /// Run the query text built from `key` and return the best `limit` hits.
    pub fn search(&self, key: &IndexKey, limit: usize) -> Result<Vec<SearchHit>> {
        let query = self.build_query(key)?;
        self.search_query(query.as_ref(), limit)
    }

    pub fn search_query(&self, query: &dyn Query, limit: usize) -> Result<Vec<SearchHit>> {
        let searcher = self.searcher()?;
        let top = searcher.search(query, limit)?;

        Ok(top
            .score_docs
            .iter()
            .filter_map(|hit| {
                let document = searcher.doc(hit.address)?;
                Some(SearchHit {
                    rid: document.rid()?.to_string(),
                    score: hit.score,
                    document: document.clone(),
                })
            })
            .collect())
    }

    fn delete_matching(&self, query: &dyn Query) -> Result<bool> {
        let open = self.require_open()?;
        if fresh_searcher(&open)?.count(query)? == 0 {
            return Ok(false);
        }
        let generation = open.writer.delete_by_query(query)?;
        record_write(&open, generation);
        Ok(true)
    }

    /// Reclaim deleted documents and commit. Failures are logged.
    pub fn flush(&self) {
        if let Err(e) = self.commit() {
            error!("error committing index {}: {e}", self.name);
        }
    }

    /// Reclaim deleted documents and durably commit.
    ///
    /// Returns `false` if there was nothing to commit.
    pub fn commit(&self) -> Result<bool> {
        let open = self.require_open()?;
        debug!("committing index {}", self.name);
        open.writer.force_merge_deletes()?;
        open.writer.commit()
    }

    /// Close the engine and remove its directory at `location`.
    pub fn delete_database(&self, location: &StorageLocation) -> Result<()> {
        info!("deleting storage of index {}", self.name);
        self.stop();
        remove_directory(location, &self.config.index_base_dir, &self.name)?;
        Ok(())
    }

    /// A buffer for the changes of one transaction.
    pub fn build_tx_changes(&self) -> TxChanges {
        TxChanges::new()
    }

    /// Stage `key -> rid` in `changes`.
    pub fn stage_put(&self, changes: &mut TxChanges, key: &IndexKey, rid: &RecordId) -> Result<()> {
        let doc = self
            .document_builder
            .build_document(&self.descriptor.read().definition, key, rid)?;
        changes.put(doc)
    }

    /// Apply a transaction's changes as one write.
    pub fn apply_tx_changes(&self, changes: TxChanges) -> Result<Generation> {
        if changes.is_empty() {
            return Ok(self.last_generation());
        }
        let open = self.require_open()?;
        let generation = open.writer.apply(move |writer| changes.apply_to(writer))?;
        Ok(record_write(&open, generation))
    }

    fn live_record_ids(&self) -> Result<Vec<RecordId>> {
        let searcher = self.searcher()?;
        let mut rids = Vec::with_capacity(searcher.num_docs());
        for segment in searcher.reader().segments() {
            for doc in segment.live_docs() {
                if let Some(rid) = segment.document(doc).and_then(Document::rid)
                    && let Ok(rid) = rid.parse::<RecordId>()
                {
                    rids.push(rid);
                }
            }
        }
        Ok(rids)
    }
}

/// Note a write made through `open`. Writes against an index that has since
/// been closed only touch that index's counter.
fn record_write(open: &OpenIndex, generation: Generation) -> Generation {
    open.last_generation.fetch_max(generation, Ordering::SeqCst);
    generation
}

/// A searcher of `open` that sees every write recorded against it.
fn fresh_searcher(open: &OpenIndex) -> Result<SearcherLease> {
    open.reopen
        .wait_for_generation(open.last_generation.load(Ordering::SeqCst))?;
    open.manager.acquire()
}

impl IndexEngine for SearchIndexEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        ENGINE_VERSION
    }

    fn capabilities(&self) -> IndexCapabilities {
        self.capabilities
    }

    fn create(&self, params: IndexCreateParams) -> Result<()> {
        info!("create index {} with {params:?}", self.name);
        self.descriptor.write().apply(&params);
        Ok(())
    }

    fn load(&self, name: &str, params: IndexCreateParams) -> Result<()> {
        info!("load index {name}");
        if name != self.name {
            warn!("loading index {name} into engine {}", self.name);
        }
        self.descriptor.write().apply(&params);
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        self.delete_database(&self.location)
    }

    fn delete_without_load(&self, name: &str) -> Result<()> {
        info!("delete index {name} without load");
        remove_directory(&self.location, &self.config.index_base_dir, name)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        info!("clear index {}", self.name);
        let open = self.require_open()?;
        let generation = open.writer.delete_all()?;
        record_write(&open, generation);
        Ok(())
    }

    fn size(&self) -> u64 {
        match self.searcher() {
            Ok(searcher) => searcher.num_docs() as u64,
            Err(e) => {
                debug!("no searcher for size of index {}: {e}", self.name);
                self.open
                    .read()
                    .as_ref()
                    .map_or(0, |open| open.writer.max_doc() as u64)
            }
        }
    }

    fn size_with(&self, transformer: &dyn ValuesTransformer) -> u64 {
        match self.live_record_ids() {
            Ok(rids) => rids
                .into_iter()
                .map(|rid| transformer.transform(rid).len() as u64)
                .sum(),
            Err(e) => {
                debug!("no searcher for size of index {}: {e}", self.name);
                0
            }
        }
    }

    fn put(&self, key: &IndexKey, rid: &RecordId) -> Result<Generation> {
        let doc = self
            .document_builder
            .build_document(&self.descriptor.read().definition, key, rid)?;
        self.add_document(doc)
    }

    fn get(&self, key: &IndexKey) -> Result<Vec<RecordId>> {
        let query = self.build_query(key)?;
        let searcher = self.searcher()?;
        let top = searcher.search(query.as_ref(), searcher.num_docs().max(1))?;

        Ok(top
            .score_docs
            .iter()
            .filter_map(|hit| searcher.doc(hit.address))
            .filter_map(Document::rid)
            .filter_map(|rid| rid.parse::<RecordId>().ok())
            .collect())
    }

    fn contains(&self, key: &IndexKey) -> Result<bool> {
        let query = self.build_query(key)?;
        Ok(self.searcher()?.count(query.as_ref())? > 0)
    }

    fn remove(&self, key: &IndexKey) -> Result<bool> {
        let query = self.build_query(key)?;
        self.delete_matching(query.as_ref())
    }

    fn remove_value(&self, key: &IndexKey, rid: &RecordId) -> Result<bool> {
        let query = BooleanQueryBuilder::new()
            .must(self.build_query(key)?)
            .must(Box::new(TermQuery::new(RID, rid.to_string())))
            .build();
        self.delete_matching(&query)
    }

    fn first_key(&self) -> Option<IndexKey> {
        None
    }

    fn last_key(&self) -> Option<IndexKey> {
        None
    }

    fn iterate_entries_between(
        &self,
        _from: &IndexKey,
        _from_inclusive: bool,
        _to: &IndexKey,
        _to_inclusive: bool,
        _ascending: bool,
        _transformer: Option<&dyn ValuesTransformer>,
    ) -> IndexCursor {
        empty_cursor()
    }

    fn iterate_entries_major(
        &self,
        _from: &IndexKey,
        _inclusive: bool,
        _ascending: bool,
        _transformer: Option<&dyn ValuesTransformer>,
    ) -> IndexCursor {
        empty_cursor()
    }

    fn iterate_entries_minor(
        &self,
        _to: &IndexKey,
        _inclusive: bool,
        _ascending: bool,
        _transformer: Option<&dyn ValuesTransformer>,
    ) -> IndexCursor {
        empty_cursor()
    }

    fn cursor(&self, _transformer: Option<&dyn ValuesTransformer>) -> IndexCursor {
        empty_cursor()
    }

    fn desc_cursor(&self, _transformer: Option<&dyn ValuesTransformer>) -> IndexCursor {
        empty_cursor()
    }

    fn key_cursor(&self) -> IndexKeyCursor {
        Box::new(std::iter::empty())
    }

    fn close(&self) {
        self.stop();
    }
}

impl CommitTarget for SearchIndexEngine {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn flush(&self) -> Result<()> {
        self.commit().map(|_| ())
    }
}

impl Drop for SearchIndexEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl LifecycleListener for SearchIndexEngine {
    fn on_shutdown(&self) {
        info!("engine {} shutdown", self.name);
        self.stop();
    }

    fn on_storage_registered(&self, storage: &str) {
        debug!("storage {storage} registered");
    }

    fn on_storage_unregistered(&self, storage: &str) {
        debug!("storage {storage} unregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::engine::definition::KeyType;

    fn engine(context: &EngineContext) -> Arc<SearchIndexEngine> {
        let definition = IndexDefinition::new("Post").with_field("text", KeyType::String);
        let config = EngineConfig {
            target_min_stale_secs: 0.01,
            ..EngineConfig::default()
        };
        Arc::new(
            SearchIndexEngine::new(
                "Post.text",
                StorageLocation::Memory,
                definition,
                Metadata::new(),
                config,
                context,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_new_is_inert() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);

        assert_eq!(engine.phase(), EnginePhase::Unopened);
        assert!(engine.is_closed());
        assert!(context.registry().is_empty());
        assert_eq!(context.timer().stats().tasks_scheduled, 0);
        assert!(engine.acquire_searcher().is_err());
        assert_eq!(engine.size(), 0);
    }

    #[test]
    fn test_start_is_idempotent() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);

        engine.start().unwrap();
        engine.start().unwrap();
        assert_eq!(engine.phase(), EnginePhase::Open);
        assert_eq!(context.registry().len(), 1);
        assert_eq!(context.timer().stats().tasks_scheduled, 1);

        engine.close();
        assert_eq!(engine.phase(), EnginePhase::Closed);
        assert!(context.registry().is_empty());
    }

    #[test]
    fn test_put_get_remove() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();

        let first = engine.put(&json!("Rome is eternal"), &RecordId::new(1, 0)).unwrap();
        let second = engine.put(&json!("Paris by night"), &RecordId::new(1, 1)).unwrap();
        assert!(second > first);
        assert_eq!(engine.last_generation(), second);

        assert_eq!(engine.get(&json!("rome")).unwrap(), vec![RecordId::new(1, 0)]);
        assert!(engine.contains(&json!("ROME")).unwrap());
        assert!(!engine.contains(&json!("london")).unwrap());

        assert!(!engine.remove_value(&json!("rome"), &RecordId::new(1, 1)).unwrap());
        assert!(engine.remove_value(&json!("rome"), &RecordId::new(1, 0)).unwrap());
        assert!(!engine.contains(&json!("rome")).unwrap());

        assert!(engine.remove(&json!("paris")).unwrap());
        assert!(!engine.remove(&json!("paris")).unwrap());
        assert_eq!(engine.size(), 0);
        engine.close();
    }

    #[test]
    fn test_upsert_replaces_by_rid() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();

        engine.put(&json!("old text"), &RecordId::new(2, 0)).unwrap();
        engine.put(&json!("new text"), &RecordId::new(2, 0)).unwrap();

        assert_eq!(engine.size(), 1);
        assert!(engine.get(&json!("old")).unwrap().is_empty());
        assert_eq!(engine.get(&json!("new")).unwrap(), vec![RecordId::new(2, 0)]);
        engine.close();
    }

    #[test]
    fn test_search_and_parse_errors() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();

        engine.put(&json!("hello world"), &RecordId::new(1, 0)).unwrap();
        engine.put(&json!("hello hello"), &RecordId::new(1, 1)).unwrap();

        let hits = engine.search(&json!("hello"), 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].rid, "#1:1");

        let err = engine.search(&json!("(hello"), 10).unwrap_err();
        assert!(err.is_parse_error());
        engine.close();
    }

    #[test]
    fn test_unsupported_operations_are_empty() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();
        engine.put(&json!("a b c"), &RecordId::new(1, 0)).unwrap();

        assert!(!engine.has_range_query_support());
        assert_eq!(engine.first_key(), None);
        assert_eq!(engine.last_key(), None);
        assert_eq!(engine.cursor(None).count(), 0);
        assert_eq!(engine.desc_cursor(None).count(), 0);
        assert_eq!(engine.key_cursor().count(), 0);
        assert_eq!(
            engine
                .iterate_entries_between(&json!("a"), true, &json!("z"), true, true, None)
                .count(),
            0
        );
        assert_eq!(engine.iterate_entries_major(&json!("a"), true, true, None).count(), 0);
        assert_eq!(engine.iterate_entries_minor(&json!("z"), true, false, None).count(), 0);
        engine.close();
    }

    #[test]
    fn test_clear_and_size_with() {
        struct Twice;
        impl ValuesTransformer for Twice {
            fn transform(&self, value: RecordId) -> Vec<RecordId> {
                vec![value, value]
            }
        }

        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();
        engine.put(&json!("one"), &RecordId::new(1, 0)).unwrap();
        engine.put(&json!("two"), &RecordId::new(1, 1)).unwrap();

        assert_eq!(engine.size_with(&Twice), 4);
        engine.clear().unwrap();
        assert_eq!(engine.size(), 0);
        assert_eq!(engine.size_with(&Twice), 0);
        engine.close();
    }

    #[test]
    fn test_tx_changes_are_invisible_until_applied() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();
        engine.put(&json!("kept"), &RecordId::new(1, 0)).unwrap();

        let mut changes = engine.build_tx_changes();
        engine
            .stage_put(&mut changes, &json!("staged"), &RecordId::new(1, 1))
            .unwrap();
        changes.delete("#1:0");
        assert!(changes.is_updated("#1:1"));

        assert!(engine.get(&json!("staged")).unwrap().is_empty());
        assert_eq!(engine.size(), 1);

        let generation = engine.apply_tx_changes(changes).unwrap();
        assert_eq!(engine.last_generation(), generation);
        assert_eq!(engine.get(&json!("staged")).unwrap(), vec![RecordId::new(1, 1)]);
        assert!(engine.get(&json!("kept")).unwrap().is_empty());
        engine.close();
    }

    #[test]
    fn test_init_index_rebuilds_analyzers() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();

        let definition = IndexDefinition::new("Post").with_field("text", KeyType::String);
        let metadata = json!({ "text_index_analyzer": "keyword", "text_query_analyzer": "keyword" })
            .as_object()
            .cloned()
            .unwrap();
        engine.init_index(definition, metadata).unwrap();
        assert_eq!(engine.metadata().get(PREFIX_WITH_CLASS_NAME), Some(&Value::Bool(true)));

        let doc = Document::builder()
            .add_text(RID, "#1:0")
            .add_text("text", "Hello World")
            .build();
        engine.add_document(doc).unwrap();

        let query = TermQuery::new("text", "Hello World");
        assert_eq!(engine.search_query(&query, 10).unwrap().len(), 1);
        engine.close();
    }

    #[test]
    fn test_operations_after_close_fail_softly() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();
        engine.close();
        engine.close();

        assert!(matches!(
            engine.put(&json!("x"), &RecordId::new(1, 0)),
            Err(LucernaError::Closed(_))
        ));
        assert!(engine.searcher().is_err());
        assert_eq!(engine.size(), 0);
        assert_eq!(engine.first_key(), None);
    }

    #[test]
    fn test_write_to_closed_index_does_not_move_new_generation() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();
        for i in 0..3 {
            engine.put(&json!("before restart"), &RecordId::new(1, i)).unwrap();
        }
        let old = engine.require_open().unwrap();
        let stale = old.writer.generation();
        engine.close();

        engine.start().unwrap();
        record_write(&old, stale);

        assert_eq!(engine.last_generation(), 0);
        assert!(engine.searcher().is_ok());
        assert!(engine.get(&json!("restart")).unwrap().is_empty());
        assert_eq!(engine.size(), 0);
        engine.close();
    }

    #[test]
    fn test_drop_closes_engine() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();
        assert_eq!(context.timer().stats().tasks_scheduled, 1);

        drop(engine);
        assert!(context.registry().is_empty());
        assert_eq!(context.timer().stats().tasks_cancelled, 1);
    }

    #[test]
    fn test_restart_after_close() {
        let context = EngineContext::new().unwrap();
        let engine = engine(&context);
        engine.start().unwrap();
        engine.close();

        engine.start().unwrap();
        assert_eq!(engine.phase(), EnginePhase::Open);
        engine.put(&json!("again"), &RecordId::new(1, 0)).unwrap();
        assert_eq!(engine.size(), 1);
        engine.close();
    }
}
