//! Reference-counted pool of searchers over the latest NRT snapshot.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::error::{LucernaError, Result};
use crate::index::Generation;
use crate::index::searcher::IndexSearcher;
use crate::index::tracking::TrackingIndexWriter;

/// Hands out searchers and swaps in fresh snapshots on refresh.
///
/// A leased searcher keeps its snapshot alive after a refresh replaces it, so
/// in-flight searches always finish against the reader they started with.
pub struct SearcherManager {
    writer: Arc<TrackingIndexWriter>,
    current: RwLock<Arc<IndexSearcher>>,
    refresh_lock: Mutex<()>,
    closed: AtomicBool,
    leases: Arc<AtomicUsize>,
}

impl std::fmt::Debug for SearcherManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearcherManager")
            .field("generation", &self.current_generation())
            .field("closed", &self.is_closed())
            .field("leases", &self.outstanding_leases())
            .finish()
    }
}

impl SearcherManager {
    pub fn new(writer: Arc<TrackingIndexWriter>) -> Result<Self> {
        let (generation, reader) = writer.open_reader()?;
        Ok(SearcherManager {
            writer,
            current: RwLock::new(Arc::new(IndexSearcher::new(reader, generation))),
            refresh_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            leases: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Lease the current searcher.
    pub fn acquire(&self) -> Result<SearcherLease> {
        if self.is_closed() {
            return Err(LucernaError::closed("searcher manager is closed"));
        }

        let searcher = Arc::clone(&self.current.read());
        self.leases.fetch_add(1, Ordering::SeqCst);
        Ok(SearcherLease {
            searcher,
            leases: Arc::clone(&self.leases),
        })
    }

    /// Generation reflected by the current searcher.
    pub fn current_generation(&self) -> Generation {
        self.current.read().generation()
    }

    /// Refresh unless another thread is already refreshing.
    ///
    /// Returns `true` if this call installed a new searcher.
    pub fn maybe_refresh(&self) -> Result<bool> {
        match self.refresh_lock.try_lock() {
            Some(_guard) => self.refresh_locked().map(|(_, swapped)| swapped),
            None => Ok(false),
        }
    }

    /// Refresh, waiting for a concurrent refresh to finish first.
    ///
    /// Returns the generation of the searcher that is current afterwards.
    pub fn maybe_refresh_blocking(&self) -> Result<Generation> {
        let _guard = self.refresh_lock.lock();
        self.refresh_locked().map(|(generation, _)| generation)
    }

    fn refresh_locked(&self) -> Result<(Generation, bool)> {
        if self.is_closed() {
            return Err(LucernaError::closed("searcher manager is closed"));
        }

        let current = self.current_generation();
        if self.writer.generation() <= current {
            return Ok((current, false));
        }

        let (generation, reader) = self.writer.open_reader()?;
        debug!(
            "refreshed searcher from generation {current} to {generation} ({} docs)",
            reader.num_docs()
        );
        *self.current.write() = Arc::new(IndexSearcher::new(reader, generation));
        Ok((generation, true))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Searchers currently leased and not yet released.
    pub fn outstanding_leases(&self) -> usize {
        self.leases.load(Ordering::SeqCst)
    }

    /// Stop handing out searchers. Outstanding leases stay valid.
    pub fn close(&self) {
        let _guard = self.refresh_lock.lock();
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(
                "searcher manager closed with {} outstanding leases",
                self.outstanding_leases()
            );
        }
    }
}

/// A leased searcher. Dropping the lease releases it.
#[derive(Debug)]
pub struct SearcherLease {
    searcher: Arc<IndexSearcher>,
    leases: Arc<AtomicUsize>,
}

impl SearcherLease {
    pub fn release(self) {}
}

impl Deref for SearcherLease {
    type Target = IndexSearcher;

    fn deref(&self) -> &IndexSearcher {
        &self.searcher
    }
}

impl Drop for SearcherLease {
    fn drop(&mut self) {
        self.leases.fetch_sub(1, Ordering::SeqCst);
    }
}
