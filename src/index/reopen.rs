//! Background reopen loop and generation waiting.
//!
//! The loop refreshes the [`SearcherManager`] at most every `max_stale`, or
//! every `min_stale` while some caller is blocked in
//! [`ReopenThread::wait_for_generation`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};

use crate::error::{LucernaError, Result};
use crate::index::Generation;
use crate::index::searcher_manager::SearcherManager;
use crate::index::tracking::TrackingIndexWriter;

#[derive(Debug)]
struct ReopenState {
    waiting_gen: Generation,
    searching_gen: Generation,
    finish: bool,
    last_reopen_start: Instant,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<ReopenState>,
    cond: Condvar,
    writer: Arc<TrackingIndexWriter>,
    manager: Arc<SearcherManager>,
    max_stale: Duration,
    min_stale: Duration,
}

/// Keeps a [`SearcherManager`] fresh on a dedicated thread.
#[derive(Debug)]
pub struct ReopenThread {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReopenThread {
    /// Spawn the reopen loop.
    ///
    /// `max_stale` bounds how old the visible snapshot may get when nobody is
    /// waiting; `min_stale` bounds the refresh rate while someone is.
    pub fn start(
        name: &str,
        writer: Arc<TrackingIndexWriter>,
        manager: Arc<SearcherManager>,
        max_stale: Duration,
        min_stale: Duration,
    ) -> Result<Self> {
        if max_stale < min_stale {
            return Err(LucernaError::invalid_argument(format!(
                "max stale ({max_stale:?}) must be >= min stale ({min_stale:?})"
            )));
        }

        let searching_gen = manager.current_generation();
        let shared = Arc::new(Shared {
            state: Mutex::new(ReopenState {
                waiting_gen: searching_gen,
                searching_gen,
                finish: false,
                last_reopen_start: Instant::now(),
            }),
            cond: Condvar::new(),
            writer,
            manager,
            max_stale,
            min_stale,
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("lucerna-reopen-{name}"))
            .spawn(move || worker.run())?;

        Ok(ReopenThread {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Generation visible to searchers handed out by the manager.
    pub fn searching_generation(&self) -> Generation {
        self.shared.state.lock().searching_gen
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().finish
    }

    /// Block until every write up to `generation` is searchable.
    pub fn wait_for_generation(&self, generation: Generation) -> Result<()> {
        self.wait(generation, None).map(|_| ())
    }

    /// Like [`wait_for_generation`](Self::wait_for_generation), giving up after
    /// `timeout`. Returns `false` on timeout.
    pub fn wait_for_generation_timeout(
        &self,
        generation: Generation,
        timeout: Duration,
    ) -> Result<bool> {
        self.wait(generation, Instant::now().checked_add(timeout))
    }

    fn wait(&self, generation: Generation, deadline: Option<Instant>) -> Result<bool> {
        let max = self.shared.writer.generation();
        if generation > max {
            return Err(LucernaError::invalid_argument(format!(
                "generation {generation} was never returned by the writer (current {max})"
            )));
        }

        let mut state = self.shared.state.lock();
        if state.finish {
            return Err(LucernaError::closed("reopen thread is closed"));
        }
        if generation <= state.searching_gen {
            return Ok(true);
        }

        if generation > state.waiting_gen {
            state.waiting_gen = generation;
            self.shared.cond.notify_all();
        }

        while generation > state.searching_gen {
            if state.finish {
                return Err(LucernaError::closed("reopen thread closed while waiting"));
            }
            match deadline {
                Some(deadline) => {
                    if self.shared.cond.wait_until(&mut state, deadline).timed_out()
                        && generation > state.searching_gen
                    {
                        return Ok(false);
                    }
                }
                None => self.shared.cond.wait(&mut state),
            }
        }
        Ok(true)
    }

    /// Stop the loop and join the thread. Waiters are released with an error.
    pub fn close(&self) {
        {
            let mut state = self.shared.state.lock();
            state.finish = true;
            self.shared.cond.notify_all();
        }

        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            warn!("reopen thread panicked");
        }
    }
}

impl Drop for ReopenThread {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    fn run(&self) {
        loop {
            {
                let mut state = self.state.lock();
                loop {
                    if state.finish {
                        debug!("reopen loop finished at generation {}", state.searching_gen);
                        return;
                    }
                    let stale = if state.waiting_gen > state.searching_gen {
                        self.min_stale
                    } else {
                        self.max_stale
                    };
                    match state.last_reopen_start.checked_add(stale) {
                        Some(next) if Instant::now() >= next => break,
                        Some(next) => {
                            self.cond.wait_until(&mut state, next);
                        }
                        None => self.cond.wait(&mut state),
                    }
                }
                state.last_reopen_start = Instant::now();
            }

            match self.manager.maybe_refresh_blocking() {
                Ok(generation) => {
                    let mut state = self.state.lock();
                    if generation > state.searching_gen {
                        state.searching_gen = generation;
                    }
                    self.cond.notify_all();
                }
                Err(e) => warn!("failed to reopen searcher: {e}"),
            }
        }
    }
}
