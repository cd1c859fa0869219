//! Periodic commit of an open index.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, error};
use parking_lot::Mutex;

use crate::error::Result;
use crate::lifecycle::timer::{Timer, TimerHandle};

/// Something the scheduler commits.
pub trait CommitTarget: Send + Sync {
    fn is_closed(&self) -> bool;

    /// Reclaim deletes and commit.
    fn flush(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Ticks that flushed the target.
    pub commits: u64,
    /// Ticks skipped because the target was closed.
    pub skipped: u64,
    /// Ticks whose flush failed on an open target.
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    commits: AtomicU64,
    skipped: AtomicU64,
    failures: AtomicU64,
}

/// Owns the commit task of one engine on the shared [`Timer`].
#[derive(Debug)]
pub struct CommitScheduler {
    timer: Arc<Timer>,
    delay: Duration,
    period: Duration,
    handle: Mutex<Option<TimerHandle>>,
    counters: Arc<Counters>,
}

impl CommitScheduler {
    pub fn new(timer: Arc<Timer>, delay: Duration, period: Duration) -> Self {
        CommitScheduler {
            timer,
            delay,
            period,
            handle: Mutex::new(None),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Schedule the commit task unless it is already scheduled.
    ///
    /// The task holds `target` weakly and stops doing anything once it is gone.
    pub fn schedule(&self, target: Weak<dyn CommitTarget>) -> Result<()> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(());
        }

        let counters = Arc::clone(&self.counters);
        *handle = Some(self.timer.schedule_at_fixed_rate(
            self.delay,
            self.period,
            move || {
                let Some(target) = target.upgrade() else {
                    return;
                };
                if target.is_closed() {
                    debug!("index closed, skipping scheduled commit");
                    counters.skipped.fetch_add(1, Ordering::SeqCst);
                    return;
                }
                match target.flush() {
                    Ok(()) => {
                        counters.commits.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) if target.is_closed() => {
                        debug!("index closed during scheduled commit: {e}");
                        counters.skipped.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        error!("scheduled commit failed: {e}");
                        counters.failures.fetch_add(1, Ordering::SeqCst);
                    }
                }
            },
        )?);
        Ok(())
    }

    /// Cancel the task. Returns `true` if a scheduled task was cancelled by this call.
    ///
    /// A tick already running finishes before this returns.
    pub fn cancel(&self) -> bool {
        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => handle.cancel(),
            None => false,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.handle.lock().is_some()
    }

    pub fn stats(&self) -> CommitStats {
        CommitStats {
            commits: self.counters.commits.load(Ordering::SeqCst),
            skipped: self.counters.skipped.load(Ordering::SeqCst),
            failures: self.counters.failures.load(Ordering::SeqCst),
        }
    }
}

impl Drop for CommitScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::thread;
    use std::time::Instant;

    #[derive(Default)]
    struct Target {
        closed: AtomicBool,
        flushes: AtomicUsize,
    }

    impl CommitTarget for Target {
        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        fn flush(&self) -> Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn scheduler(timer: &Arc<Timer>) -> CommitScheduler {
        CommitScheduler::new(
            Arc::clone(timer),
            Duration::from_millis(5),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_ticks_flush_open_target() {
        let timer = Arc::new(Timer::new("commit").unwrap());
        let scheduler = scheduler(&timer);
        let target = Arc::new(Target::default());
        let weak: Weak<dyn CommitTarget> = Arc::downgrade(&target) as Weak<dyn CommitTarget>;

        scheduler.schedule(weak.clone()).unwrap();
        scheduler.schedule(weak).unwrap();
        assert!(scheduler.is_scheduled());

        assert!(wait_until(|| target.flushes.load(Ordering::SeqCst) >= 2));
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());
        assert_eq!(timer.stats().tasks_scheduled, 1);
        assert_eq!(timer.stats().tasks_cancelled, 1);
    }

    #[test]
    fn test_closed_target_is_skipped() {
        let timer = Arc::new(Timer::new("skip").unwrap());
        let scheduler = scheduler(&timer);
        let target = Arc::new(Target::default());
        target.closed.store(true, Ordering::SeqCst);

        scheduler
            .schedule(Arc::downgrade(&target) as Weak<dyn CommitTarget>)
            .unwrap();

        assert!(wait_until(|| scheduler.stats().skipped >= 2));
        assert_eq!(target.flushes.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.stats().commits, 0);
        scheduler.cancel();
    }

    #[test]
    fn test_dropped_scheduler_cancels_its_task() {
        let timer = Arc::new(Timer::new("drop").unwrap());
        let target = Arc::new(Target::default());
        let scheduler = scheduler(&timer);
        scheduler
            .schedule(Arc::downgrade(&target) as Weak<dyn CommitTarget>)
            .unwrap();
        assert!(wait_until(|| target.flushes.load(Ordering::SeqCst) >= 1));

        drop(scheduler);
        let flushes = target.flushes.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(target.flushes.load(Ordering::SeqCst), flushes);
        assert_eq!(timer.stats().tasks_cancelled, 1);
    }
}
