//! Shared timer running periodic tasks on a single background thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, error};
use parking_lot::{Mutex, RwLock};

use crate::error::{LucernaError, Result};

type Task = Box<dyn FnMut() + Send>;

/// Statistics about scheduled tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// Tasks handed to the timer.
    pub tasks_scheduled: u64,

    /// Individual task runs.
    pub tasks_executed: u64,

    /// Tasks cancelled through their handle.
    pub tasks_cancelled: u64,
}

enum Command {
    Schedule(Entry),
    Shutdown,
}

struct Entry {
    next: Instant,
    period: Duration,
    task: Task,
    cancelled: Arc<AtomicBool>,
    run_guard: Arc<Mutex<()>>,
}

/// Cancellable handle of a scheduled task.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    run_guard: Arc<Mutex<()>>,
    timer_thread: ThreadId,
    stats: Arc<RwLock<TimerStats>>,
}

impl TimerHandle {
    /// Cancel the task. Returns `true` only for the call that cancelled it.
    ///
    /// Waits for a run already in progress to finish, so once this returns the
    /// task is not running and never runs again. Called from inside a task on
    /// the timer thread, it returns without waiting.
    pub fn cancel(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::SeqCst);
        if first {
            self.stats.write().tasks_cancelled += 1;
        }
        if thread::current().id() != self.timer_thread {
            drop(self.run_guard.lock());
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A process-wide timer shared by every engine.
#[derive(Debug)]
pub struct Timer {
    sender: Sender<Command>,
    stats: Arc<RwLock<TimerStats>>,
    running: AtomicBool,
    worker_id: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Timer {
    /// Spawn the timer thread.
    pub fn new(name: &str) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let stats = Arc::new(RwLock::new(TimerStats::default()));

        let worker_stats = Arc::clone(&stats);
        let worker = thread::Builder::new()
            .name(format!("lucerna-timer-{name}"))
            .spawn(move || run(receiver, worker_stats))?;

        Ok(Timer {
            sender,
            stats,
            running: AtomicBool::new(true),
            worker_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Run `task` after `delay`, then every `period`.
    pub fn schedule_at_fixed_rate<F>(
        &self,
        delay: Duration,
        period: Duration,
        task: F,
    ) -> Result<TimerHandle>
    where
        F: FnMut() + Send + 'static,
    {
        if !self.running.load(Ordering::Acquire) {
            return Err(LucernaError::closed("timer has been shut down"));
        }
        if period.is_zero() {
            return Err(LucernaError::invalid_argument("timer period must be positive"));
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let run_guard = Arc::new(Mutex::new(()));
        let entry = Entry {
            next: Instant::now() + delay,
            period,
            task: Box::new(task),
            cancelled: Arc::clone(&cancelled),
            run_guard: Arc::clone(&run_guard),
        };
        self.sender
            .send(Command::Schedule(entry))
            .map_err(|_| LucernaError::closed("timer thread has stopped"))?;
        self.stats.write().tasks_scheduled += 1;

        Ok(TimerHandle {
            cancelled,
            run_guard,
            timer_thread: self.worker_id,
            stats: Arc::clone(&self.stats),
        })
    }

    pub fn stats(&self) -> TimerStats {
        self.stats.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the timer thread and wait for it. Pending tasks never run again.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.send(Command::Shutdown);
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        // Dropped from inside a task: the thread exits on its own.
        if self.worker_id == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            error!("timer thread panicked");
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(receiver: Receiver<Command>, stats: Arc<RwLock<TimerStats>>) {
    let mut entries: Vec<Entry> = Vec::new();

    loop {
        entries.retain(|entry| !entry.cancelled.load(Ordering::SeqCst));

        let command = match entries.iter().map(|entry| entry.next).min() {
            Some(next) => {
                let wait = next.saturating_duration_since(Instant::now());
                receiver.recv_timeout(wait)
            }
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match command {
            Ok(Command::Schedule(entry)) => entries.push(entry),
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        for entry in entries.iter_mut().filter(|entry| entry.next <= now) {
            let run_guard = Arc::clone(&entry.run_guard);
            let _running = run_guard.lock();
            if entry.cancelled.load(Ordering::SeqCst) {
                continue;
            }

            if catch_unwind(AssertUnwindSafe(|| (entry.task)())).is_err() {
                error!("timer task panicked");
            }
            stats.write().tasks_executed += 1;

            entry.next += entry.period;
            if entry.next <= now {
                entry.next = now + entry.period;
            }
        }
    }

    debug!("timer thread stopped with {} tasks pending", entries.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

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

    #[test]
    fn test_task_runs_repeatedly() {
        let timer = Timer::new("test").unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let handle = timer
            .schedule_at_fixed_rate(Duration::ZERO, Duration::from_millis(10), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert!(wait_until(|| runs.load(Ordering::SeqCst) >= 3));
        assert!(handle.cancel());
        timer.shutdown();

        let stats = timer.stats();
        assert_eq!(stats.tasks_scheduled, 1);
        assert_eq!(stats.tasks_cancelled, 1);
        assert!(stats.tasks_executed >= 3);
    }

    #[test]
    fn test_cancel_is_reported_once() {
        let timer = Timer::new("cancel").unwrap();
        let handle = timer
            .schedule_at_fixed_rate(Duration::from_secs(60), Duration::from_secs(60), || {})
            .unwrap();

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(!handle.clone().cancel());
        assert!(handle.is_cancelled());
        assert_eq!(timer.stats().tasks_cancelled, 1);
    }

    #[test]
    fn test_cancelled_task_does_not_run() {
        let timer = Timer::new("skip").unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let handle = timer
            .schedule_at_fixed_rate(Duration::from_millis(50), Duration::from_millis(50), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        handle.cancel();

        thread::sleep(Duration::from_millis(150));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_waits_for_running_task() {
        let timer = Timer::new("inflight").unwrap();
        let started = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (started_flag, finished_flag) = (Arc::clone(&started), Arc::clone(&finished));

        let handle = timer
            .schedule_at_fixed_rate(Duration::ZERO, Duration::from_secs(60), move || {
                started_flag.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(100));
                finished_flag.store(true, Ordering::SeqCst);
            })
            .unwrap();

        assert!(wait_until(|| started.load(Ordering::SeqCst)));
        assert!(handle.cancel());
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_task_can_cancel_itself() {
        let timer = Timer::new("self-cancel").unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<TimerHandle>>> = Arc::new(Mutex::new(None));
        let (counter, own_handle) = (Arc::clone(&runs), Arc::clone(&slot));

        let handle = timer
            .schedule_at_fixed_rate(Duration::from_millis(20), Duration::from_millis(5), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(handle) = own_handle.lock().as_ref() {
                    handle.cancel();
                }
            })
            .unwrap();
        *slot.lock() = Some(handle.clone());

        assert!(wait_until(|| handle.is_cancelled()));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(timer.stats().tasks_cancelled, 1);
    }

    #[test]
    fn test_panicking_task_keeps_timer_alive() {
        let timer = Timer::new("panic").unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        timer
            .schedule_at_fixed_rate(Duration::ZERO, Duration::from_millis(10), || {
                panic!("boom");
            })
            .unwrap();
        timer
            .schedule_at_fixed_rate(Duration::ZERO, Duration::from_millis(10), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert!(wait_until(|| runs.load(Ordering::SeqCst) >= 2));
    }

    #[test]
    fn test_schedule_after_shutdown_fails() {
        let timer = Timer::new("closed").unwrap();
        timer.shutdown();
        timer.shutdown();

        assert!(!timer.is_running());
        let result = timer.schedule_at_fixed_rate(Duration::ZERO, Duration::from_secs(1), || {});
        assert!(matches!(result, Err(LucernaError::Closed(_))));
    }
}
