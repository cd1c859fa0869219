//! Explicit registry of lifecycle listeners.
//!
//! Engines register themselves when they start and unregister when they close.
//! The registry only holds weak references, so a dropped engine simply
//! disappears from it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, info};
use parking_lot::RwLock;

/// Callbacks for process-level lifecycle events.
pub trait LifecycleListener: Send + Sync {
    /// The process is shutting down. Implementations release their resources.
    fn on_shutdown(&self);

    fn on_storage_registered(&self, _storage: &str) {}

    fn on_storage_unregistered(&self, _storage: &str) {}
}

/// Handle returned by [`ListenerRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<(ListenerId, Weak<dyn LifecycleListener>)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: &Arc<dyn LifecycleListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, Arc::downgrade(listener)));
        debug!("registered lifecycle listener {id:?}");
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(other, _)| *other != id);
        before != listeners.len()
    }

    /// Number of registered listeners that are still alive.
    pub fn len(&self) -> usize {
        let mut listeners = self.listeners.write();
        listeners.retain(|(_, weak)| weak.strong_count() > 0);
        listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every live listener of shutdown and empty the registry.
    ///
    /// Listeners are called without the registry lock held, so they may
    /// unregister themselves from inside `on_shutdown`.
    pub fn shutdown(&self) {
        let listeners: Vec<_> = std::mem::take(&mut *self.listeners.write());
        let live: Vec<_> = listeners
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect();

        info!("shutting down {} lifecycle listeners", live.len());
        for listener in live {
            listener.on_shutdown();
        }
    }

    pub fn storage_registered(&self, storage: &str) {
        for listener in self.live() {
            listener.on_storage_registered(storage);
        }
    }

    pub fn storage_unregistered(&self, storage: &str) {
        for listener in self.live() {
            listener.on_storage_unregistered(storage);
        }
    }

    fn live(&self) -> Vec<Arc<dyn LifecycleListener>> {
        self.listeners
            .read()
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counting {
        shutdowns: AtomicUsize,
        registered: AtomicUsize,
    }

    impl LifecycleListener for Counting {
        fn on_shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }

        fn on_storage_registered(&self, _storage: &str) {
            self.registered.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_shutdown_notifies_live_listeners_once() {
        let registry = ListenerRegistry::new();
        let counting = Arc::new(Counting::default());
        let listener: Arc<dyn LifecycleListener> = counting.clone();
        registry.register(&listener);

        registry.shutdown();
        registry.shutdown();

        assert_eq!(counting.shutdowns.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_and_dropped_listeners() {
        let registry = ListenerRegistry::new();
        let kept: Arc<dyn LifecycleListener> = Arc::new(Counting::default());
        let dropped: Arc<dyn LifecycleListener> = Arc::new(Counting::default());

        let id = registry.register(&kept);
        registry.register(&dropped);
        drop(dropped);
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_storage_events_are_broadcast() {
        let registry = ListenerRegistry::new();
        let counting = Arc::new(Counting::default());
        let listener: Arc<dyn LifecycleListener> = counting.clone();
        registry.register(&listener);

        registry.storage_registered("db");
        registry.storage_unregistered("db");
        assert_eq!(counting.registered.load(Ordering::SeqCst), 1);
    }
}
