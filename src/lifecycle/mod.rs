//! Process-level lifecycle plumbing: listener registry and the shared timer.

pub mod registry;
pub mod timer;

pub use registry::{LifecycleListener, ListenerId, ListenerRegistry};
pub use timer::{Timer, TimerHandle, TimerStats};
