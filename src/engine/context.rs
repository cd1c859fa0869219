//! Process-wide resources shared by every engine.

use std::sync::Arc;

use log::info;

use crate::error::Result;
use crate::lifecycle::{ListenerRegistry, Timer};

/// The listener registry and timer engines are constructed with.
#[derive(Debug, Clone)]
pub struct EngineContext {
    registry: Arc<ListenerRegistry>,
    timer: Arc<Timer>,
}

impl EngineContext {
    /// Create a fresh registry and spawn the shared timer thread.
    pub fn new() -> Result<Self> {
        Ok(EngineContext {
            registry: Arc::new(ListenerRegistry::new()),
            timer: Arc::new(Timer::new("engines")?),
        })
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    pub fn timer(&self) -> &Arc<Timer> {
        &self.timer
    }

    /// Close every registered engine, then stop the timer.
    pub fn shutdown(&self) {
        info!("shutting down engine context");
        self.registry.shutdown();
        self.timer.shutdown();
    }
}
