//! Engine module - the seam between the session layer and the transcoding core
//!
//! This module handles:
//! - The `Engine` trait every core implementation provides
//! - The event stream an engine emits (log lines, progress ticks)
//! - Parsing of telemetry carried in those events
//! - `CoreEngine`, which fetches the remote script and wasm resources

pub mod remote;
pub mod events;

use std::future::Future;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::EngineLoadError;

pub use remote::CoreEngine;
pub use events::{parse_total_size, progress_percent};

/// Remote locations forming the engine runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreResources {
    /// Script module URL
    pub core_url: String,
    /// WebAssembly binary URL
    pub wasm_url: String,
}

/// Events emitted by a running engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A free-text diagnostic line
    Log { message: String },
    /// Fractional completion of the current operation, nominally in [0, 1]
    Progress { progress: f64 },
}

/// A transcoding engine instance.
///
/// Implementations are constructed unloaded; `load` must complete before the
/// instance is handed out as a session.
pub trait Engine: Send + Sync + 'static {
    /// Fetch and bootstrap the runtime from `resources`
    fn load(
        &self,
        resources: &CoreResources,
    ) -> impl Future<Output = Result<(), EngineLoadError>> + Send;

    /// Subscribe to the engine's event stream.
    ///
    /// Every event emitted after this call is delivered, in order, until
    /// the engine is terminated; the stream then ends.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent>;

    /// Release the runtime. Must be safe to call more than once.
    fn terminate(&self);
}

/// Lossless fan-out of engine events.
///
/// Each subscriber gets its own unbounded queue, so a slow observer never
/// misses events. Closing drops every sender, which ends the subscribers'
/// streams once they have drained what was already queued.
#[derive(Debug)]
pub struct EventFanout {
    subscribers: Mutex<Option<Vec<mpsc::UnboundedSender<EngineEvent>>>>,
}

impl EventFanout {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Some(Vec::new())),
        }
    }

    /// Add a subscriber. After `close` the returned stream is already ended.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(subscribers) = self.subscribers.lock().as_mut() {
            subscribers.push(tx);
        }
        rx
    }

    /// Queue `event` for every live subscriber, forgetting dropped ones
    pub fn emit(&self, event: EngineEvent) {
        if let Some(subscribers) = self.subscribers.lock().as_mut() {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// End every stream. Later events are dropped.
    pub fn close(&self) {
        self.subscribers.lock().take();
    }
}

impl Default for EventFanout {
    fn default() -> Self {
        Self::new()
    }
}
