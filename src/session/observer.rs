//! Delivery of engine telemetry to observers
//!
//! Each registration subscribes to the engine's event stream and runs a
//! task that turns `total_size=<N>` log lines into size updates and
//! progress events into whole percentages. Everything else the engine logs
//! is passed to `tracing` at trace level and otherwise ignored.
//!
//! Delivery is lossless and in order. It continues until the engine closes
//! its stream on termination, or until [`ObserverHandle::stop`] is called.
//! Dropping the handle leaves the registration running.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{parse_total_size, progress_percent, Engine, EngineEvent};

/// Telemetry update derived from an engine event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// Output size in bytes
    Size(u64),
    /// Completion percentage, 0 to 100
    Progress(u8),
}

impl SessionUpdate {
    /// Interpret an engine event, if it carries telemetry
    pub fn from_event(event: &EngineEvent) -> Option<Self> {
        match event {
            EngineEvent::Log { message } => {
                let size = parse_total_size(message).map(SessionUpdate::Size);
                if size.is_none() {
                    tracing::trace!(target: "engine", "{}", message);
                }
                size
            }
            EngineEvent::Progress { progress } => {
                progress_percent(*progress).map(SessionUpdate::Progress)
            }
        }
    }
}

/// Receiver of session telemetry
pub trait SessionObserver: Send + Sync + 'static {
    /// Called with the output size each time the engine reports it
    fn on_size_update(&self, size: u64);

    /// Called with the completion percentage on every progress tick
    fn on_progress_update(&self, percent: u8);
}

/// Observer built from a pair of closures
pub struct Callbacks<S, P> {
    on_size: S,
    on_progress: P,
}

impl<S, P> Callbacks<S, P>
where
    S: Fn(u64) + Send + Sync + 'static,
    P: Fn(u8) + Send + Sync + 'static,
{
    pub fn new(on_size: S, on_progress: P) -> Self {
        Self {
            on_size,
            on_progress,
        }
    }
}

impl<S, P> SessionObserver for Callbacks<S, P>
where
    S: Fn(u64) + Send + Sync + 'static,
    P: Fn(u8) + Send + Sync + 'static,
{
    fn on_size_update(&self, size: u64) {
        (self.on_size)(size)
    }

    fn on_progress_update(&self, percent: u8) {
        (self.on_progress)(percent)
    }
}

struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionUpdate>,
}

impl SessionObserver for ChannelObserver {
    fn on_size_update(&self, size: u64) {
        let _ = self.tx.send(SessionUpdate::Size(size));
    }

    fn on_progress_update(&self, percent: u8) {
        let _ = self.tx.send(SessionUpdate::Progress(percent));
    }
}

/// Handle to a running observer registration
pub struct ObserverHandle {
    task: JoinHandle<()>,
}

impl ObserverHandle {
    /// Stop delivering updates before the engine is terminated
    pub fn stop(self) {
        self.task.abort();
    }

    /// Wait until the engine closes its event stream and every pending
    /// update has been delivered
    pub async fn closed(self) {
        let _ = self.task.await;
    }
}

/// Deliver a session's telemetry to `observer`.
///
/// Must be called from within a tokio runtime.
pub fn register<E, O>(session: &E, observer: O) -> ObserverHandle
where
    E: Engine,
    O: SessionObserver,
{
    let mut events = session.subscribe();
    let task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match SessionUpdate::from_event(&event) {
                Some(SessionUpdate::Size(size)) => observer.on_size_update(size),
                Some(SessionUpdate::Progress(percent)) => observer.on_progress_update(percent),
                None => {}
            }
        }
        tracing::debug!("Engine event stream closed");
    });

    ObserverHandle { task }
}

/// Deliver a session's telemetry to a pair of callbacks
pub fn register_observers<E, S, P>(session: &E, on_size: S, on_progress: P) -> ObserverHandle
where
    E: Engine,
    S: Fn(u64) + Send + Sync + 'static,
    P: Fn(u8) + Send + Sync + 'static,
{
    register(session, Callbacks::new(on_size, on_progress))
}

/// Deliver a session's telemetry as messages on a channel
pub fn updates_channel<E: Engine>(
    session: &E,
) -> (mpsc::UnboundedReceiver<SessionUpdate>, ObserverHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = register(session, ChannelObserver { tx });
    (rx, handle)
}
