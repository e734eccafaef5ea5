//! Memoized engine session
//!
//! `SessionManager` owns the single engine instance of an application. The
//! first `acquire_session` call constructs an engine and starts its load;
//! the load future is shared, so every caller arriving while it runs waits
//! on the same load and receives the same instance. `terminate_session`
//! releases the instance and the next acquire starts over.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::{CoreEngine, CoreResources, Engine};
use crate::error::EngineLoadError;

type LoadFuture<E> = Shared<BoxFuture<'static, Result<Arc<E>, EngineLoadError>>>;

/// Observable lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready,
    Terminated,
}

/// Internal slot holding the memoized instance.
///
/// `generation` identifies which load produced an instance, so a waiter
/// whose load was terminated midway can tell it has been superseded.
enum Slot<E> {
    Uninitialized,
    Loading {
        generation: u64,
        engine: Arc<E>,
        load: LoadFuture<E>,
    },
    Ready {
        generation: u64,
        engine: Arc<E>,
    },
    Terminated,
}

/// Owner of the application's engine instance
pub struct SessionManager<E: Engine> {
    factory: Box<dyn Fn() -> E + Send + Sync>,
    resources: CoreResources,
    slot: Mutex<Slot<E>>,
    loads_started: AtomicU64,
}

impl<E: Engine> SessionManager<E> {
    /// Create a manager that builds instances with `factory` and loads them
    /// from `resources`
    pub fn new<F>(resources: CoreResources, factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            resources,
            slot: Mutex::new(Slot::Uninitialized),
            loads_started: AtomicU64::new(0),
        }
    }

    /// Resource locations passed to every load
    pub fn resources(&self) -> &CoreResources {
        &self.resources
    }

    /// Get the loaded instance, constructing and loading one if needed.
    ///
    /// Overlapping calls share a single load. A failed load leaves no
    /// instance behind and is not retried; calling again starts a new load.
    pub async fn acquire_session(&self) -> Result<Arc<E>, EngineLoadError> {
        let (generation, load) = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Ready { engine, .. } => return Ok(Arc::clone(engine)),
                Slot::Loading {
                    generation, load, ..
                } => (*generation, load.clone()),
                Slot::Uninitialized | Slot::Terminated => {
                    let generation = self.loads_started.fetch_add(1, Ordering::SeqCst) + 1;
                    let engine = Arc::new((self.factory)());
                    let load = Self::start_load(Arc::clone(&engine), self.resources.clone());
                    tracing::info!("Loading engine session (load #{})", generation);
                    *slot = Slot::Loading {
                        generation,
                        engine,
                        load: load.clone(),
                    };
                    (generation, load)
                }
            }
        };

        let result = load.await;

        let mut slot = self.slot.lock();
        let in_flight = matches!(
            &*slot,
            Slot::Loading { generation: g, .. } if *g == generation
        );
        let current = in_flight
            || matches!(
                &*slot,
                Slot::Ready { generation: g, .. } if *g == generation
            );

        match result {
            Ok(engine) if current => {
                if in_flight {
                    tracing::info!("Engine session ready (load #{})", generation);
                    *slot = Slot::Ready {
                        generation,
                        engine: Arc::clone(&engine),
                    };
                }
                Ok(engine)
            }
            Ok(engine) => {
                drop(slot);
                // Terminated while loading; make sure the orphan is released
                engine.terminate();
                Err(EngineLoadError::Aborted)
            }
            Err(err) => {
                if in_flight {
                    tracing::warn!("Engine session load #{} failed: {}", generation, err);
                    *slot = Slot::Uninitialized;
                }
                Err(err)
            }
        }
    }

    fn start_load(engine: Arc<E>, resources: CoreResources) -> LoadFuture<E> {
        async move {
            let loaded = engine.load(&resources).await;
            loaded.map(|()| engine)
        }
        .boxed()
        .shared()
    }

    /// Get the instance if it is loaded, without starting a load
    pub fn session(&self) -> Option<Arc<E>> {
        match &*self.slot.lock() {
            Slot::Ready { engine, .. } => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    /// Terminate the current instance, loading or loaded.
    ///
    /// Returns `false` when there was nothing to terminate.
    pub fn terminate_session(&self) -> bool {
        let engine = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Terminated) {
                Slot::Loading { engine, .. } | Slot::Ready { engine, .. } => engine,
                previous => {
                    *slot = previous;
                    return false;
                }
            }
        };

        engine.terminate();
        tracing::info!("Engine session terminated");
        true
    }

    /// Snapshot of the lifecycle state
    pub fn state(&self) -> SessionState {
        match &*self.slot.lock() {
            Slot::Uninitialized => SessionState::Uninitialized,
            Slot::Loading { .. } => SessionState::Loading,
            Slot::Ready { .. } => SessionState::Ready,
            Slot::Terminated => SessionState::Terminated,
        }
    }

    /// Number of loads started over the manager's lifetime
    pub fn loads_started(&self) -> u64 {
        self.loads_started.load(Ordering::SeqCst)
    }
}

impl SessionManager<CoreEngine> {
    /// Manager for the remotely hosted core described by `config`
    pub fn from_config(config: &EngineConfig) -> Self {
        let timeout = config.fetch_timeout();
        Self::new(config.resources(), move || CoreEngine::with_timeout(timeout))
    }
}

impl<E: Engine> Drop for SessionManager<E> {
    fn drop(&mut self) {
        self.terminate_session();
    }
}
