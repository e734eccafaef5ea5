//! Session module - ownership of the engine instance and its telemetry
//!
//! This module handles:
//! - Lazy, single-flight initialization of the engine (`SessionManager`)
//! - Termination and re-initialization
//! - Delivery of size and progress updates to observers

pub mod manager;
pub mod observer;

pub use manager::{SessionManager, SessionState};
pub use observer::{
    register, register_observers, updates_channel, Callbacks, ObserverHandle, SessionObserver,
    SessionUpdate,
};
