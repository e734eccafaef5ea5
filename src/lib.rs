//! Session layer for a remotely hosted ffmpeg core
//!
//! Provides a memoized, single-flight session around the transcoding
//! engine, delivery of its size and progress telemetry to observers, and
//! helpers for loading input files into memory and formatting sizes.

pub mod config;
pub mod config_file;
pub mod engine;
pub mod error;
pub mod format;
pub mod loader;
pub mod session;

#[cfg(test)]
mod integration;

pub use config::SessionConfig;
pub use engine::{CoreEngine, CoreResources, Engine, EngineEvent};
pub use error::{EngineLoadError, FileReadError, Result, SessionError};
pub use format::bytes_to_mb;
pub use loader::{read_file_bytes, SourceFile};
pub use session::{
    register_observers, updates_channel, ObserverHandle, SessionManager, SessionObserver,
    SessionState, SessionUpdate,
};
