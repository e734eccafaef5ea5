//! Session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::CoreResources;

/// Pinned location of the engine script module
pub const DEFAULT_CORE_URL: &str =
    "https://unpkg.com/@ffmpeg/core@0.12.6/dist/esm/ffmpeg-core.js";

/// Pinned location of the engine WebAssembly binary
pub const DEFAULT_WASM_URL: &str =
    "https://unpkg.com/@ffmpeg/core@0.12.6/dist/esm/ffmpeg-core.wasm";

/// Engine core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// URL of the core script module
    pub core_url: String,

    /// URL of the core WebAssembly binary
    pub wasm_url: String,

    /// Timeout for fetching each core resource, in seconds
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            core_url: DEFAULT_CORE_URL.to_string(),
            wasm_url: DEFAULT_WASM_URL.to_string(),
            fetch_timeout_secs: None,
        }
    }
}

impl EngineConfig {
    /// Resource locations handed to the engine's load step
    pub fn resources(&self) -> CoreResources {
        CoreResources {
            core_url: self.core_url.clone(),
            wasm_url: self.wasm_url.clone(),
        }
    }

    /// Get the fetch timeout, if any
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

/// File loader configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Refuse to load files larger than this, in megabytes
    pub max_file_size_mb: Option<u64>,
}

impl LoaderConfig {
    /// Get the size limit in bytes, saturating for absurdly large settings
    pub fn max_file_size_bytes(&self) -> Option<u64> {
        self.max_file_size_mb.map(|mb| mb.saturating_mul(1024 * 1024))
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit logs as JSON instead of the human-readable format
    pub log_json: bool,

    /// Engine configuration
    pub engine: EngineConfig,

    /// Loader configuration
    pub loader: LoaderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            engine: EngineConfig::default(),
            loader: LoaderConfig::default(),
        }
    }
}
