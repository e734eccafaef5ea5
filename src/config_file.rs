//! Configuration file support
//!
//! Loads session configuration from TOML files. Every section is optional
//! so a file only needs to name what it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{EngineConfig, LoaderConfig, SessionConfig};
use crate::error::{Result, SessionError};

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Engine core settings
    pub engine: Option<EngineSettings>,
    /// File loader settings
    pub loader: Option<LoaderSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// URL of the core script module
    pub core_url: Option<String>,
    /// URL of the core WebAssembly binary
    pub wasm_url: Option<String>,
    /// Fetch timeout in seconds
    pub fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSettings {
    /// Maximum file size in MB
    pub max_file_size_mb: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SessionError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let engine = EngineConfig::default();
        Self {
            engine: Some(EngineSettings {
                core_url: Some(engine.core_url),
                wasm_url: Some(engine.wasm_url),
                fetch_timeout_secs: Some(60),
            }),
            loader: Some(LoaderSettings {
                max_file_size_mb: Some(2048),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to SessionConfig, filling gaps with defaults
    pub fn into_session_config(self) -> SessionConfig {
        let defaults = SessionConfig::default();

        let engine = match self.engine {
            Some(e) => EngineConfig {
                core_url: e.core_url.unwrap_or(defaults.engine.core_url),
                wasm_url: e.wasm_url.unwrap_or(defaults.engine.wasm_url),
                fetch_timeout_secs: e.fetch_timeout_secs,
            },
            None => defaults.engine,
        };

        let loader = LoaderConfig {
            max_file_size_mb: self.loader.and_then(|l| l.max_file_size_mb),
        };

        let (log_level, log_json) = match self.logging {
            Some(l) => (l.level, l.format.as_deref() == Some("json")),
            None => (defaults.log_level, defaults.log_json),
        };

        SessionConfig {
            engine,
            loader,
            log_level,
            log_json,
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigFile::default_config().to_file(path)
}
