//! Engine backed by the remotely hosted ffmpeg core
//!
//! `CoreEngine` fetches the core script module and its WebAssembly binary,
//! checks that the binary is a wasm module, and keeps both payloads in
//! memory for the runtime host. The host executing the core reports its
//! output back through [`CoreEngine::emit`], which fans events out to every
//! subscriber. Terminating the instance closes the event stream.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{CoreResources, Engine, EngineEvent, EventFanout};
use crate::error::EngineLoadError;

/// `\0asm` followed by binary format version 1
const WASM_HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

/// Fetched core payloads
#[derive(Debug)]
struct LoadedCore {
    script: Bytes,
    wasm: Bytes,
    loaded_at: DateTime<Utc>,
}

/// Summary of a loaded core, for logging and display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreInfo {
    pub id: Uuid,
    pub script_bytes: usize,
    pub wasm_bytes: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Engine instance whose runtime is fetched over HTTP
#[derive(Debug)]
pub struct CoreEngine {
    id: Uuid,
    client: reqwest::Client,
    fetch_timeout: Option<Duration>,
    events: EventFanout,
    core: RwLock<Option<LoadedCore>>,
    terminated: AtomicBool,
}

impl CoreEngine {
    /// Create an unloaded engine
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Create an unloaded engine whose resource fetches time out after `timeout`
    pub fn with_timeout(fetch_timeout: Option<Duration>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client: reqwest::Client::new(),
            fetch_timeout,
            events: EventFanout::new(),
            core: RwLock::new(None),
            terminated: AtomicBool::new(false),
        }
    }

    /// Unique id of this instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Check whether the core has been fetched and not yet released
    pub fn is_loaded(&self) -> bool {
        self.core.read().is_some()
    }

    /// Check whether the instance has been terminated
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Get a summary of the loaded core
    pub fn info(&self) -> Option<CoreInfo> {
        self.core.read().as_ref().map(|core| CoreInfo {
            id: self.id,
            script_bytes: core.script.len(),
            wasm_bytes: core.wasm.len(),
            loaded_at: core.loaded_at,
        })
    }

    /// Publish an event to all subscribers.
    ///
    /// Events are dropped once the instance is terminated.
    pub fn emit(&self, event: EngineEvent) {
        self.events.emit(event);
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, EngineLoadError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.fetch_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| EngineLoadError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineLoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| EngineLoadError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for CoreEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for CoreEngine {
    async fn load(&self, resources: &CoreResources) -> Result<(), EngineLoadError> {
        if self.is_terminated() {
            return Err(EngineLoadError::Bootstrap(
                "engine instance has been terminated".to_string(),
            ));
        }

        tracing::debug!(
            "Fetching engine core {} ({}, {})",
            self.id,
            resources.core_url,
            resources.wasm_url
        );

        let (script, wasm) = tokio::try_join!(
            self.fetch(&resources.core_url),
            self.fetch(&resources.wasm_url)
        )?;

        if script.is_empty() {
            return Err(EngineLoadError::InvalidCore(format!(
                "empty script module from {}",
                resources.core_url
            )));
        }
        validate_wasm(&wasm)?;

        tracing::info!(
            "Engine core {} loaded: script={} bytes, wasm={} bytes",
            self.id,
            script.len(),
            wasm.len()
        );

        // terminate() raises the flag before taking this lock
        let mut core = self.core.write();
        if self.is_terminated() {
            return Err(EngineLoadError::Aborted);
        }
        *core = Some(LoadedCore {
            script,
            wasm,
            loaded_at: Utc::now(),
        });

        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        self.events.subscribe()
    }

    fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        self.core.write().take();
        self.events.close();
        tracing::info!("Engine core {} terminated", self.id);
    }
}

/// Check that `bytes` starts with a version 1 WebAssembly module header
pub fn validate_wasm(bytes: &[u8]) -> Result<(), EngineLoadError> {
    if bytes.len() < WASM_HEADER.len() {
        return Err(EngineLoadError::InvalidCore(format!(
            "wasm binary too short ({} bytes)",
            bytes.len()
        )));
    }
    if bytes[..4] != WASM_HEADER[..4] {
        return Err(EngineLoadError::InvalidCore(
            "missing wasm magic number".to_string(),
        ));
    }
    if bytes[4..8] != WASM_HEADER[4..8] {
        return Err(EngineLoadError::InvalidCore(format!(
            "unsupported wasm version {:?}",
            &bytes[4..8]
        )));
    }
    Ok(())
}
