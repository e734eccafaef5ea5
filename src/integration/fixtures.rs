//! Test fixtures for integration tests
//!
//! Provides a scripted engine, a local HTTP server hosting a fake core,
//! and readers that fail mid-stream.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{CoreResources, Engine, EngineEvent, EventFanout};
use crate::error::EngineLoadError;

/// Script module served by [`CoreServer`]
pub const CORE_SCRIPT: &[u8] = b"export default function createFFmpegCore() {}\n";

/// Smallest valid WebAssembly module: header only
pub fn minimal_wasm() -> Vec<u8> {
    vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]
}

/// Resource locations that are never fetched by the scripted engine
pub fn test_resources() -> CoreResources {
    CoreResources {
        core_url: "http://core.test/ffmpeg-core.js".to_string(),
        wasm_url: "http://core.test/ffmpeg-core.wasm".to_string(),
    }
}

#[derive(Debug)]
struct FakeInner {
    id: usize,
    delay: Duration,
    fail: bool,
    loads: AtomicUsize,
    resources: Mutex<Option<CoreResources>>,
    events: EventFanout,
    terminated: AtomicBool,
}

/// Scripted engine: loads after a fixed delay, optionally failing
#[derive(Debug, Clone)]
pub struct FakeEngine {
    inner: Arc<FakeInner>,
}

impl FakeEngine {
    fn new(id: usize, delay: Duration, fail: bool) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                id,
                delay,
                fail,
                loads: AtomicUsize::new(0),
                resources: Mutex::new(None),
                events: EventFanout::new(),
                terminated: AtomicBool::new(false),
            }),
        }
    }

    /// An engine not created through a factory
    pub fn standalone() -> Self {
        Self::new(0, Duration::ZERO, false)
    }

    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// Number of times `load` was called on this instance
    pub fn loads(&self) -> usize {
        self.inner.loads.load(Ordering::SeqCst)
    }

    /// Resources passed to the most recent load
    pub fn resources(&self) -> Option<CoreResources> {
        self.inner.resources.lock().clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: EngineEvent) {
        self.inner.events.emit(event);
    }

    pub fn log(&self, message: &str) {
        self.emit(EngineEvent::Log {
            message: message.to_string(),
        });
    }

    pub fn progress(&self, progress: f64) {
        self.emit(EngineEvent::Progress { progress });
    }
}

impl Engine for FakeEngine {
    async fn load(&self, resources: &CoreResources) -> Result<(), EngineLoadError> {
        self.inner.loads.fetch_add(1, Ordering::SeqCst);
        *self.inner.resources.lock() = Some(resources.clone());

        if !self.inner.delay.is_zero() {
            tokio::time::sleep(self.inner.delay).await;
        }

        if self.inner.fail {
            return Err(EngineLoadError::Fetch {
                url: resources.core_url.clone(),
                reason: "connection refused".to_string(),
            });
        }
        if self.is_terminated() {
            return Err(EngineLoadError::Aborted);
        }
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    fn terminate(&self) {
        self.inner.terminated.store(true, Ordering::SeqCst);
        self.inner.events.close();
    }
}

/// Builds [`FakeEngine`]s and remembers every instance it made
pub struct FakeEngineFactory {
    delay: Duration,
    fail_next: Arc<AtomicBool>,
    instances: Arc<Mutex<Vec<FakeEngine>>>,
}

impl FakeEngineFactory {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_next: Arc::new(AtomicBool::new(false)),
            instances: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make the next instance's load fail
    pub fn fail_next_load(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of instances created so far
    pub fn created(&self) -> usize {
        self.instances.lock().len()
    }

    /// Most recently created instance
    pub fn last(&self) -> Option<FakeEngine> {
        self.instances.lock().last().cloned()
    }

    pub fn build(&self) -> impl Fn() -> FakeEngine + Send + Sync + 'static {
        let delay = self.delay;
        let fail_next = Arc::clone(&self.fail_next);
        let instances = Arc::clone(&self.instances);
        move || {
            let mut instances = instances.lock();
            let fail = fail_next.swap(false, Ordering::SeqCst);
            let engine = FakeEngine::new(instances.len() + 1, delay, fail);
            instances.push(engine.clone());
            engine
        }
    }
}

#[derive(Clone)]
struct ServerState {
    requests: Arc<AtomicUsize>,
    delay: Duration,
}

impl ServerState {
    async fn record(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

async fn core_script(State(state): State<ServerState>) -> Response {
    state.record().await;
    ([(header::CONTENT_TYPE, "text/javascript")], CORE_SCRIPT).into_response()
}

async fn core_wasm(State(state): State<ServerState>) -> Response {
    state.record().await;
    ([(header::CONTENT_TYPE, "application/wasm")], minimal_wasm()).into_response()
}

async fn not_found(State(state): State<ServerState>) -> Response {
    state.record().await;
    (StatusCode::NOT_FOUND, "not found").into_response()
}

/// Local HTTP server hosting the core script and wasm binary
pub struct CoreServer {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl CoreServer {
    pub async fn start() -> Self {
        Self::start_with_delay(Duration::ZERO).await
    }

    /// Start a server that waits `delay` before answering each request
    pub async fn start_with_delay(delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));

        let app = Router::new()
            .route("/ffmpeg-core.js", get(core_script))
            .route("/ffmpeg-core.wasm", get(core_wasm))
            .fallback(not_found)
            .with_state(ServerState {
                requests: Arc::clone(&requests),
                delay,
            });

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn resources(&self) -> CoreResources {
        CoreResources {
            core_url: self.url("/ffmpeg-core.js"),
            wasm_url: self.url("/ffmpeg-core.wasm"),
        }
    }

    /// Number of requests answered so far, including 404s
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for CoreServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Reader that yields `data` and then fails
pub struct FailingReader {
    data: Vec<u8>,
    pos: usize,
}

impl FailingReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.pos < this.data.len() {
            let n = buf.remaining().min(this.data.len() - this.pos);
            buf.put_slice(&this.data[this.pos..this.pos + n]);
            this.pos += n;
            Poll::Ready(Ok(()))
        } else {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "file handle revoked",
            )))
        }
    }
}
