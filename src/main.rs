//! transcode-session
//!
//! Loads an input file into memory, brings up the ffmpeg core session,
//! prints a JSON summary of both to stdout and tears the session down.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcode_session::config::SessionConfig;
use transcode_session::config_file::ConfigFile;
use transcode_session::error::Result;
use transcode_session::loader::{read_file_bytes_limited, SourceFile};
use transcode_session::session::SessionManager;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "transcode-session";

#[tokio::main]
async fn main() -> Result<()> {
    let Some(input) = std::env::args().nth(1) else {
        eprintln!("usage: {} <input-file> [config.toml]", APP_NAME);
        std::process::exit(2);
    };

    // Load configuration
    let config_path = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "config.toml".to_string());
    let (config, config_error) = if std::path::Path::new(&config_path).exists() {
        match ConfigFile::from_file(&config_path) {
            Ok(cf) => (cf.into_session_config(), None),
            Err(e) => (SessionConfig::default(), Some(e)),
        }
    } else {
        (SessionConfig::default(), None)
    };

    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = config_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }
    tracing::debug!("Configuration loaded: {:?}", config);

    let manager = Arc::new(SessionManager::from_config(&config.engine));

    // The core does not stop by itself when abandoned
    {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, terminating engine session");
                manager.terminate_session();
                std::process::exit(130);
            }
        });
    }

    let file = SourceFile::open(&input).await?;
    tracing::info!("Input {} ({} MB)", file.name(), file.size_mb());
    let bytes = read_file_bytes_limited(&file, &config.loader).await?;

    let session = manager.acquire_session().await?;
    if let Some(info) = session.info() {
        tracing::info!(
            "Engine core {} ready: script={} bytes, wasm={} bytes, loaded at {}",
            info.id,
            info.script_bytes,
            info.wasm_bytes,
            info.loaded_at
        );
    }

    let summary = serde_json::json!({
        "input": file.name(),
        "bytes": bytes.len(),
        "size_mb": file.size_mb(),
        "session": session.id().to_string(),
    });
    println!("{}", summary);

    manager.terminate_session();

    Ok(())
}

/// Initialize logging with tracing
fn init_logging(config: &SessionConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("transcode_session={}", config.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
