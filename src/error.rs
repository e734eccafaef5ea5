use thiserror::Error;

/// Main error type for the session layer
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Engine load error: {0}")]
    EngineLoad(#[from] EngineLoadError),

    #[error("File read error: {0}")]
    FileRead(#[from] FileReadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while fetching or bootstrapping the engine core.
///
/// Cloneable because a single in-flight load result is handed to every
/// caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineLoadError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid engine core: {0}")]
    InvalidCore(String),

    #[error("Engine bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Session was terminated while loading")]
    Aborted,
}

/// Errors raised while reading a source file into memory
#[derive(Error, Debug)]
pub enum FileReadError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Size mismatch for {name}: expected {expected} bytes, read {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("File {name} is {size} bytes, limit is {limit}")]
    TooLarge { name: String, size: u64, limit: u64 },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SessionError>;
