//! Error types for the offline engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Network-layer errors raised by a [`Network`](crate::net::Network) implementation.
///
/// Every variant means the request did not reach the server or did not come
/// back. HTTP error statuses are not network errors; they travel back to the
/// strategies as ordinary responses.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Request timed out")]
    Timeout,

    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_connect() {
            NetworkError::Connect(err.to_string())
        } else {
            NetworkError::Transport(err.to_string())
        }
    }
}

/// Errors from the durable stores (cache entries and queue items)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Could not determine a data directory")]
    NoHome,

    #[error("Refusing to cache response with status {0}")]
    NotCacheable(u16),

    #[error("Queued item {0} carries an invalid HTTP method")]
    InvalidMethod(i64),
}

/// Install failures are fatal to the attempted generation, never to the
/// previous one.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Precache fetch failed for {url}: {reason}")]
    Precache { url: String, reason: String },

    #[error("Precache fetch for {url} returned status {status}")]
    PrecacheStatus { url: String, status: u16 },

    #[error("Failed to populate namespace {namespace}: {source}")]
    Populate {
        namespace: String,
        #[source]
        source: StoreError,
    },
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    Save(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
