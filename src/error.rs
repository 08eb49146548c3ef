//! Error types for the storage client

use thiserror::Error;

/// Storage client error
#[derive(Debug, Error)]
pub enum StorageError {
    /// Malformed content hash string
    #[error("{0}")]
    Format(String),

    /// Gateway returned a non-2xx response
    #[error("Gateway error {status}: {message}")]
    Gateway { status: u16, message: String },

    /// Transport-level failure (timeout, connection, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Authorization certificate could not be obtained
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Message fragments that indicate a transient failure.
const RETRIABLE_PATTERNS: &[&str] = &[
    "ssl",
    "tls",
    "network error",
    "connection",
    "timeout",
    "fetch",
];

/// Message fragments that indicate retrying cannot help.
const PERMANENT_PATTERNS: &[&str] = &[
    "validation",
    "invalid",
    "malformed",
    "unauthorized",
    "forbidden",
    "not found",
];

impl StorageError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Gateway { status, .. } => Some(*status),
            StorageError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether another attempt of the same request might succeed.
    ///
    /// Status codes decide first: 408 and 429 retry, other 4xx do not, 5xx do.
    /// Without a status, transport failures retry and the rendered message is
    /// matched against known transient and permanent patterns. Anything left
    /// unclassified retries.
    pub fn is_retriable(&self) -> bool {
        match self {
            StorageError::Format(_) | StorageError::Certificate(_) | StorageError::Config(_) => {
                return false
            }
            _ => {}
        }

        if let Some(status) = self.status() {
            match status {
                408 | 429 => return true,
                400..=499 => return false,
                500.. => return true,
                _ => {}
            }
        }

        if let StorageError::Network(e) = self {
            if e.is_timeout() || e.is_connect() || e.is_request() {
                return true;
            }
        }

        let message = self.to_string().to_lowercase();
        if RETRIABLE_PATTERNS.iter().any(|p| message.contains(p)) {
            return true;
        }
        if PERMANENT_PATTERNS.iter().any(|p| message.contains(p)) {
            return false;
        }

        true
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
