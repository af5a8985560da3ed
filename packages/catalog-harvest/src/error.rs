//! Typed errors for the harvesting library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the batch driver can
//! tell a run-fatal condition from a per-item skip by matching on the variant.

use std::path::PathBuf;
use thiserror::Error;

/// Run-level errors returned by the batch driver and worklist builder.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Page fetch failed where no fallback exists (e.g. the first index page)
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Extraction service unreachable at startup
    #[error("extraction service unavailable: {0}")]
    ServiceUnavailable(#[source] ExtractError),

    /// Ledger could not be read or written
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Invalid configuration or run options
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// `start_at` points past the end of the worklist
    #[error("start-at {start_at} exceeds worklist length {len}")]
    StartOutOfRange { start_at: usize, len: usize },

    /// Discovery produced no items at all
    #[error("worklist is empty: {reason}")]
    EmptyWorklist { reason: String },
}

/// Errors raised by the rate limiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrottleError {
    /// Daily request ceiling reached. Never retried within the same run.
    #[error("daily request limit (RPD) of {limit} reached")]
    QuotaExceeded { limit: u32 },
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Non-success status code
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Request exceeded the configured timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors from a single structured-extraction attempt.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Transport or provider failure
    #[error("service error: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response was not valid JSON
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Response parsed but had the wrong shape
    #[error("malformed output: {reason}")]
    Malformed { reason: String },

    /// The provider does not offer this capability (e.g. token counting)
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Errors reading or writing the output ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Filesystem failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing ledger content cannot be interpreted; appending would lose it
    #[error("existing ledger {} is unreadable: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// JSON encoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension is neither `.json` nor `.csv`
    #[error("unsupported ledger format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LedgerError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("{0} must be set")]
    Missing(String),

    /// A setting is present but unusable
    #[error("invalid value for {key} ({value:?}): {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for extraction attempts.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Result type alias for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
