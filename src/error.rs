//! Error types for fhcache
//!
//! All modules use `CacheResult<T>` as their return type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for fhcache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in fhcache
#[derive(Error, Debug)]
pub enum CacheError {
    // Argument errors, raised before any I/O or locking
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Lock errors
    #[error(
        "Could not obtain a lock on the file cache within timeout: {}. Please try again later.",
        format_timeout(.timeout)
    )]
    LockTimeout { timeout: Duration },

    // Cache map errors
    #[error("Malformed cache timestamp: {0:?}")]
    MalformedTimestamp(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn format_timeout(timeout: &Duration) -> String {
    format!("{:.3}s", timeout.as_secs_f64())
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// The native OS error code, if this error came from the OS
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } | Self::ConfigDirCreate { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// The `io::ErrorKind` of the underlying OS error, if any
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Io { source, .. } | Self::ConfigDirCreate { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Check if error is retryable
    ///
    /// Nothing in this crate retries on its own; this only tells callers
    /// whether trying the same call again later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::LockTimeout { .. } => {
                Some("Another process is using this cache entry. Retry, or remove a stale *.lock directory")
            }
            Self::ConfigInvalid { .. } => Some("Run: fhcache config init --force"),
            Self::MalformedTimestamp(_) => Some("Remove the affected entry with: fhcache remove <id>"),
            _ => None,
        }
    }
}
