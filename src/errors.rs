//! Error types for Job Fetcher
//!
//! This module defines the error types for every component of the application.
//! Pipeline failures are values: each step returns one of these enums and the
//! refresh pipeline wraps them in [`RefreshError`] so the coordinator can record
//! them in the run status instead of unwinding.

use std::path::PathBuf;
use thiserror::Error;

/// Provider fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error: HTTP {status} for {url}")]
    ServerError { status: u16, url: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded for {url}")]
    MaxRetriesExceeded { max_retries: u32, url: String },

    /// Response body was not the JSON we expected
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required key was absent from the API response
    #[error("'{field}' key not found in {provider} API response")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Invalid client setup
    #[error("Invalid HTTP client configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Cache store errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory could not be created or accessed
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on a cache file
    #[error("Cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding failed
    #[error("CSV error in {table}: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    /// Header row is missing a required column
    #[error("Invalid header in {table}: expected columns {expected:?}, found {found:?}")]
    InvalidHeader {
        table: &'static str,
        expected: &'static [&'static str],
        found: Vec<String>,
    },

    /// Atomic rename failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    /// True when a file exists but its content cannot be read as a table
    pub fn is_malformed(&self) -> bool {
        matches!(self, CacheError::Csv { .. } | CacheError::InvalidHeader { .. })
    }
}

/// Rate-limit marker write errors
///
/// Reading the marker never fails: unreadable or corrupt markers count as absent.
#[derive(Error, Debug)]
pub enum MarkerError {
    /// Could not write the marker file
    #[error("Failed to write refresh marker {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not remove the marker file
    #[error("Failed to remove refresh marker {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Banned-word filter errors
#[derive(Error, Debug)]
pub enum FilterError {
    /// Banned-words file is missing and the policy says to fail
    #[error("Banned words file not found: {path}")]
    BannedWordsMissing { path: PathBuf },

    /// Banned-words file exists but could not be read
    #[error("Failed to read banned words file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Failure of one refresh pipeline run, tagged with the step that failed
#[derive(Error, Debug)]
pub enum RefreshError {
    /// A provider fetch failed
    #[error("Fetching {source_name} failed: {source}")]
    Fetch {
        source_name: &'static str,
        #[source]
        source: FetchError,
    },

    /// Filtering failed
    #[error("Filtering failed: {0}")]
    Filter(#[from] FilterError),

    /// Saving to the cache failed
    #[error("Saving cache failed: {0}")]
    Cache(#[from] CacheError),

    /// Recording the success marker failed
    #[error("Recording refresh marker failed: {0}")]
    Marker(#[from] MarkerError),
}

impl RefreshError {
    /// Name of the pipeline step that failed
    pub fn step(&self) -> &'static str {
        match self {
            RefreshError::Fetch { .. } => "fetch",
            RefreshError::Filter(_) => "filter",
            RefreshError::Cache(_) => "save",
            RefreshError::Marker(_) => "mark",
        }
    }
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Marker error
    #[error(transparent)]
    Marker(#[from] MarkerError),

    /// Filter error
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Refresh pipeline error
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Fetch(FetchError::Http(_))
            | AppError::Fetch(FetchError::RateLimitExceeded)
            | AppError::Fetch(FetchError::ServerOverloaded)
            | AppError::Fetch(FetchError::MaxRetriesExceeded { .. }) => true,
            AppError::Refresh(RefreshError::Fetch { source, .. }) => matches!(
                source,
                FetchError::Http(_)
                    | FetchError::RateLimitExceeded
                    | FetchError::ServerOverloaded
                    | FetchError::MaxRetriesExceeded { .. }
            ),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "fetch",
            AppError::Cache(_) => "cache",
            AppError::Marker(_) => "marker",
            AppError::Filter(_) => "filter",
            AppError::Config(_) => "config",
            AppError::Refresh(e) => e.step(),
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Marker result type alias
pub type MarkerResult<T> = std::result::Result<T, MarkerError>;

/// Filter result type alias
pub type FilterResult<T> = std::result::Result<T, FilterError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Refresh result type alias
pub type RefreshResult<T> = std::result::Result<T, RefreshError>;
