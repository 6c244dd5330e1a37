//! Application constants for Job Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Cache directory override
    pub const CACHE_DIR: &str = "JOB_FETCHER_CACHE_DIR";

    /// Marker file override
    pub const MARKER_FILE: &str = "JOB_FETCHER_MARKER_FILE";

    /// Refresh window in (fractional) hours
    pub const WINDOW_HOURS: &str = "JOB_FETCHER_WINDOW_HOURS";

    /// Banned-words file override
    pub const BANNED_WORDS: &str = "JOB_FETCHER_BANNED_WORDS";

    /// Policy for a missing banned-words file (`skip` or `fail`)
    pub const ON_MISSING_BANNED_WORDS: &str = "JOB_FETCHER_ON_MISSING_BANNED_WORDS";

    /// Log level / filter directive
    pub const LOG: &str = "JOB_FETCHER_LOG";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Job-Fetcher/0.1.0";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Minimum spacing between requests to one provider
    pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(5);
}

/// Retry configuration
pub mod limits {
    /// Maximum retry attempts for failed requests
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
}

/// Provider endpoints and paging
pub mod providers {
    /// BestJobs listing API
    pub const BESTJOBS_API_URL: &str = "https://api.bestjobs.eu/v1/jobs";

    /// Public BestJobs job page prefix
    pub const BESTJOBS_JOB_URL: &str = "https://www.bestjobs.eu/loc-de-munca";

    /// Page size of the BestJobs probe request used to read `total`
    pub const BESTJOBS_PROBE_LIMIT: u32 = 24;

    /// eJobs listing API
    pub const EJOBS_API_URL: &str = "https://api.ejobs.ro/jobs";

    /// Public eJobs job page prefix
    pub const EJOBS_JOB_URL: &str = "https://www.ejobs.ro/user/locuri-de-munca";

    /// eJobs page size
    pub const EJOBS_PAGE_SIZE: u32 = 100;

    /// Default eJobs search filters
    pub const EJOBS_DEFAULT_FILTERS: &str = "filters.cities=381&filters.cities=1&filters.careerLevels=10&filters.careerLevels=3&filters.careerLevels=4&sort=suitability";

    /// Upper bound on eJobs pages followed in one fetch
    pub const EJOBS_MAX_PAGES: u32 = 500;
}

/// Cache layout
pub mod cache {
    /// Default cache directory, relative to the working directory
    pub const DEFAULT_CACHE_DIR: &str = "data/cache";

    /// Source A table
    pub const BESTJOBS_FILE: &str = "bjobs.csv";

    /// Source B table
    pub const EJOBS_FILE: &str = "ejobs.csv";

    /// Derived external-link table
    pub const EXTERNAL_FILE: &str = "externalJobs.csv";

    /// Suffix for temporary files during atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";
}

/// Refresh scheduling
pub mod refresh {
    /// Default marker file, relative to the working directory
    pub const DEFAULT_MARKER_FILE: &str = "last_run.txt";

    /// Default window between successful refreshes
    pub const DEFAULT_WINDOW_HOURS: f64 = 24.0;

    /// Longest accepted window (100 years)
    pub const MAX_WINDOW_HOURS: f64 = 24.0 * 365.0 * 100.0;

    /// Marker timestamp format (microsecond precision, no offset)
    pub const MARKER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
}

/// Banned-word filtering
pub mod filter {
    /// Default banned-words file, relative to the working directory
    pub const DEFAULT_BANNED_WORDS_FILE: &str = "data/banned_words.txt";
}

/// Presentation layer
pub mod display {
    use super::Duration;

    /// How often `run` polls the status snapshot
    pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

    /// Spinner frames
    pub const SPINNER_TICKS: &[&str] = &["◐", "◓", "◑", "◒"];

    /// Rows shown by `show` when no limit is given
    pub const DEFAULT_SHOW_LIMIT: usize = 50;
}

/// Configuration file discovery
pub mod config {
    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "job-fetcher.toml";

    /// Directory name under the user config directory
    pub const APP_DIR_NAME: &str = "job-fetcher";

    /// File name under the user config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

// Convenience re-exports for commonly used constants
pub use cache::DEFAULT_CACHE_DIR;
pub use http::USER_AGENT;
pub use refresh::{DEFAULT_MARKER_FILE, DEFAULT_WINDOW_HOURS};
