//! Prelude module for Job Fetcher Library
//!
//! Re-exports the items most integrations need, so a single
//! `use job_fetcher::prelude::*;` covers the common setup.
//!
//! # Usage
//!
//! ```rust,no_run
//! use job_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::resolve(None, &ConfigOverrides::default()).await?;
//!     let coordinator = config.build_coordinator()?;
//!     coordinator.maybe_start().await;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Configuration
pub use crate::config::{AppConfig, ConfigOverrides};

// Essential app components
pub use crate::app::{
    BackgroundCoordinator, CacheConfig, CacheStore, CachedDataset, ClientConfig, FilterConfig,
    JobTable, ProvidersConfig, RateLimitConfig, RefreshLimiter, RefreshPipeline, RunState,
    RunStatus, StartDecision,
};

// Commonly used constants
pub use crate::constants::{DEFAULT_CACHE_DIR, DEFAULT_MARKER_FILE, DEFAULT_WINDOW_HOURS};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
