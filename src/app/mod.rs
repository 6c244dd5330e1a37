//! Core application logic for Job Fetcher
//!
//! This module contains the provider clients, data models, banned-word
//! filter, CSV cache, refresh rate limiter and the background coordination
//! that ties them into one refresh pipeline.
//!
//! # Examples
//!
//! ```rust,no_run
//! use job_fetcher::app::{CacheConfig, CacheStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CacheStore::new(&CacheConfig::default());
//! if let Some(dataset) = store.load().await? {
//!     for job in &dataset.bestjobs {
//!         println!("{} - {}", job.title, job.link);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod coordinator;
pub mod filter;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod rate_limiter;

// Re-export main public API
pub use cache::{CacheConfig, CacheStore};
pub use client::{ClientConfig, HttpHandler};
pub use coordinator::{BackgroundCoordinator, RunState, RunStatus, StartDecision};
pub use filter::{search_titles, BannedWords, FilterConfig, MissingWordsPolicy};
pub use models::{
    BestJobRow, BestJobsListing, CachedDataset, EJobRow, EJobsListing, ExternalJobRow, JobRow,
    JobTable, ListingId,
};
pub use pipeline::{NoProgress, ProgressSink, RefreshOutcome, RefreshPipeline, RefreshReport};
pub use providers::{BestJobsProvider, EJobsProvider, ListingSource, ProvidersConfig};
pub use rate_limiter::{RateLimitConfig, RefreshLimiter};
