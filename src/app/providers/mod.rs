//! Job-board providers
//!
//! Each provider implements [`ListingSource`]: it fetches every listing it can
//! see and returns them typed, or a [`FetchError`](crate::errors::FetchError).
//! The refresh pipeline only depends on the trait, so tests swap in stubs.

pub mod bestjobs;
pub mod ejobs;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::models::{BestJobsListing, EJobsListing};
use crate::constants::providers;
use crate::errors::FetchResult;

pub use bestjobs::BestJobsProvider;
pub use ejobs::EJobsProvider;

/// A source of job listings
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Listing type produced by this source
    type Listing: Send + 'static;

    /// Display name used in logs and errors
    fn name(&self) -> &'static str;

    /// Fetch every listing; any error aborts the refresh that called it
    async fn fetch(&self) -> FetchResult<Vec<Self::Listing>>;
}

/// Shared handle to the BestJobs source
pub type BestJobsSource = Arc<dyn ListingSource<Listing = BestJobsListing>>;

/// Shared handle to the eJobs source
pub type EJobsSource = Arc<dyn ListingSource<Listing = EJobsListing>>;

/// Endpoints and query settings for both providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// BestJobs API endpoint
    pub bestjobs_url: String,
    /// Ask BestJobs for remote jobs only
    pub bestjobs_remote: bool,
    /// eJobs API endpoint
    pub ejobs_url: String,
    /// eJobs query filters, appended verbatim to every page request
    pub ejobs_filters: String,
    /// Stop following eJobs pages after this many
    pub ejobs_max_pages: u32,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            bestjobs_url: providers::BESTJOBS_API_URL.to_string(),
            bestjobs_remote: false,
            ejobs_url: providers::EJOBS_API_URL.to_string(),
            ejobs_filters: providers::EJOBS_DEFAULT_FILTERS.to_string(),
            ejobs_max_pages: providers::EJOBS_MAX_PAGES,
        }
    }
}
