//! The refresh pipeline: fetch, filter, derive, save, mark
//!
//! One run is strictly ordered and commits nothing partial:
//!
//! 1. fetch BestJobs, then eJobs
//! 2. convert listings to rows and drop banned titles
//! 3. derive the external-link table
//! 4. save all tables to the cache
//! 5. record the success marker
//!
//! Any failing step ends the run with [`RefreshOutcome::Failure`]; the marker
//! is only written after the save succeeded, so a failed run is due again at
//! the next check.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, instrument};

use crate::app::cache::CacheStore;
use crate::app::client::ClientConfig;
use crate::app::filter::{BannedWords, FilterConfig};
use crate::app::models::{CachedDataset, EJobRow};
use crate::app::providers::{
    BestJobsProvider, BestJobsSource, EJobsProvider, EJobsSource, ListingSource,
    ProvidersConfig,
};
use crate::app::rate_limiter::RefreshLimiter;
use crate::errors::{FetchResult, RefreshError, RefreshResult};

/// Receives step-boundary progress messages
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Discards progress
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _message: &str) {}
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// The dataset that was saved
    pub dataset: CachedDataset,
    /// BestJobs listings before filtering
    pub bestjobs_fetched: usize,
    /// eJobs listings before filtering
    pub ejobs_fetched: usize,
    /// Time written to the marker
    pub completed_at: NaiveDateTime,
}

impl RefreshReport {
    /// One-line summary for status display
    pub fn summary(&self) -> String {
        format!(
            "Successfully scraped {} BestJobs and {} eJobs",
            self.dataset.bestjobs.len(),
            self.dataset.ejobs.len()
        )
    }
}

/// Result of one pipeline run
#[derive(Debug)]
pub enum RefreshOutcome {
    Success(RefreshReport),
    Failure(RefreshError),
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RefreshOutcome::Success(_))
    }

    pub fn into_result(self) -> RefreshResult<RefreshReport> {
        match self {
            RefreshOutcome::Success(report) => Ok(report),
            RefreshOutcome::Failure(error) => Err(error),
        }
    }
}

impl From<RefreshResult<RefreshReport>> for RefreshOutcome {
    fn from(result: RefreshResult<RefreshReport>) -> Self {
        match result {
            Ok(report) => RefreshOutcome::Success(report),
            Err(error) => RefreshOutcome::Failure(error),
        }
    }
}

/// Fetch-filter-save unit of work scheduled by the coordinator
pub struct RefreshPipeline {
    bestjobs: BestJobsSource,
    ejobs: EJobsSource,
    filter: FilterConfig,
    cache: Arc<CacheStore>,
    limiter: Arc<RefreshLimiter>,
}

impl RefreshPipeline {
    /// Create a pipeline over the given collaborators
    pub fn new(
        bestjobs: BestJobsSource,
        ejobs: EJobsSource,
        filter: FilterConfig,
        cache: Arc<CacheStore>,
        limiter: Arc<RefreshLimiter>,
    ) -> Self {
        Self {
            bestjobs,
            ejobs,
            filter,
            cache,
            limiter,
        }
    }

    /// Create a pipeline backed by the real BestJobs and eJobs APIs
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if a provider URL is invalid or the HTTP client
    /// cannot be built
    pub fn with_http_providers(
        providers: &ProvidersConfig,
        client: &ClientConfig,
        filter: FilterConfig,
        cache: Arc<CacheStore>,
        limiter: Arc<RefreshLimiter>,
    ) -> FetchResult<Self> {
        let bestjobs = BestJobsProvider::new(
            &providers.bestjobs_url,
            providers.bestjobs_remote,
            client,
        )?;
        let ejobs = EJobsProvider::new(
            &providers.ejobs_url,
            providers.ejobs_filters.clone(),
            providers.ejobs_max_pages,
            client,
        )?;

        Ok(Self::new(
            Arc::new(bestjobs),
            Arc::new(ejobs),
            filter,
            cache,
            limiter,
        ))
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<RefreshLimiter> {
        &self.limiter
    }

    /// Run the pipeline once
    pub async fn run(&self, progress: &dyn ProgressSink) -> RefreshOutcome {
        self.execute(progress).await.into()
    }

    #[instrument(name = "refresh", skip_all)]
    async fn execute(&self, progress: &dyn ProgressSink) -> RefreshResult<RefreshReport> {
        progress.report("Fetching BestJobs listings...");
        let bestjobs = fetch_from(self.bestjobs.as_ref()).await?;

        progress.report("Fetching eJobs listings...");
        let ejobs = fetch_from(self.ejobs.as_ref()).await?;

        progress.report("Applying banned-word filter...");
        let banned = BannedWords::load(&self.filter).await?;

        let bestjobs_fetched = bestjobs.len();
        let ejobs_fetched = ejobs.len();

        let bestjobs_rows = banned.retain(bestjobs.into_iter().map(|l| l.into_row()).collect());
        let mut ejobs_rows = banned.retain(ejobs.into_iter().map(|l| l.into_row()).collect());
        sort_by_creation_date(&mut ejobs_rows);

        info!(
            "BestJobs: {} -> {} jobs, eJobs: {} -> {} jobs after filtering",
            bestjobs_fetched,
            bestjobs_rows.len(),
            ejobs_fetched,
            ejobs_rows.len()
        );

        let dataset = CachedDataset::from_filtered(bestjobs_rows, ejobs_rows);

        progress.report("Saving jobs to cache...");
        self.cache.save(&dataset).await?;

        progress.report("Updating timestamp...");
        let completed_at = RefreshLimiter::now();
        self.limiter.record_success(completed_at).await?;

        Ok(RefreshReport {
            dataset,
            bestjobs_fetched,
            ejobs_fetched,
            completed_at,
        })
    }
}

async fn fetch_from<L>(source: &dyn ListingSource<Listing = L>) -> RefreshResult<Vec<L>>
where
    L: Send + 'static,
{
    info!("Fetching {} listings", source.name());
    source
        .fetch()
        .await
        .map_err(|error| RefreshError::Fetch {
            source_name: source.name(),
            source: error,
        })
}

/// Oldest first; rows without a creation date go last
fn sort_by_creation_date(rows: &mut [EJobRow]) {
    rows.sort_by(|a, b| {
        (a.creation_date.is_empty(), &a.creation_date)
            .cmp(&(b.creation_date.is_empty(), &b.creation_date))
    });
}
