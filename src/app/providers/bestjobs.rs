//! BestJobs provider
//!
//! The API reports its `total` on a small probe request; a second request then
//! asks for that many items in one page.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::app::client::{ClientConfig, HttpHandler};
use crate::app::models::BestJobsListing;
use crate::constants::providers;
use crate::errors::{FetchError, FetchResult};

use super::ListingSource;

const NAME: &str = "BestJobs";

#[derive(Debug, Deserialize)]
struct ProbeResponse {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    items: Option<Vec<BestJobsListing>>,
}

/// Fetches listings from the BestJobs API
#[derive(Debug)]
pub struct BestJobsProvider {
    http: HttpHandler,
    base_url: Url,
    remote: bool,
}

impl BestJobsProvider {
    /// Create a provider against `base_url`
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the URL is invalid or the client cannot be built
    pub fn new(base_url: &str, remote: bool, client_config: &ClientConfig) -> FetchResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl {
            url: base_url.to_string(),
            error: e.to_string(),
        })?;

        Ok(Self {
            http: HttpHandler::new(client_config)?,
            base_url,
            remote,
        })
    }

    fn page_url(&self, limit: u64) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("offset", "0")
            .append_pair("limit", &limit.to_string())
            .append_pair("remote", if self.remote { "1" } else { "0" });
        url
    }
}

#[async_trait]
impl ListingSource for BestJobsProvider {
    type Listing = BestJobsListing;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self) -> FetchResult<Vec<BestJobsListing>> {
        let probe_url = self.page_url(u64::from(providers::BESTJOBS_PROBE_LIMIT));
        debug!("Making initial request to: {}", probe_url);

        let probe: ProbeResponse = self.http.get_json(&probe_url).await?;
        let total = probe.total.ok_or(FetchError::MissingField {
            provider: NAME,
            field: "total",
        })?;
        info!("Found {} total BestJobs listings, fetching all", total);

        if total == 0 {
            return Ok(Vec::new());
        }

        let full_url = self.page_url(total);
        debug!("Making full request to: {}", full_url);

        let page: ItemsResponse = self.http.get_json(&full_url).await?;
        let jobs = page.items.ok_or(FetchError::MissingField {
            provider: NAME,
            field: "items",
        })?;

        info!("Retrieved {} jobs from BestJobs", jobs.len());
        Ok(jobs)
    }
}
