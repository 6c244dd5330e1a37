//! eJobs provider
//!
//! Pages through the search API while `morePagesFollow` is set.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::client::{ClientConfig, HttpHandler};
use crate::app::models::EJobsListing;
use crate::constants::providers;
use crate::errors::{FetchError, FetchResult};

use super::ListingSource;

const NAME: &str = "eJobs";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageResponse {
    jobs: Option<Vec<EJobsListing>>,
    #[serde(default)]
    more_pages_follow: bool,
}

/// Fetches listings from the eJobs API
#[derive(Debug)]
pub struct EJobsProvider {
    http: HttpHandler,
    base_url: Url,
    filters: String,
    max_pages: u32,
}

impl EJobsProvider {
    /// Create a provider against `base_url` with a raw filter query
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the URL is invalid or the client cannot be built
    pub fn new(
        base_url: &str,
        filters: impl Into<String>,
        max_pages: u32,
        client_config: &ClientConfig,
    ) -> FetchResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl {
            url: base_url.to_string(),
            error: e.to_string(),
        })?;

        Ok(Self {
            http: HttpHandler::new(client_config)?,
            base_url,
            filters: filters.into(),
            max_pages: max_pages.max(1),
        })
    }

    fn page_url(&self, page: u32) -> Url {
        let mut query = format!("page={}&pageSize={}", page, providers::EJOBS_PAGE_SIZE);
        let filters = self.filters.trim_start_matches('&');
        if !filters.is_empty() {
            query.push('&');
            query.push_str(filters);
        }

        let mut url = self.base_url.clone();
        url.set_query(Some(&query));
        url
    }
}

#[async_trait]
impl ListingSource for EJobsProvider {
    type Listing = EJobsListing;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self) -> FetchResult<Vec<EJobsListing>> {
        let mut results = Vec::new();

        for page in 1..=self.max_pages {
            let url = self.page_url(page);
            debug!("Fetching eJobs page {}: {}", page, url);

            let response: PageResponse = self.http.get_json(&url).await?;
            let Some(jobs) = response.jobs else {
                warn!("'jobs' key missing on eJobs page {}, stopping pagination", page);
                break;
            };

            debug!(
                "Added {} jobs from page {}, total so far: {}",
                jobs.len(),
                page,
                results.len() + jobs.len()
            );
            results.extend(jobs);

            if !response.more_pages_follow {
                break;
            }
            if page == self.max_pages {
                warn!("Reached eJobs page limit ({}), stopping pagination", self.max_pages);
            }
        }

        info!("Retrieved {} total jobs from eJobs", results.len());
        Ok(results)
    }
}
