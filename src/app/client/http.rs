//! Core HTTP operations with request pacing and retry logic
//!
//! Every provider request goes through [`HttpHandler::get_json`], which waits
//! for the pacing quota, retries transient failures with exponential delay,
//! and turns the body into a typed value.

use std::fmt;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::errors::{FetchError, FetchResult};

use super::config::ClientConfig;

type DirectLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler with resilience patterns
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectLimiter,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl fmt::Debug for HttpHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpHandler")
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish_non_exhaustive()
    }
}

impl HttpHandler {
    /// Creates a new HttpHandler from a client configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the client cannot be built or the pacing
    /// interval is zero
    pub fn new(config: &ClientConfig) -> FetchResult<Self> {
        let client = config.build_http_client()?;
        let rate_limiter = Self::build_rate_limiter(config.request_interval)?;
        Ok(Self {
            client,
            rate_limiter,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    /// Builds a limiter that lets one request through per `interval`
    fn build_rate_limiter(interval: Duration) -> FetchResult<DirectLimiter> {
        let quota = Quota::with_period(interval).ok_or_else(|| FetchError::InvalidConfig {
            reason: "Request interval must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(quota))
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Fetches a response, retrying on 429, 503 and transport errors
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when retries are exhausted or the server answers
    /// with any other non-success status
    pub async fn get_response(&self, url: &Url) -> FetchResult<reqwest::Response> {
        let mut retries = 0;
        loop {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
                .await;

            match self.client.get(url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE
                    {
                        if retries < self.max_retries {
                            retries += 1;
                            let delay = self.backoff_delay(retries);
                            tracing::warn!(
                                "Server answered {} for {}. Backing off for {}ms",
                                status.as_u16(),
                                url,
                                delay.as_millis()
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                            FetchError::RateLimitExceeded
                        } else {
                            FetchError::ServerOverloaded
                        });
                    }

                    if !status.is_success() {
                        tracing::error!("Request to {} failed with HTTP {}", url, status);
                        return Err(FetchError::ServerError {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }

                    tracing::debug!("Successfully fetched response: {}", url);
                    return Ok(response);
                }
                Err(e) if retries < self.max_retries => {
                    retries += 1;
                    let delay = self.backoff_delay(retries);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        self.max_retries,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!("Request failed after {} retries: {}", self.max_retries, e);
                    if self.max_retries == 0 {
                        return Err(FetchError::Http(e));
                    }
                    return Err(FetchError::MaxRetriesExceeded {
                        max_retries: self.max_retries,
                        url: url.to_string(),
                    });
                }
            }
        }
    }

    /// Fetches and decodes a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> FetchResult<T> {
        let response = self.get_response(url).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
