//! Tests for the background coordinator
//!
//! Providers are replaced by in-memory stubs; cache and marker live in a
//! temporary directory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use tempfile::TempDir;
use tokio::sync::Notify;

use crate::app::cache::{CacheConfig, CacheStore};
use crate::app::filter::{FilterConfig, MissingWordsPolicy};
use crate::app::models::{BestJobsListing, EJobsListing, ListingId};
use crate::app::pipeline::RefreshPipeline;
use crate::app::providers::ListingSource;
use crate::app::rate_limiter::{format_marker, RefreshLimiter};
use crate::errors::{FetchError, FetchResult};

use super::*;

const WAIT: Option<Duration> = Some(Duration::from_secs(5));

/// Stub source that counts calls and can be held at a gate
struct StubSource<L> {
    name: &'static str,
    listings: Vec<L>,
    fail: bool,
    panics: bool,
    calls: Arc<AtomicUsize>,
    gate: Option<Arc<Notify>>,
}

impl<L> StubSource<L> {
    fn new(name: &'static str, listings: Vec<L>) -> Self {
        Self {
            name,
            listings,
            fail: false,
            panics: false,
            calls: Arc::new(AtomicUsize::new(0)),
            gate: None,
        }
    }

    fn failing(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, Vec::new())
        }
    }

    fn panicking(name: &'static str) -> Self {
        Self {
            panics: true,
            ..Self::new(name, Vec::new())
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl<L> ListingSource for StubSource<L>
where
    L: Clone + Send + Sync + 'static,
{
    type Listing = L;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self) -> FetchResult<Vec<L>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.panics {
            panic!("{} stub panicked", self.name);
        }
        if self.fail {
            return Err(FetchError::ServerError {
                status: 500,
                url: "http://stub".to_string(),
            });
        }
        Ok(self.listings.clone())
    }
}

fn bestjobs_listing(title: &str) -> BestJobsListing {
    BestJobsListing {
        id: ListingId::Number(1),
        slug: title.to_lowercase(),
        title: title.to_string(),
        company_name: Some("Acme".to_string()),
        own_apply_url: None,
    }
}

fn ejobs_listing(title: &str, external: Option<&str>) -> EJobsListing {
    EJobsListing {
        id: ListingId::Number(7),
        slug: title.to_lowercase(),
        title: title.to_string(),
        creation_date: Some("2024-01-01".to_string()),
        expiration_date: Some("2024-02-01".to_string()),
        external_url: external.map(str::to_string),
    }
}

struct Fixture {
    dir: TempDir,
    bestjobs_calls: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            bestjobs_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn marker_path(&self) -> std::path::PathBuf {
        self.dir.path().join("last_run.txt")
    }

    fn cache_root(&self) -> std::path::PathBuf {
        self.dir.path().join("cache")
    }

    fn filter(&self) -> FilterConfig {
        FilterConfig {
            banned_words_file: self.dir.path().join("banned_words.txt"),
            on_missing: MissingWordsPolicy::Skip,
        }
    }

    fn coordinator_with(
        &self,
        bestjobs: StubSource<BestJobsListing>,
        ejobs: StubSource<EJobsListing>,
        filter: FilterConfig,
        cache_root: std::path::PathBuf,
    ) -> BackgroundCoordinator {
        let bestjobs = StubSource {
            calls: Arc::clone(&self.bestjobs_calls),
            ..bestjobs
        };
        let cache = Arc::new(CacheStore::new(&CacheConfig::with_cache_root(cache_root)));
        let limiter = Arc::new(RefreshLimiter::with_window(
            self.marker_path(),
            ChronoDuration::hours(24),
        ));
        let pipeline = RefreshPipeline::new(
            Arc::new(bestjobs),
            Arc::new(ejobs),
            filter,
            cache,
            limiter,
        );
        BackgroundCoordinator::new(Arc::new(pipeline))
    }

    fn coordinator(&self) -> BackgroundCoordinator {
        self.coordinator_with(
            StubSource::new("BestJobs", vec![bestjobs_listing("Rust Dev")]),
            StubSource::new("eJobs", vec![ejobs_listing("QA", Some("http://ext"))]),
            self.filter(),
            self.cache_root(),
        )
    }

    fn bestjobs_calls(&self) -> usize {
        self.bestjobs_calls.load(Ordering::SeqCst)
    }

    async fn write_old_marker(&self) -> String {
        let old = format_marker(RefreshLimiter::now() - ChronoDuration::hours(48));
        tokio::fs::write(self.marker_path(), &old).await.unwrap();
        old
    }

    async fn marker_content(&self) -> Option<String> {
        tokio::fs::read_to_string(self.marker_path()).await.ok()
    }
}

#[tokio::test]
async fn test_initial_status_is_idle() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    let status = coordinator.status_snapshot();
    assert_eq!(status.state(), RunState::Idle);
    assert!(coordinator.wait_for_completion(WAIT).await);
}

#[tokio::test]
async fn test_successful_run_saves_and_marks() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);

    let status = coordinator.status_snapshot();
    assert_eq!(status.state(), RunState::Completed);
    assert_eq!(
        status.progress(),
        Some("Successfully scraped 1 BestJobs and 1 eJobs")
    );
    assert!(status.error().is_none());
    assert!(status.finished_at().is_some());

    let dataset = coordinator
        .pipeline()
        .cache()
        .load()
        .await
        .unwrap()
        .expect("cache written");
    assert_eq!(dataset.bestjobs.len(), 1);
    assert_eq!(dataset.external.map(|e| e.len()), Some(1));
    assert!(fixture.marker_content().await.is_some());
}

#[tokio::test]
async fn test_second_start_inside_window_is_not_due() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);

    assert_eq!(coordinator.maybe_start().await, StartDecision::NotDue);
    let status = coordinator.status_snapshot();
    assert_eq!(status.state(), RunState::Idle);
    assert_eq!(status.progress(), Some(NOT_DUE_MESSAGE));
    assert_eq!(fixture.bestjobs_calls(), 1);
}

/// Concurrent starts while a run is held open spawn exactly one pipeline.
#[tokio::test]
async fn test_concurrent_starts_run_pipeline_once() {
    let fixture = Fixture::new();
    let gate = Arc::new(Notify::new());
    let coordinator = fixture.coordinator_with(
        StubSource::new("BestJobs", vec![bestjobs_listing("Dev")]).gated(Arc::clone(&gate)),
        StubSource::new("eJobs", Vec::new()),
        fixture.filter(),
        fixture.cache_root(),
    );

    let (first, second) = tokio::join!(coordinator.maybe_start(), coordinator.maybe_start());
    let mut decisions = vec![first, second];
    decisions.sort_by_key(|d| *d != StartDecision::Started);
    assert_eq!(
        decisions,
        vec![StartDecision::Started, StartDecision::AlreadyRunning]
    );

    assert_eq!(coordinator.maybe_start().await, StartDecision::AlreadyRunning);
    assert!(coordinator.is_running());
    assert!(!coordinator.wait_for_completion(Some(Duration::from_millis(50))).await);

    gate.notify_one();
    assert!(coordinator.wait_for_completion(WAIT).await);
    assert_eq!(fixture.bestjobs_calls(), 1);
    assert_eq!(coordinator.status_snapshot().state(), RunState::Completed);
}

#[tokio::test]
async fn test_fetch_failure_leaves_marker_unchanged() {
    let fixture = Fixture::new();
    let old = fixture.write_old_marker().await;
    let coordinator = fixture.coordinator_with(
        StubSource::failing("BestJobs"),
        StubSource::new("eJobs", Vec::new()),
        fixture.filter(),
        fixture.cache_root(),
    );

    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);

    let status = coordinator.status_snapshot();
    assert_eq!(status.state(), RunState::Failed);
    assert!(status.error().unwrap().contains("BestJobs"));
    assert_eq!(fixture.marker_content().await, Some(old));
    assert!(!fixture.cache_root().exists());

    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);
}

#[tokio::test]
async fn test_filter_failure_leaves_marker_unchanged() {
    let fixture = Fixture::new();
    let old = fixture.write_old_marker().await;
    let filter = FilterConfig {
        on_missing: MissingWordsPolicy::Fail,
        ..fixture.filter()
    };
    let coordinator = fixture.coordinator_with(
        StubSource::new("BestJobs", vec![bestjobs_listing("Dev")]),
        StubSource::new("eJobs", Vec::new()),
        filter,
        fixture.cache_root(),
    );

    coordinator.maybe_start().await;
    assert!(coordinator.wait_for_completion(WAIT).await);

    let status = coordinator.status_snapshot();
    assert_eq!(status.state(), RunState::Failed);
    assert!(status.error().unwrap().contains("banned_words.txt"));
    assert_eq!(fixture.marker_content().await, Some(old));
}

#[tokio::test]
async fn test_save_failure_leaves_marker_unchanged() {
    let fixture = Fixture::new();
    let old = fixture.write_old_marker().await;
    let blocker = fixture.dir.path().join("not_a_dir");
    tokio::fs::write(&blocker, "file in the way").await.unwrap();

    let coordinator = fixture.coordinator_with(
        StubSource::new("BestJobs", vec![bestjobs_listing("Dev")]),
        StubSource::new("eJobs", Vec::new()),
        fixture.filter(),
        blocker,
    );

    coordinator.maybe_start().await;
    assert!(coordinator.wait_for_completion(WAIT).await);

    assert_eq!(coordinator.status_snapshot().state(), RunState::Failed);
    assert_eq!(fixture.marker_content().await, Some(old));
}

#[tokio::test]
async fn test_marker_write_failure_fails_run() {
    let fixture = Fixture::new();
    // A directory where the marker file should be
    tokio::fs::create_dir(fixture.marker_path()).await.unwrap();
    let coordinator = fixture.coordinator();

    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);

    let status = coordinator.status_snapshot();
    assert_eq!(status.state(), RunState::Failed);
    assert!(status
        .error()
        .unwrap()
        .starts_with("Recording refresh marker failed"));

    let dataset = coordinator.pipeline().cache().load().await.unwrap();
    assert_eq!(dataset.map(|d| d.bestjobs.len()), Some(1));
    assert!(coordinator.pipeline().limiter().is_due().await);
}

#[tokio::test]
async fn test_panicking_pipeline_is_reported_failed() {
    let fixture = Fixture::new();
    let old = fixture.write_old_marker().await;
    let coordinator = fixture.coordinator_with(
        StubSource::panicking("BestJobs"),
        StubSource::new("eJobs", Vec::new()),
        fixture.filter(),
        fixture.cache_root(),
    );

    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);

    let status = coordinator.status_snapshot();
    assert_eq!(status.state(), RunState::Failed);
    assert_eq!(status.error(), Some(WORKER_LOST_MESSAGE));
    assert!(status.finished_at().is_some());
    assert_eq!(fixture.marker_content().await, Some(old));

    // Waiting without a timeout returns too
    assert!(coordinator.wait_for_completion(None).await);
    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
}

#[tokio::test]
async fn test_banned_titles_are_not_cached() {
    let fixture = Fixture::new();
    tokio::fs::write(fixture.dir.path().join("banned_words.txt"), "senior\n")
        .await
        .unwrap();
    let coordinator = fixture.coordinator_with(
        StubSource::new(
            "BestJobs",
            vec![bestjobs_listing("Senior Dev"), bestjobs_listing("Junior Dev")],
        ),
        StubSource::new("eJobs", vec![ejobs_listing("SENIOR QA", Some("http://x"))]),
        fixture.filter(),
        fixture.cache_root(),
    );

    coordinator.maybe_start().await;
    assert!(coordinator.wait_for_completion(WAIT).await);

    let dataset = coordinator.pipeline().cache().load().await.unwrap().unwrap();
    let titles: Vec<&str> = dataset.bestjobs.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Junior Dev"]);
    assert!(dataset.ejobs.is_empty());
    assert!(dataset.external.is_none());
}

#[tokio::test]
async fn test_force_makes_refresh_due_again() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();

    coordinator.maybe_start().await;
    assert!(coordinator.wait_for_completion(WAIT).await);
    assert_eq!(coordinator.maybe_start().await, StartDecision::NotDue);

    coordinator.force().await.unwrap();
    assert!(fixture.marker_content().await.is_none());
    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);
    assert_eq!(fixture.bestjobs_calls(), 2);
}

#[tokio::test]
async fn test_future_marker_counts_as_due() {
    let fixture = Fixture::new();
    let future = format_marker(RefreshLimiter::now() + ChronoDuration::hours(3));
    tokio::fs::write(fixture.marker_path(), future).await.unwrap();

    let coordinator = fixture.coordinator();
    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);
}

/// Every status published during a run satisfies the state/field rules.
#[tokio::test]
async fn test_published_statuses_are_consistent() {
    let fixture = Fixture::new();
    let coordinator = fixture.coordinator();
    let mut rx = coordinator.subscribe();

    let collector = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let status = Arc::clone(&rx.borrow_and_update());
            let done = status.is_terminal();
            seen.push(status);
            if done {
                break;
            }
        }
        seen
    });

    coordinator.maybe_start().await;
    assert!(coordinator.wait_for_completion(WAIT).await);
    let seen = tokio::time::timeout(Duration::from_secs(5), collector)
        .await
        .unwrap()
        .unwrap();

    assert!(!seen.is_empty());
    for status in &seen {
        match status.state() {
            RunState::Running => {
                assert!(status.started_at().is_some());
                assert!(status.finished_at().is_none());
                assert!(status.error().is_none());
            }
            RunState::Completed => {
                assert!(status.error().is_none());
                assert!(status.finished_at().is_some());
            }
            RunState::Failed => assert!(status.error().is_some()),
            RunState::Idle => {}
        }
    }
    assert_eq!(seen.last().unwrap().state(), RunState::Completed);
}
