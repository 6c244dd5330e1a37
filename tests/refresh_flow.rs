//! End-to-end refresh against mocked job-board APIs
//!
//! Builds the coordinator from an `AppConfig` the way the CLI does, with both
//! providers pointed at a local `wiremock` server.

use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use job_fetcher::app::{JobTable, RunState, StartDecision};
use job_fetcher::config::AppConfig;

const WAIT: Option<Duration> = Some(Duration::from_secs(10));

async fn mount_providers(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/jobs"))
        .and(query_param("limit", "24"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 2, "items": []})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/jobs"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "items": [
                {"id": 1, "slug": "rust-dev", "title": "Rust Developer", "companyName": "Acme", "ownApplyUrl": "https://acme.test/apply"},
                {"id": 2, "slug": "senior-java", "title": "Senior Java Developer", "companyName": null, "ownApplyUrl": null}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [
                {"id": 11, "slug": "qa", "title": "QA Engineer", "creationDate": "2024-02-01", "expirationDate": "2024-03-01", "externalUrl": null},
                {"id": 12, "slug": "ops", "title": "Ops", "creationDate": "2024-01-01", "expirationDate": "2024-02-01", "externalUrl": "https://ops.test"}
            ],
            "morePagesFollow": false
        })))
        .mount(server)
        .await;
}

fn test_config(dir: &TempDir, server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.cache.cache_root = dir.path().join("cache");
    config.refresh.marker_file = dir.path().join("last_run.txt");
    config.filter.banned_words_file = dir.path().join("banned_words.txt");
    config.providers.bestjobs_url = format!("{}/v1/jobs", server.uri());
    config.providers.ejobs_url = format!("{}/jobs", server.uri());
    config.providers.ejobs_filters = "sort=suitability".to_string();
    config.client.request_interval_ms = 1;
    config.client.max_retries = 0;
    config
}

#[tokio::test]
async fn test_full_refresh_writes_cache_and_marker() {
    let server = MockServer::start().await;
    mount_providers(&server).await;
    let dir = TempDir::new().unwrap();
    tokio::fs::write(dir.path().join("banned_words.txt"), "Senior\n\n")
        .await
        .unwrap();

    let config = test_config(&dir, &server);
    config.validate().unwrap();
    let coordinator = config.build_coordinator().unwrap();

    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);

    let status = coordinator.status_snapshot();
    assert_eq!(status.state(), RunState::Completed, "error: {:?}", status.error());
    assert_eq!(
        status.progress(),
        Some("Successfully scraped 1 BestJobs and 2 eJobs")
    );

    let dataset = config.cache_store().load().await.unwrap().unwrap();
    assert_eq!(dataset.bestjobs[0].link, "https://www.bestjobs.eu/loc-de-munca/rust-dev");
    let ejob_titles: Vec<&str> = dataset.ejobs.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(ejob_titles, vec!["Ops", "QA Engineer"]);
    assert_eq!(
        dataset.ejobs[0].link,
        "https://www.ejobs.ro/user/locuri-de-munca/ops/12"
    );

    let external: Vec<&str> = dataset
        .external_rows()
        .iter()
        .map(|r| r.own_apply_url.as_str())
        .collect();
    assert_eq!(external, vec!["https://ops.test", "https://acme.test/apply"]);
    assert_eq!(dataset.row_count(JobTable::External), 2);

    assert!(config.limiter().last_success().await.is_some());
    assert_eq!(coordinator.maybe_start().await, StartDecision::NotDue);
}

#[tokio::test]
async fn test_provider_error_fails_run_without_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let config = test_config(&dir, &server);
    let coordinator = config.build_coordinator().unwrap();

    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);

    let status = coordinator.status_snapshot();
    assert_eq!(status.state(), RunState::Failed);
    assert!(status.error().unwrap().contains("BestJobs"));
    assert!(config.limiter().last_success().await.is_none());
    assert!(config.cache_store().load().await.unwrap().is_none());

    // Still due after a failure
    assert_eq!(coordinator.maybe_start().await, StartDecision::Started);
    assert!(coordinator.wait_for_completion(WAIT).await);
}
