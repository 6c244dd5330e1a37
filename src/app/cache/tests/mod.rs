//! Tests for the cache store
//!
//! These run against a real temporary directory.

use tempfile::TempDir;

use crate::app::cache::{CacheConfig, CacheStore};
use crate::app::models::{BestJobRow, CachedDataset, EJobRow, JobTable};

fn create_test_store() -> (TempDir, CacheStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::new(&CacheConfig::with_cache_root(
        temp_dir.path().join("cache"),
    ));
    (temp_dir, store)
}

fn sample_dataset() -> CachedDataset {
    CachedDataset::from_filtered(
        vec![BestJobRow {
            title: "Dev".to_string(),
            company_name: "X".to_string(),
            own_apply_url: String::new(),
            link: "u1".to_string(),
        }],
        vec![EJobRow {
            title: "QA".to_string(),
            creation_date: "2024-01-01".to_string(),
            expiration_date: "2024-02-01".to_string(),
            own_apply_url: "http://ext".to_string(),
            link: "u2".to_string(),
        }],
    )
}

/// Saving then loading gives back the same rows, and the external table
/// holds exactly the eJobs row with an apply URL.
#[tokio::test]
async fn test_save_then_load_round_trip() {
    let (_dir, store) = create_test_store();
    let dataset = sample_dataset();

    store.save(&dataset).await.unwrap();
    let loaded = store.load().await.unwrap().expect("cache should load");

    assert_eq!(loaded, dataset);
    let external = loaded.external.expect("external table");
    assert_eq!(external.len(), 1);
    assert_eq!(external[0].title, "QA");
    assert_eq!(external[0].own_apply_url, "http://ext");
    assert!(store.exists().await);
}

#[tokio::test]
async fn test_files_have_expected_headers() {
    let (_dir, store) = create_test_store();
    store.save(&sample_dataset()).await.unwrap();

    let bjobs = tokio::fs::read_to_string(store.table_path(JobTable::BestJobs))
        .await
        .unwrap();
    assert!(bjobs.starts_with("title,companyName,ownApplyUrl,link\n"));

    let ejobs = tokio::fs::read_to_string(store.table_path(JobTable::EJobs))
        .await
        .unwrap();
    assert!(ejobs.starts_with("title,creationDate,expirationDate,ownApplyUrl,link\n"));

    let external = tokio::fs::read_to_string(store.table_path(JobTable::External))
        .await
        .unwrap();
    assert_eq!(
        external,
        "title,creationDate,expirationDate,ownApplyUrl\nQA,2024-01-01,2024-02-01,http://ext\n"
    );
}

#[tokio::test]
async fn test_values_with_commas_and_quotes_survive() {
    let (_dir, store) = create_test_store();
    let mut dataset = sample_dataset();
    dataset.bestjobs[0].title = "Dev, \"Senior\"".to_string();

    store.save(&dataset).await.unwrap();
    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded.bestjobs[0].title, "Dev, \"Senior\"");
}

#[tokio::test]
async fn test_empty_tables_keep_header() {
    let (_dir, store) = create_test_store();
    store.save(&CachedDataset::default()).await.unwrap();

    let bjobs = tokio::fs::read_to_string(store.table_path(JobTable::BestJobs))
        .await
        .unwrap();
    assert_eq!(bjobs, "title,companyName,ownApplyUrl,link\n");

    let loaded = store.load().await.unwrap().unwrap();
    assert!(loaded.bestjobs.is_empty());
    assert!(loaded.external.is_none());
}

#[tokio::test]
async fn test_missing_cache_loads_nothing() {
    let (_dir, store) = create_test_store();
    assert!(store.load().await.unwrap().is_none());
    assert!(!store.exists().await);
}

/// With only one of the two mandatory tables present the whole load is empty.
#[tokio::test]
async fn test_partial_cache_is_all_or_nothing() {
    let (_dir, store) = create_test_store();
    store.save(&sample_dataset()).await.unwrap();
    tokio::fs::remove_file(store.table_path(JobTable::EJobs))
        .await
        .unwrap();

    assert!(store.load().await.unwrap().is_none());
    assert!(!store.exists().await);
}

#[tokio::test]
async fn test_malformed_mandatory_table_counts_as_absent() {
    let (_dir, store) = create_test_store();
    store.save(&sample_dataset()).await.unwrap();
    tokio::fs::write(store.table_path(JobTable::BestJobs), "garbage\n\"unterminated")
        .await
        .unwrap();

    assert!(!store.exists().await);
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_external_table_is_dropped_alone() {
    let (_dir, store) = create_test_store();
    store.save(&sample_dataset()).await.unwrap();
    tokio::fs::write(store.table_path(JobTable::External), "nope\n1\n")
        .await
        .unwrap();

    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded.bestjobs.len(), 1);
    assert!(loaded.external.is_none());
}

#[tokio::test]
async fn test_stale_external_table_removed() {
    let (_dir, store) = create_test_store();
    store.save(&sample_dataset()).await.unwrap();
    assert!(store.table_path(JobTable::External).exists());

    let mut dataset = sample_dataset();
    dataset.external = None;
    store.save(&dataset).await.unwrap();

    assert!(!store.table_path(JobTable::External).exists());
    let loaded = store.load().await.unwrap().unwrap();
    assert!(loaded.external.is_none());
}

#[tokio::test]
async fn test_no_temp_files_left_behind() {
    let (_dir, store) = create_test_store();
    store.save(&sample_dataset()).await.unwrap();

    let mut entries = tokio::fs::read_dir(store.cache_root()).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        let name = entry.file_name().to_string_lossy().to_string();
        assert!(!name.ends_with(".tmp"), "left over temp file {}", name);
    }
}

/// A table that fails to stage leaves every previous table in place.
#[tokio::test]
async fn test_failed_save_keeps_previous_tables() {
    let (_dir, store) = create_test_store();
    store.save(&sample_dataset()).await.unwrap();

    // A directory in the way of the eJobs temp file
    let ejobs_temp = format!("{}.tmp", store.table_path(JobTable::EJobs).display());
    tokio::fs::create_dir(&ejobs_temp).await.unwrap();

    let mut newer = sample_dataset();
    newer.bestjobs[0].title = "Newer Dev".to_string();
    assert!(store.save(&newer).await.is_err());

    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded, sample_dataset());
    let bjobs_temp = format!("{}.tmp", store.table_path(JobTable::BestJobs).display());
    assert!(!std::path::Path::new(&bjobs_temp).exists());
}
