//! Manifest fetching and compatibility analysis against a mock release server.

use devstack_core::cache::{CacheStore, FileCache};
use devstack_core::compat::BREAKING_WARNING;
use devstack_core::{
    CompatibilityAnalyzer, FetchOptions, HttpClient, ManifestFetcher, ReleaseSource, StackError,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "acme/devstack";

fn manifest_path(version: &str) -> String {
    format!("/{}/releases/download/v{}/compatibility-manifest.json", REPO, version)
}

fn manifest_080() -> serde_json::Value {
    json!({
        "version": "0.8.0",
        "storageFormatVersion": "3",
        "breakingChanges": [
            {
                "affectedVersions": ">=0.7.0 <0.8.0",
                "description": "Session tokens moved to a dedicated table",
                "mitigation": "Sign in again after upgrading",
                "category": "auth"
            },
            {
                "affectedVersions": "<0.5.0",
                "description": "Legacy storage layout removed",
                "mitigation": "Upgrade to 0.5.x first"
            }
        ],
        "migrationNotes": "https://docs.example.com/migrate/0.8",
        "requiredActions": ["Re-issue API keys"]
    })
}

fn setup(server: &MockServer, cache_dir: &Path) -> (ManifestFetcher, Arc<dyn CacheStore>) {
    let http = Arc::new(HttpClient::new().unwrap());
    let cache: Arc<dyn CacheStore> = Arc::new(FileCache::new(cache_dir));
    let fetcher = ManifestFetcher::new(
        http,
        cache.clone(),
        ReleaseSource::with_base_url(REPO, server.uri()),
    );
    (fetcher, cache)
}

async fn mount_manifest(server: &MockServer, version: &str, body: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(manifest_path(version)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let server = MockServer::start().await;
    mount_manifest(&server, "0.8.0", manifest_080(), 1).await;
    let temp = TempDir::new().unwrap();
    let (fetcher, _cache) = setup(&server, temp.path());

    let first = fetcher
        .fetch("0.8.0", FetchOptions::default())
        .await
        .unwrap()
        .unwrap();
    let second = fetcher
        .fetch("v0.8.0", FetchOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(fetcher.list_cached_versions().unwrap(), vec!["0.8.0"]);
}

#[tokio::test]
async fn test_force_refresh_always_hits_network() {
    let server = MockServer::start().await;
    mount_manifest(&server, "0.8.0", manifest_080(), 2).await;
    let temp = TempDir::new().unwrap();
    let (fetcher, _cache) = setup(&server, temp.path());

    fetcher.fetch("0.8.0", FetchOptions::default()).await.unwrap();
    fetcher.fetch("0.8.0", FetchOptions::refresh()).await.unwrap();
}

#[tokio::test]
async fn test_missing_manifest_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(manifest_path("0.9.0")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let (fetcher, _cache) = setup(&server, temp.path());

    let result = fetcher.fetch("0.9.0", FetchOptions::default()).await.unwrap();
    assert!(result.is_none());
    assert!(fetcher.list_cached_versions().unwrap().is_empty());
}

#[tokio::test]
async fn test_server_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(manifest_path("0.8.0")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let (fetcher, _cache) = setup(&server, temp.path());

    match fetcher.fetch("0.8.0", FetchOptions::default()).await {
        Err(StackError::HttpStatus { status, reason, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(reason, "Internal Server Error");
        }
        other => panic!("expected HTTP status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_schema_invalid_response_is_not_cached() {
    let server = MockServer::start().await;
    mount_manifest(&server, "0.8.0", json!({ "version": "0.8.0" }), 1).await;
    let temp = TempDir::new().unwrap();
    let (fetcher, _cache) = setup(&server, temp.path());

    let err = fetcher
        .fetch("0.8.0", FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StackError::SchemaInvalid { .. }));
    assert!(fetcher.list_cached_versions().unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupted_cache_entry_is_replaced() {
    let server = MockServer::start().await;
    mount_manifest(&server, "0.8.0", manifest_080(), 1).await;
    let temp = TempDir::new().unwrap();
    let (fetcher, cache) = setup(&server, temp.path());

    cache
        .write("compat-manifests", "0.8.0.json", b"{\"version\": tru")
        .unwrap();

    let fetched = fetcher
        .fetch("0.8.0", FetchOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.version, "0.8.0");

    let cached = cache.read("compat-manifests", "0.8.0.json").unwrap().unwrap();
    let cached: serde_json::Value = serde_json::from_slice(&cached).unwrap();
    assert_eq!(cached, manifest_080());

    // Served from the repaired entry; the mock only allows one request.
    let again = fetcher
        .fetch("0.8.0", FetchOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again, fetched);
}

#[tokio::test]
async fn test_timeout_is_reported_distinctly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(manifest_path("0.8.0")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(manifest_080())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let (fetcher, _cache) = setup(&server, temp.path());

    let options = FetchOptions::default().with_timeout(Some(Duration::from_millis(100)));
    match fetcher.fetch("0.8.0", options).await {
        Err(StackError::Timeout(limit)) => assert_eq!(limit, Duration::from_millis(100)),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_and_clear_cache() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let (fetcher, cache) = setup(&server, temp.path());

    for version in ["0.10.0", "0.8.0", "0.9.1"] {
        let body = json!({ "version": version, "storageFormatVersion": "1" }).to_string();
        cache
            .write("compat-manifests", &format!("{}.json", version), body.as_bytes())
            .unwrap();
    }

    assert_eq!(
        fetcher.list_cached_versions().unwrap(),
        vec!["0.8.0", "0.9.1", "0.10.0"]
    );
    assert_eq!(fetcher.clear_cache().unwrap(), 3);
    assert!(fetcher.list_cached_versions().unwrap().is_empty());
}

#[tokio::test]
async fn test_relevant_breaking_change_is_reported() {
    let server = MockServer::start().await;
    mount_manifest(&server, "0.8.0", manifest_080(), 1).await;
    let temp = TempDir::new().unwrap();
    let (fetcher, _cache) = setup(&server, temp.path());

    let check = CompatibilityAnalyzer::new(fetcher)
        .check("0.7.0", "0.8.0")
        .await
        .unwrap();

    assert!(check.breaking);
    assert_eq!(check.relevant_changes.len(), 1);
    assert_eq!(check.warnings[0], BREAKING_WARNING);

    let change_warnings: Vec<&String> = check
        .warnings
        .iter()
        .filter(|w| w.contains("Session tokens moved to a dedicated table"))
        .collect();
    assert_eq!(change_warnings.len(), 1);
    assert!(change_warnings[0].contains("Sign in again after upgrading"));
    assert!(!check.warnings.iter().any(|w| w.contains("Legacy storage layout")));
    assert!(check
        .warnings
        .iter()
        .any(|w| w.contains("https://docs.example.com/migrate/0.8")));
    assert_eq!(check.required_actions, vec!["Re-issue API keys"]);
}

#[tokio::test]
async fn test_irrelevant_changes_are_not_breaking() {
    let server = MockServer::start().await;
    mount_manifest(&server, "0.8.0", manifest_080(), 1).await;
    let temp = TempDir::new().unwrap();
    let (fetcher, _cache) = setup(&server, temp.path());

    let check = CompatibilityAnalyzer::new(fetcher)
        .check_multi_hop("0.6.2", "0.8.0")
        .await
        .unwrap();

    assert!(!check.breaking);
    assert!(check.warnings.is_empty());
    assert!(check.relevant_changes.is_empty());
    assert_eq!(check.required_actions, vec!["Re-issue API keys"]);
}

#[tokio::test]
async fn test_check_without_manifest_warns() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(manifest_path("0.9.0")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let (fetcher, _cache) = setup(&server, temp.path());

    let check = CompatibilityAnalyzer::new(fetcher)
        .check("0.8.0", "v0.9.0")
        .await
        .unwrap();

    assert!(!check.breaking);
    assert_eq!(
        check.warnings,
        vec!["No compatibility manifest found for version 0.9.0"]
    );
    assert!(check.required_actions.is_empty());
}
