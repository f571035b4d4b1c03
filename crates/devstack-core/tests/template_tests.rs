//! Template distribution against a mock release server.

use devstack_core::cache::{CacheStore, FileCache};
use devstack_core::checksum::sha256_checksum;
use devstack_core::{HttpClient, ReleaseSource, RetryPolicy, StackError, TemplateDistributor};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "acme/devstack";

fn asset_path(version: &str, asset: &str) -> String {
    format!("/{}/releases/download/v{}/{}", REPO, version, asset)
}

fn react_archive() -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in [
        ("react-template/package.json", "{\"name\":\"react-template\"}"),
        ("react-template/src/App.tsx", "export default function App() {}"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn template_manifest(checksum: &str) -> serde_json::Value {
    json!({
        "version": "0.8.0",
        "templates": [
            {
                "name": "react",
                "description": "React + Vite starter",
                "file": "react-template.tar.gz",
                "size": 0,
                "checksum": checksum,
                "frameworks": ["react"],
                "features": ["auth"]
            },
            {
                "name": "vue",
                "description": "Vue starter",
                "file": "vue-template.zip",
                "size": 0,
                "checksum": "sha256:0000000000000000000000000000000000000000000000000000000000000000",
                "frameworks": ["vue"],
                "features": []
            }
        ]
    })
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(3)
        .with_base_delay(Duration::from_millis(10))
        .with_jitter(false)
}

fn setup(server: &MockServer, cache_dir: &Path) -> (TemplateDistributor, Arc<dyn CacheStore>) {
    let http = Arc::new(HttpClient::new().unwrap());
    let cache: Arc<dyn CacheStore> = Arc::new(FileCache::new(cache_dir));
    let distributor = TemplateDistributor::new(
        http,
        cache.clone(),
        ReleaseSource::with_base_url(REPO, server.uri()),
    )
    .with_retry(fast_retry());
    (distributor, cache)
}

async fn mount_manifest(server: &MockServer, checksum: &str) {
    Mock::given(method("GET"))
        .and(path(asset_path("0.8.0", "templates-manifest.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(template_manifest(checksum)))
        .mount(server)
        .await;
}

async fn mount_archive(server: &MockServer, body: Vec<u8>, times: u64) {
    Mock::given(method("GET"))
        .and(path(asset_path("0.8.0", "react-template.tar.gz")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_verifies_extracts_and_caches() {
    let server = MockServer::start().await;
    let archive = react_archive();
    mount_manifest(&server, &sha256_checksum(&archive)).await;
    mount_archive(&server, archive, 1).await;

    let temp = TempDir::new().unwrap();
    let (distributor, cache) = setup(&server, &temp.path().join("cache"));

    let first_dir = temp.path().join("app-one");
    let installed = distributor
        .download("react", "0.8.0", &first_dir)
        .await
        .unwrap();
    assert!(!installed.from_cache);
    assert!(first_dir.join("package.json").exists());
    assert!(first_dir.join("src/App.tsx").exists());
    assert_eq!(
        cache.keys("templates").unwrap(),
        vec!["react-0.8.0.tar.gz"]
    );

    let second_dir = temp.path().join("app-two");
    let again = distributor
        .download("react", "v0.8.0", &second_dir)
        .await
        .unwrap();
    assert!(again.from_cache);
    assert!(second_dir.join("package.json").exists());
}

#[tokio::test]
async fn test_checksum_mismatch_never_reaches_target() {
    let server = MockServer::start().await;
    mount_manifest(
        &server,
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
    )
    .await;
    mount_archive(&server, react_archive(), 1).await;

    let temp = TempDir::new().unwrap();
    let (distributor, cache) = setup(&server, &temp.path().join("cache"));
    let target = temp.path().join("app");

    let err = distributor
        .download("react", "0.8.0", &target)
        .await
        .unwrap_err();
    assert!(matches!(err, StackError::ChecksumMismatch { .. }));
    assert!(!target.exists());
    assert!(cache.keys("templates").unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_checksum_format_is_rejected_before_download() {
    let server = MockServer::start().await;
    mount_manifest(&server, "md5:d41d8cd98f00b204e9800998ecf8427e").await;
    mount_archive(&server, react_archive(), 0).await;

    let temp = TempDir::new().unwrap();
    let (distributor, _cache) = setup(&server, &temp.path().join("cache"));

    let err = distributor
        .download("react", "0.8.0", &temp.path().join("app"))
        .await
        .unwrap_err();
    assert!(matches!(err, StackError::ChecksumFormat { .. }));
}

#[tokio::test]
async fn test_corrupted_cached_archive_is_refetched() {
    let server = MockServer::start().await;
    let archive = react_archive();
    mount_manifest(&server, &sha256_checksum(&archive)).await;
    mount_archive(&server, archive, 2).await;

    let temp = TempDir::new().unwrap();
    let (distributor, cache) = setup(&server, &temp.path().join("cache"));

    distributor
        .download("react", "0.8.0", &temp.path().join("one"))
        .await
        .unwrap();

    let cached = cache.entry_path("templates", "react-0.8.0.tar.gz");
    fs::write(&cached, b"truncated").unwrap();

    let installed = distributor
        .download("react", "0.8.0", &temp.path().join("two"))
        .await
        .unwrap();
    assert!(!installed.from_cache);
    assert!(temp.path().join("two/package.json").exists());
}

#[tokio::test]
async fn test_unknown_template_lists_available_names() {
    let server = MockServer::start().await;
    mount_manifest(&server, &sha256_checksum(b"x")).await;

    let temp = TempDir::new().unwrap();
    let (distributor, _cache) = setup(&server, &temp.path().join("cache"));

    match distributor
        .download("svelte", "0.8.0", &temp.path().join("app"))
        .await
    {
        Err(StackError::TemplateNotFound { available, .. }) => {
            assert_eq!(available, vec!["react", "vue"]);
        }
        other => panic!("expected template-not-found, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_archive_body_is_rejected() {
    let server = MockServer::start().await;
    mount_manifest(&server, &sha256_checksum(b"")).await;
    mount_archive(&server, Vec::new(), 1).await;

    let temp = TempDir::new().unwrap();
    let (distributor, _cache) = setup(&server, &temp.path().join("cache"));

    let err = distributor
        .download("react", "0.8.0", &temp.path().join("app"))
        .await
        .unwrap_err();
    assert!(matches!(err, StackError::EmptyResponse { .. }));
}

#[tokio::test]
async fn test_manifest_fetch_retries_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(asset_path("0.8.0", "templates-manifest.json")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_manifest(&server, &sha256_checksum(b"x")).await;

    let temp = TempDir::new().unwrap();
    let (distributor, _cache) = setup(&server, &temp.path().join("cache"));

    let manifest = distributor.fetch_manifest("0.8.0").await.unwrap().unwrap();
    assert_eq!(manifest.names(), vec!["react", "vue"]);
}

#[tokio::test]
async fn test_missing_manifest_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(asset_path("0.9.0", "templates-manifest.json")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let (distributor, _cache) = setup(&server, &temp.path().join("cache"));

    assert!(distributor.fetch_manifest("0.9.0").await.unwrap().is_none());
    assert!(matches!(
        distributor.list_templates("0.9.0").await,
        Err(StackError::TemplateManifestNotFound { .. })
    ));
}

#[tokio::test]
async fn test_latest_is_resolved_through_release_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/releases/latest", REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v0.8.0",
            "name": "devstack 0.8.0",
            "prerelease": false
        })))
        .mount(&server)
        .await;
    mount_manifest(&server, &sha256_checksum(b"x")).await;

    let temp = TempDir::new().unwrap();
    let (distributor, _cache) = setup(&server, &temp.path().join("cache"));

    let templates = distributor.list_templates("latest").await.unwrap();
    assert_eq!(templates.len(), 2);
    assert_eq!(distributor.list_cached_versions().unwrap(), vec!["0.8.0"]);
}

#[tokio::test]
async fn test_cache_maintenance() {
    let server = MockServer::start().await;
    let archive = react_archive();
    mount_manifest(&server, &sha256_checksum(&archive)).await;
    mount_archive(&server, archive, 1).await;

    let temp = TempDir::new().unwrap();
    let (distributor, cache) = setup(&server, &temp.path().join("cache"));
    distributor
        .download("react", "0.8.0", &temp.path().join("app"))
        .await
        .unwrap();
    cache
        .write("templates", "react-0.7.0.tar.gz", b"older")
        .unwrap();

    assert!(distributor.cache_size().unwrap() > 0);
    assert_eq!(distributor.evict_template("react", Some("0.7.0")).unwrap(), 1);
    assert_eq!(cache.keys("templates").unwrap(), vec!["react-0.8.0.tar.gz"]);

    assert_eq!(distributor.evict_template("react", None).unwrap(), 1);
    assert_eq!(distributor.clear_cache().unwrap(), 1);
    assert_eq!(distributor.cache_size().unwrap(), 0);
}

#[tokio::test]
async fn test_evict_leaves_templates_sharing_a_name_prefix() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let (distributor, cache) = setup(&server, &temp.path().join("cache"));
    for key in [
        "react-0.7.0.tar.gz",
        "react-0.8.0.tar.gz",
        "react-native-0.8.0.tar.gz",
    ] {
        cache.write("templates", key, b"archive").unwrap();
    }

    assert_eq!(distributor.evict_template("react", Some("0.8.0")).unwrap(), 1);
    assert_eq!(distributor.evict_template("react", None).unwrap(), 1);

    assert_eq!(
        cache.keys("templates").unwrap(),
        vec!["react-native-0.8.0.tar.gz"]
    );
    assert_eq!(distributor.evict_template("react-native", None).unwrap(), 1);
}
