//! GeoClient tests: persisted cache, detect fetch, fallback header

use std::sync::Arc;
use std::time::Duration;

use georouter::cache::{ClientGeoCache, FileStore, KeyValueStore, MemoryStore, SESSION_KEY};
use georouter::client::{GeoClient, LocationSource};
use georouter::config::AppConfig;
use georouter::geo::{GeoRecord, Region};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DETECT_PATH: &str = "/api/geo/detect";
const CN_BODY: &str = r#"{"ip":"203.0.113.40","countryCode":"CN","countryName":"China","region":"china","language":"zh","isEurope":false}"#;

fn json(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/json")
}

async fn detect_server(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DETECT_PATH))
        .and(header("accept", "application/json"))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

fn memory_client(server: &MockServer) -> (GeoClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let cache = ClientGeoCache::new(store.clone(), "geo_test", 86_400);
    (
        GeoClient::new(&server.uri(), cache, Duration::from_secs(2)),
        store,
    )
}

// =============================================================================
// location()
// =============================================================================

#[tokio::test]
async fn test_location_fetches_then_serves_from_cache() {
    let server = detect_server(json(200, CN_BODY)).await;
    let (client, store) = memory_client(&server);

    let first = client.location().await.unwrap();
    assert_eq!(first.source, LocationSource::Server);
    assert!(!first.degraded);
    assert_eq!(first.record.region(), Region::China);

    let stored = store.get_item("geo_test:session").unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["data"]["countryCode"], "CN");
    assert!(stored["timestamp"].is_i64());

    let second = client.location().await.unwrap();
    assert_eq!(second.source, LocationSource::Cache);
    assert_eq!(second.record, first.record);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_degraded_answer_not_persisted() {
    let server = detect_server(
        json(
            200,
            r#"{"ip":"unknown","countryCode":"US","countryName":"United States","city":"Unknown"}"#,
        )
        .insert_header("X-Geo-Fallback", "true"),
    )
    .await;
    let (client, store) = memory_client(&server);

    let location = client.location().await.unwrap();
    assert!(location.degraded);
    assert_eq!(location.record.country_code(), "US");
    assert!(store.get_item("geo_test:session").unwrap().is_none());

    client.location().await.unwrap();
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_server_error_without_cache_fails() {
    let server = detect_server(ResponseTemplate::new(500)).await;
    let (client, _) = memory_client(&server);

    assert!(client.location().await.is_err());
}

// =============================================================================
// refresh() / clear_cache()
// =============================================================================

#[tokio::test]
async fn test_refresh_refetches() {
    let server = detect_server(json(200, CN_BODY)).await;
    let (client, store) = memory_client(&server);
    let stale = ClientGeoCache::new(store, "geo_test", 86_400);
    stale
        .save(SESSION_KEY, &GeoRecord::new("203.0.113.40", "US"))
        .unwrap();

    let location = client.refresh().await.unwrap();

    assert_eq!(location.source, LocationSource::Server);
    assert_eq!(location.record.country_code(), "CN");
    assert_eq!(stale.load(SESSION_KEY).unwrap().country_code(), "CN");
}

#[tokio::test]
async fn test_refresh_server_error_keeps_previous() {
    let server = detect_server(ResponseTemplate::new(502)).await;
    let (client, store) = memory_client(&server);
    let view = ClientGeoCache::new(store, "geo_test", 86_400);
    view.save(SESSION_KEY, &GeoRecord::new("203.0.113.40", "SG"))
        .unwrap();

    let location = client.refresh().await.unwrap();

    assert_eq!(location.source, LocationSource::Stale);
    assert_eq!(location.record.country_code(), "SG");
    assert_eq!(view.load(SESSION_KEY).unwrap().country_code(), "SG");
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_clear_cache_then_location_refetches() {
    let server = detect_server(json(200, CN_BODY)).await;
    let (client, _) = memory_client(&server);

    client.location().await.unwrap();
    client.clear_cache().unwrap();
    client.location().await.unwrap();

    assert_eq!(request_count(&server).await, 2);
}

// =============================================================================
// File-backed cache
// =============================================================================

#[tokio::test]
async fn test_from_config_persists_to_disk() {
    let server = detect_server(json(200, CN_BODY)).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.cache.client_dir = dir.path().to_string_lossy().into_owned();

    let client = GeoClient::from_config(&server.uri(), &config);
    client.location().await.unwrap();

    // a fresh client over the same directory reads the persisted record
    let again = GeoClient::from_config(&server.uri(), &config);
    let location = again.location().await.unwrap();
    assert_eq!(location.source, LocationSource::Cache);
    assert_eq!(request_count(&server).await, 1);

    let store = FileStore::new(dir.path());
    let key = format!("{}:{}", config.cache.client_namespace, SESSION_KEY);
    assert!(store.get_item(&key).unwrap().is_some());
}
