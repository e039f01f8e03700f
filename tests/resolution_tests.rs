//! Geo resolution service tests
//!
//! loopback short-circuit, cache hit / expiry, upstream success and every
//! degradation path, driven by a counting fake upstream and a manual clock.

mod common;

use std::sync::Arc;

use chrono::Duration;

use common::{FakeLookup, HangingLookup, SERVER_TTL_SECS, fast_policy, harness};
use georouter::cache::{FALLBACK_KEY, GeoCache, MemoryGeoCache};
use georouter::errors::ErrorKind;
use georouter::geo::{GeoRecord, Language, Region, UNKNOWN_IP};
use georouter::services::{GeoResolutionService, ResolutionSource, UpstreamGeoResolver};

// =============================================================================
// Loopback
// =============================================================================

#[tokio::test]
async fn test_loopback_never_calls_upstream() {
    let h = harness(FakeLookup::answering("CN"));

    for ip in ["127.0.0.1", "::1", "", "  127.0.0.1  ", "127.0.0.1:8080"] {
        let r = h.service.resolve(ip).await;
        assert_eq!(r.source, ResolutionSource::Local, "{:?}", ip);
        assert_eq!(r.record.country_code(), "US");
        assert_eq!(r.record.city(), Some("Local Development"));
        assert!(!r.degraded);
    }

    assert_eq!(h.lookup.calls(), 0);
    assert!(h.cache.is_empty());
}

// =============================================================================
// Cache
// =============================================================================

#[tokio::test]
async fn test_upstream_result_is_cached() {
    let h = harness(FakeLookup::answering("cn"));

    let first = h.service.resolve("203.0.113.7").await;
    assert_eq!(first.source, ResolutionSource::Upstream);
    assert_eq!(first.region(), Region::China);
    assert_eq!(first.record.language(), Language::Zh);
    assert_eq!(first.record.ip(), "203.0.113.7");

    let second = h.service.resolve("203.0.113.7").await;
    assert_eq!(second.source, ResolutionSource::Cache);
    assert_eq!(second.record, first.record);
    assert_eq!(h.lookup.calls(), 1);
}

#[tokio::test]
async fn test_cache_key_is_canonical_address() {
    let h = harness(FakeLookup::answering("FR"));

    h.service.resolve("2001:DB8::1").await;
    let r = h.service.resolve("2001:db8:0:0::1").await;

    assert_eq!(r.source, ResolutionSource::Cache);
    assert_eq!(h.lookup.calls(), 1);
}

#[tokio::test]
async fn test_expired_entry_triggers_one_new_lookup() {
    let h = harness(FakeLookup::answering("DE"));

    h.service.resolve("198.51.100.1").await;
    h.clock
        .advance(Duration::seconds(SERVER_TTL_SECS as i64 - 1));
    assert_eq!(
        h.service.resolve("198.51.100.1").await.source,
        ResolutionSource::Cache
    );
    assert_eq!(h.lookup.calls(), 1);

    h.clock.advance(Duration::seconds(1));
    let r = h.service.resolve("198.51.100.1").await;
    assert_eq!(r.source, ResolutionSource::Upstream);
    assert_eq!(h.lookup.calls(), 2);

    // refreshed entry is served from cache again
    h.service.resolve("198.51.100.1").await;
    assert_eq!(h.lookup.calls(), 2);
}

#[tokio::test]
async fn test_invalidate_forces_lookup() {
    let h = harness(FakeLookup::answering("IN"));

    h.service.resolve("198.51.100.2").await;
    h.service.invalidate("198.51.100.2").await;
    h.service.resolve("198.51.100.2").await;

    assert_eq!(h.lookup.calls(), 2);
}

// =============================================================================
// Degradation
// =============================================================================

#[tokio::test]
async fn test_failure_without_fallback_returns_us_default() {
    let h = harness(FakeLookup::failing());

    let r = h.service.resolve("198.51.100.3").await;

    assert!(r.degraded);
    assert_eq!(r.source, ResolutionSource::Default);
    assert_eq!(r.reason, Some(ErrorKind::UpstreamHttpError));
    assert_eq!(r.record, GeoRecord::degraded_default());
    // both attempts were made
    assert_eq!(h.lookup.calls(), 2);

    // the fallback slot now holds the default
    assert_eq!(
        h.cache.get(FALLBACK_KEY).await,
        Some(GeoRecord::degraded_default())
    );
    // the failed address itself is not cached
    assert!(h.cache.get("198.51.100.3").await.is_none());
}

#[tokio::test]
async fn test_failure_with_fallback_returns_fallback() {
    let h = harness(FakeLookup::failing());
    let stored = GeoRecord::new(UNKNOWN_IP, "SG").with_country_name("Singapore");
    h.cache.put(FALLBACK_KEY, stored.clone()).await;

    let r = h.service.resolve("198.51.100.4").await;

    assert!(r.degraded);
    assert_eq!(r.source, ResolutionSource::Fallback);
    assert_eq!(r.record, stored);
}

#[tokio::test]
async fn test_fallback_never_reuses_another_clients_answer() {
    let h = harness(FakeLookup::answering("CN"));
    let first = h.service.resolve("198.51.100.5").await;
    assert_eq!(first.region(), Region::China);

    h.lookup.set_country(None);
    let r = h.service.resolve("8.8.8.8").await;

    assert!(r.degraded);
    assert_eq!(r.source, ResolutionSource::Default);
    assert_eq!(r.record, GeoRecord::degraded_default());
    assert_eq!(
        h.cache.get(FALLBACK_KEY).await,
        Some(GeoRecord::degraded_default())
    );
}

#[tokio::test]
async fn test_recovery_after_outage() {
    let h = harness(FakeLookup::failing());
    assert!(h.service.resolve("198.51.100.7").await.degraded);

    h.lookup.set_country(Some("US"));
    let r = h.service.resolve("198.51.100.7").await;
    assert!(!r.degraded);
    assert_eq!(r.source, ResolutionSource::Upstream);
}

#[tokio::test]
async fn test_invalid_address_degrades_without_lookup() {
    let h = harness(FakeLookup::answering("CN"));

    for ip in ["not-an-ip", "fallback", "999.1.1.1"] {
        let r = h.service.resolve(ip).await;
        assert!(r.degraded, "{:?}", ip);
        assert_eq!(r.reason, Some(ErrorKind::InvalidAddress));
        assert_eq!(r.record.country_code(), "US");
    }
    assert_eq!(h.lookup.calls(), 0);
}

#[tokio::test]
async fn test_clear_drops_fallback() {
    let h = harness(FakeLookup::answering("CN"));
    h.service.resolve("198.51.100.8").await;
    h.lookup.set_country(None);
    h.service.resolve("198.51.100.9").await;

    h.service.clear().await;
    assert!(h.cache.is_empty());

    let r = h.service.resolve("198.51.100.9").await;
    assert_eq!(r.source, ResolutionSource::Default);
}

#[tokio::test]
async fn test_names() {
    let h = harness(FakeLookup::answering("CN"));
    assert_eq!(h.service.cache_name(), "memory");
    assert_eq!(h.service.provider_name(), "fake");
}

// =============================================================================
// Platform country hint
// =============================================================================

#[tokio::test]
async fn test_country_hint_answers_without_cache_or_upstream() {
    let h = harness(FakeLookup::answering("US"));

    let r = h.service.resolve_with_hint("198.51.100.40", Some("sg")).await;

    assert_eq!(r.source, ResolutionSource::Platform);
    assert!(!r.degraded);
    assert_eq!(r.region(), Region::Singapore);
    assert_eq!(r.record.ip(), "198.51.100.40");
    assert_eq!(h.lookup.calls(), 0);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_unusable_country_hint_falls_back_to_lookup() {
    let h = harness(FakeLookup::answering("IN"));

    for hint in ["XX", "T1", "", "not-a-code"] {
        let r = h.service.resolve_with_hint("198.51.100.41", Some(hint)).await;
        assert_ne!(r.source, ResolutionSource::Platform, "{:?}", hint);
        assert_eq!(r.region(), Region::India);
    }
    // first miss goes upstream, the rest hit the cache
    assert_eq!(h.lookup.calls(), 1);
}

#[tokio::test]
async fn test_loopback_wins_over_country_hint() {
    let h = harness(FakeLookup::answering("US"));
    let r = h.service.resolve_with_hint("127.0.0.1", Some("CN")).await;
    assert_eq!(r.source, ResolutionSource::Local);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_hanging_lookup_does_not_block_other_clients() {
    let lookup = HangingLookup::new("198.51.100.66", "IN");
    let service = Arc::new(GeoResolutionService::new(
        Arc::new(MemoryGeoCache::new(SERVER_TTL_SECS)),
        UpstreamGeoResolver::new(lookup.clone(), fast_policy()),
    ));
    let start = tokio::time::Instant::now();

    let stuck = tokio::spawn({
        let service = service.clone();
        async move { service.resolve("198.51.100.66").await }
    });
    tokio::task::yield_now().await;
    assert_eq!(lookup.calls(), 1);

    let other = service.resolve("203.0.113.7").await;
    assert!(!other.degraded);
    assert_eq!(other.region(), Region::India);
    // answered while the first lookup is still in flight
    assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    assert!(!stuck.is_finished());

    let stuck = stuck.await.unwrap();
    assert!(stuck.degraded);
    assert_eq!(stuck.reason, Some(ErrorKind::UpstreamTimeout));
    assert_eq!(start.elapsed(), fast_policy().worst_case());
}
