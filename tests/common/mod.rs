//! Shared fakes for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use georouter::cache::{GeoCache, MemoryGeoCache};
use georouter::errors::{GeoRouterError, Result};
use georouter::services::{
    GeoLookup, GeoResolutionService, RetryPolicy, UpstreamGeo, UpstreamGeoResolver,
};
use georouter::utils::ManualClock;

/// Upstream that answers a fixed country (or fails) and counts calls
pub struct FakeLookup {
    country: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl FakeLookup {
    pub fn answering(country: &str) -> Arc<Self> {
        Arc::new(Self {
            country: Mutex::new(Some(country.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            country: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    /// `None` makes every later attempt fail with HTTP 503
    pub fn set_country(&self, country: Option<&str>) {
        *self.country.lock() = country.map(String::from);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoLookup for FakeLookup {
    async fn lookup(&self, _ip: &str) -> Result<UpstreamGeo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let country = self.country.lock().clone();
        match country {
            Some(code) => Ok(UpstreamGeo::new(&code)),
            None => Err(GeoRouterError::upstream_http("HTTP 503")),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Upstream that never answers for one address and answers every other one
pub struct HangingLookup {
    hang_ip: String,
    country: String,
    calls: AtomicUsize,
}

impl HangingLookup {
    pub fn new(hang_ip: &str, country: &str) -> Arc<Self> {
        Arc::new(Self {
            hang_ip: hang_ip.to_string(),
            country: country.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoLookup for HangingLookup {
    async fn lookup(&self, ip: &str) -> Result<UpstreamGeo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ip == self.hang_ip {
            std::future::pending::<()>().await;
        }
        Ok(UpstreamGeo::new(&self.country))
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

/// Two attempts, no backoff, so failures cost exactly two calls
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        backoff: Duration::ZERO,
        timeout: Duration::from_secs(1),
    }
}

pub const SERVER_TTL_SECS: u64 = 1800;

pub struct Harness {
    pub lookup: Arc<FakeLookup>,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<MemoryGeoCache>,
    pub service: Arc<GeoResolutionService>,
}

pub fn harness(lookup: Arc<FakeLookup>) -> Harness {
    let clock = ManualClock::starting_now();
    let cache = Arc::new(MemoryGeoCache::with_clock(SERVER_TTL_SECS, clock.clone()));
    let upstream = UpstreamGeoResolver::new(lookup.clone(), fast_policy());
    let service = Arc::new(GeoResolutionService::new(
        cache.clone() as Arc<dyn GeoCache>,
        upstream,
    ));
    Harness {
        lookup,
        clock,
        cache,
        service,
    }
}
