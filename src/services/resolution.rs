//! Geo resolution state machine
//!
//! loopback → platform hint → cache → upstream → classify → cache, with every failure folded
//! into a degraded [`Resolution`]. `resolve` has no error path: every caller
//! (redirect, client selector, payment gating) needs a decision to proceed.

use std::sync::Arc;

use serde::Serialize;
use strum::AsRefStr;
use tracing::{debug, trace, warn};

use super::geoip::UpstreamGeoResolver;
use crate::cache::{FALLBACK_KEY, GeoCache};
use crate::errors::{ErrorKind, GeoRouterError};
use crate::geo::{GeoRecord, Region, UNKNOWN_IP, normalize_country_code};
use crate::utils::ip::{is_loopback, parse_ip};

/// Where a resolved record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResolutionSource {
    /// Loopback short-circuit, no I/O
    Local,
    /// Country supplied by the edge platform, no I/O
    Platform,
    Cache,
    Upstream,
    /// Reserved fallback slot
    Fallback,
    /// Hardcoded US default
    Default,
}

/// Outcome of one resolution; degradation is data, not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: GeoRecord,
    pub source: ResolutionSource,
    pub degraded: bool,
    pub reason: Option<ErrorKind>,
}

impl Resolution {
    fn fresh(record: GeoRecord, source: ResolutionSource) -> Self {
        Self {
            record,
            source,
            degraded: false,
            reason: None,
        }
    }

    fn degraded(record: GeoRecord, source: ResolutionSource, reason: Option<ErrorKind>) -> Self {
        Self {
            record,
            source,
            degraded: true,
            reason,
        }
    }

    pub fn local() -> Self {
        Self::fresh(GeoRecord::local_default(), ResolutionSource::Local)
    }

    pub fn region(&self) -> Region {
        self.record.region()
    }
}

/// A two-letter code the platform actually resolved; `XX` (unknown) and `T1`
/// (Tor) are placeholders some edges send instead
fn platform_country(raw: &str) -> Option<String> {
    let code = normalize_country_code(raw);
    let assigned = code.len() == 2
        && code.bytes().all(|b| b.is_ascii_uppercase())
        && !matches!(code.as_str(), "XX" | "ZZ" | "T1");
    assigned.then_some(code)
}

pub struct GeoResolutionService {
    cache: Arc<dyn GeoCache>,
    upstream: UpstreamGeoResolver,
}

impl GeoResolutionService {
    pub fn new(cache: Arc<dyn GeoCache>, upstream: UpstreamGeoResolver) -> Self {
        Self { cache, upstream }
    }

    pub async fn resolve(&self, ip: &str) -> Resolution {
        self.resolve_with_hint(ip, None).await
    }

    /// Like [`resolve`](Self::resolve), but a usable `country_hint` from a
    /// trusted edge header answers without touching the cache or upstream
    pub async fn resolve_with_hint(&self, ip: &str, country_hint: Option<&str>) -> Resolution {
        let ip = ip.trim();

        if is_loopback(ip) {
            trace!("Loopback caller {:?}, serving local default", ip);
            return Resolution::local();
        }

        if let Some(code) = country_hint.and_then(platform_country) {
            let addr = parse_ip(ip).map_or_else(|| UNKNOWN_IP.to_string(), |a| a.to_string());
            trace!("Platform country for {}: {}", addr, code);
            return Resolution::fresh(GeoRecord::new(addr, &code), ResolutionSource::Platform);
        }

        // canonical form doubles as the cache key; never equals FALLBACK_KEY
        let Some(addr) = parse_ip(ip) else {
            let err = GeoRouterError::invalid_address(format!("{:?} is not an IP address", ip));
            return self.degrade(ip, err).await;
        };
        let key = addr.to_string();

        if let Some(record) = self.cache.get(&key).await {
            trace!("Geo cache hit for {}: {}", key, record.country_code());
            return Resolution::fresh(record, ResolutionSource::Cache);
        }

        match self.upstream.resolve(&key).await {
            Ok(geo) => {
                let record = geo.into_record(&key);
                debug!(
                    "Resolved {} to {} ({})",
                    key,
                    record.country_code(),
                    record.region()
                );
                self.cache.put(&key, record.clone()).await;
                Resolution::fresh(record, ResolutionSource::Upstream)
            }
            Err(e) => self.degrade(&key, e).await,
        }
    }

    async fn degrade(&self, ip: &str, err: GeoRouterError) -> Resolution {
        let reason = err.kind();
        warn!("Geo resolution for {:?} degraded: {}", ip, err);

        if let Some(record) = self.cache.get(FALLBACK_KEY).await {
            return Resolution::degraded(record, ResolutionSource::Fallback, reason);
        }

        // another client's location is never handed out; seed the US default
        let record = GeoRecord::degraded_default();
        self.cache.put(FALLBACK_KEY, record.clone()).await;
        Resolution::degraded(record, ResolutionSource::Default, reason)
    }

    /// Drop the cached resolution for one client
    pub async fn invalidate(&self, ip: &str) {
        match parse_ip(ip) {
            Some(addr) => self.cache.invalidate(&addr.to_string()).await,
            None => self.cache.invalidate(ip.trim()).await,
        }
    }

    /// Drop every cached resolution, the fallback slot included
    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    pub fn cache_name(&self) -> &'static str {
        self.cache.name()
    }

    pub fn provider_name(&self) -> &'static str {
        self.upstream.provider_name()
    }
}
