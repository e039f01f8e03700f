use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::api::middleware::RegionRoutingPolicy;
use crate::cache::{GeoCache, MemoryGeoCache, MokaGeoCache};
use crate::config::{AppConfig, CacheConfig, GeoIpConfig};
use crate::services::{ExternalApiLookup, GeoResolutionService, RetryPolicy, UpstreamGeoResolver};

/// How often the memory backend sweeps expired entries
const MEMORY_PURGE_INTERVAL_SECS: u64 = 60;

pub struct StartupContext {
    pub resolver: Arc<GeoResolutionService>,
    pub routing: RegionRoutingPolicy,
}

/// Build the process-wide server cache for the configured backend
pub fn build_server_cache(config: &CacheConfig) -> Result<Arc<dyn GeoCache>> {
    match config.backend.as_str() {
        "moka" => Ok(Arc::new(MokaGeoCache::new(
            config.max_capacity,
            config.ttl_secs,
        ))),
        "memory" => Ok(Arc::new(MemoryGeoCache::new(config.ttl_secs))),
        other => bail!("Unknown cache backend: {}", other),
    }
}

/// Resolution service over the given cache, with the external API as upstream
pub fn build_resolver(geoip: &GeoIpConfig, cache: Arc<dyn GeoCache>) -> GeoResolutionService {
    let lookup = Arc::new(ExternalApiLookup::new(geoip));
    let upstream = UpstreamGeoResolver::new(lookup, RetryPolicy::from_config(geoip));
    GeoResolutionService::new(cache, upstream)
}

/// 准备服务器启动的上下文
/// 包括缓存、上游解析器和区域路由策略
pub async fn prepare_server_startup(config: &AppConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    config.validate().context("Invalid configuration")?;

    let cache: Arc<dyn GeoCache> = match config.cache.backend.as_str() {
        "memory" => {
            let memory = Arc::new(MemoryGeoCache::new(config.cache.ttl_secs));
            spawn_memory_purge(memory.clone());
            memory
        }
        _ => build_server_cache(&config.cache)?,
    };
    warn!("Using geo cache backend: {}", cache.name());

    let resolver = Arc::new(build_resolver(&config.geoip, cache));
    let policy = RetryPolicy::from_config(&config.geoip);
    info!(
        "Upstream {} at {} ({} attempts, {}ms timeout, worst case {}ms)",
        resolver.provider_name(),
        config.geoip.api_url,
        policy.max_attempts,
        policy.timeout.as_millis(),
        policy.worst_case().as_millis()
    );

    let routing = RegionRoutingPolicy::from_config(&config.routing)
        .context("Invalid routing configuration")?;
    match routing.alternate_host() {
        Some(host) => warn!(
            "Region routing enabled: {} -> {}",
            routing.designated_region(),
            host
        ),
        None => warn!("Region routing disabled (no alternate host), all traffic served locally"),
    }
    if let Some(header) = routing.country_header() {
        warn!("Trusting platform country header \"{}\" ahead of IP lookups", header);
    }

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext { resolver, routing })
}

fn spawn_memory_purge(cache: Arc<MemoryGeoCache>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(MEMORY_PURGE_INTERVAL_SECS));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                debug!("Purged {} expired geo cache entries", removed);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_server_cache_backends() {
        let mut config = CacheConfig::default();
        assert_eq!(build_server_cache(&config).unwrap().name(), "moka");

        config.backend = "memory".to_string();
        assert_eq!(build_server_cache(&config).unwrap().name(), "memory");

        config.backend = "redis".to_string();
        assert!(build_server_cache(&config).is_err());
    }

    #[tokio::test]
    async fn test_prepare_server_startup_defaults() {
        let ctx = prepare_server_startup(&AppConfig::default()).await.unwrap();
        assert_eq!(ctx.resolver.provider_name(), "ExternalAPI");
        assert!(ctx.routing.alternate_host().is_none());
    }
}
