use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::trace;

use super::traits::GeoCache;
use crate::geo::GeoRecord;

/// moka rejects TTLs longer than 1000 years
const MOKA_MAX_TTL_SECS: u64 = 1000 * 365 * 24 * 60 * 60;

/// Bounded server cache (LRU + TTL)
pub struct MokaGeoCache {
    inner: Cache<String, GeoRecord>,
}

impl MokaGeoCache {
    pub fn new(max_capacity: u64, ttl_secs: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs.min(MOKA_MAX_TTL_SECS)))
            .build();

        trace!(
            "MokaGeoCache initialized: max_capacity={}, ttl={}s",
            max_capacity, ttl_secs
        );

        Self { inner }
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[async_trait]
impl GeoCache for MokaGeoCache {
    async fn get(&self, key: &str) -> Option<GeoRecord> {
        let result = self.inner.get(key).await;
        if result.is_some() {
            trace!("Geo cache hit for key: {}", key);
        }
        result
    }

    async fn put(&self, key: &str, record: GeoRecord) {
        self.inner.insert(key.to_string(), record).await;
    }

    async fn invalidate(&self, key: &str) {
        trace!("Invalidating geo cache key: {}", key);
        self.inner.invalidate(key).await;
    }

    async fn clear(&self) {
        trace!("Clearing geo cache");
        self.inner.invalidate_all();
    }

    fn name(&self) -> &'static str {
        "moka"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = MokaGeoCache::new(1000, 60);

        assert!(cache.get("8.8.8.8").await.is_none());

        cache.put("8.8.8.8", GeoRecord::new("8.8.8.8", "US")).await;
        let got = cache.get("8.8.8.8").await.unwrap();
        assert_eq!(got.country_code(), "US");

        assert!(cache.get("1.1.1.1").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = MokaGeoCache::new(1000, 60);

        cache.put("8.8.8.8", GeoRecord::new("8.8.8.8", "US")).await;
        cache.invalidate("8.8.8.8").await;
        assert!(cache.get("8.8.8.8").await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MokaGeoCache::new(1000, 60);

        cache.put("a", GeoRecord::new("a", "CN")).await;
        cache.put("b", GeoRecord::new("b", "FR")).await;

        cache.clear().await;

        // Moka 的 invalidate_all 是异步的，需要等待同步
        cache.inner.run_pending_tasks().await;

        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_none());
    }

    #[tokio::test]
    async fn test_huge_ttl_is_clamped() {
        let cache = MokaGeoCache::new(10, u64::MAX);
        cache.put("k", GeoRecord::new("k", "SG")).await;
        assert!(cache.get("k").await.is_some());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = MokaGeoCache::new(1000, 1);

        cache.put("expiring", GeoRecord::new("expiring", "IN")).await;
        assert!(cache.get("expiring").await.is_some());

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        cache.inner.run_pending_tasks().await;

        assert!(cache.get("expiring").await.is_none());
    }
}
