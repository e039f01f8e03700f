use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoRecord;

/// Reserved key holding the last-known-good record for upstream outages.
///
/// Never a valid IP address, so it cannot collide with a client key.
pub const FALLBACK_KEY: &str = "fallback";

/// TTL as a [`Duration`]; values beyond its range saturate instead of wrapping
pub fn ttl_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// A record plus the moment it was resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub record: GeoRecord,
    pub resolved_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(record: GeoRecord, resolved_at: DateTime<Utc>) -> Self {
        Self {
            record,
            resolved_at,
        }
    }

    /// Valid while `now - resolved_at < ttl`
    #[inline]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.resolved_at < ttl
    }
}

/// Expiring key → [`GeoRecord`] map.
///
/// Entries are replaced wholesale, never mutated. Concurrent `put`s for the
/// same key are last-writer-wins.
#[async_trait]
pub trait GeoCache: Send + Sync {
    /// Fresh record for `key`, or `None` if absent or expired
    async fn get(&self, key: &str) -> Option<GeoRecord>;
    async fn put(&self, key: &str, record: GeoRecord);
    async fn invalidate(&self, key: &str);
    async fn clear(&self);

    /// Backend name (用于日志和健康检查)
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_freshness_boundary() {
        let at = Utc::now();
        let entry = CacheEntry::new(GeoRecord::new("1.1.1.1", "US"), at);
        let ttl = Duration::minutes(30);

        assert!(entry.is_fresh(at, ttl));
        assert!(entry.is_fresh(at + Duration::minutes(29), ttl));
        // exactly TTL old is already stale
        assert!(!entry.is_fresh(at + ttl, ttl));
    }

    #[test]
    fn test_ttl_from_secs_saturates() {
        assert_eq!(ttl_from_secs(1800), Duration::minutes(30));
        assert_eq!(ttl_from_secs(10_u64.pow(16)), Duration::MAX);
        assert_eq!(ttl_from_secs(u64::MAX), Duration::MAX);
    }
}
