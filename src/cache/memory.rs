//! DashMap-backed server cache with an injectable clock
//!
//! Expired entries are dropped lazily on read and in bulk by
//! [`MemoryGeoCache::purge_expired`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use dashmap::DashMap;
use tracing::trace;

use super::traits::{CacheEntry, GeoCache, ttl_from_secs};
use crate::geo::GeoRecord;
use crate::utils::{Clock, SystemClock};

pub struct MemoryGeoCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryGeoCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_clock(ttl_secs, SystemClock::arc())
    }

    pub fn with_clock(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        trace!("MemoryGeoCache initialized: ttl={}s", ttl_secs);
        Self {
            entries: DashMap::new(),
            ttl: ttl_from_secs(ttl_secs),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            trace!("MemoryGeoCache purged {} expired entries", removed);
        }
        removed
    }
}

#[async_trait]
impl GeoCache for MemoryGeoCache {
    async fn get(&self, key: &str) -> Option<GeoRecord> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => return Some(entry.record.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            trace!("MemoryGeoCache entry expired: {}", key);
            // a concurrent put may have refreshed it in the meantime
            self.entries
                .remove_if(key, |_, entry| !entry.is_fresh(now, self.ttl));
        }
        None
    }

    async fn put(&self, key: &str, record: GeoRecord) {
        let entry = CacheEntry::new(record, self.clock.now());
        self.entries.insert(key.to_string(), entry);
    }

    async fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn clear(&self) {
        self.entries.clear();
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
