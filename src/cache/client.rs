//! Client-persisted geo cache
//!
//! Mirrors browser `localStorage` semantics: a flat string key-value store
//! holding `{"data": GeoRecord, "timestamp": epoch_ms}` under a namespaced
//! key. Expired or undeserializable entries read as absent and are deleted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::traits::{GeoCache, ttl_from_secs};
use crate::errors::{GeoRouterError, Result};
use crate::geo::GeoRecord;
use crate::utils::{Clock, SystemClock};

/// Key used by a single-user client for "the current session"
pub const SESSION_KEY: &str = "session";

/// Minimal persistent string store
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

/// In-process store, mostly for tests
#[derive(Default)]
pub struct MemoryStore {
    items: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).map(|v| v.clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.iter().map(|e| e.key().clone()).collect())
    }
}

/// Single JSON file holding every item, rewritten atomically on change
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store backed by `<dir>/store.json`; the directory is created on first write
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("store.json"),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(items)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock();
        // an unreadable store file is replaced rather than bricking the client
        let mut items = self.read_all().unwrap_or_else(|e| {
            warn!("Store file {} unreadable, resetting: {}", self.path.display(), e);
            BTreeMap::new()
        });
        f(&mut items);
        self.write_all(&items)
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.modify(|items| {
            items.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.into_keys().collect())
    }
}

/// Persisted shape
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    data: GeoRecord,
    /// epoch milliseconds
    timestamp: i64,
}

pub struct ClientGeoCache {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ClientGeoCache {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str, ttl_secs: u64) -> Self {
        Self::with_clock(store, namespace, ttl_secs, SystemClock::arc())
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        namespace: &str,
        ttl_secs: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
            ttl: ttl_from_secs(ttl_secs),
            clock,
        }
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Read a fresh record; expired and corrupt entries are removed
    pub fn load(&self, key: &str) -> Option<GeoRecord> {
        self.load_with_timestamp(key).map(|(record, _)| record)
    }

    /// Like [`load`](Self::load), also returning when the record was stored (epoch ms)
    pub fn load_with_timestamp(&self, key: &str) -> Option<(GeoRecord, i64)> {
        let storage_key = self.storage_key(key);
        let raw = match self.store.get_item(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read cached geo location: {}", e);
                return None;
            }
        };

        let entry: PersistedEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                let err = GeoRouterError::cache_corrupt(format!("{}: {}", storage_key, e));
                warn!("{}", err);
                self.remove_quietly(&storage_key);
                return None;
            }
        };

        // a timestamp from the future or out of range is as unusable as bad JSON
        let now_ms = self.clock.now().timestamp_millis();
        let Some(age_ms) = now_ms
            .checked_sub(entry.timestamp)
            .filter(|age_ms| *age_ms >= 0)
        else {
            let err = GeoRouterError::cache_corrupt(format!(
                "{}: timestamp {} is not in the past",
                storage_key, entry.timestamp
            ));
            warn!("{}", err);
            self.remove_quietly(&storage_key);
            return None;
        };

        if age_ms >= self.ttl.num_milliseconds() {
            debug!("Cached geo location {} expired", storage_key);
            self.remove_quietly(&storage_key);
            return None;
        }

        trace!("Client geo cache hit: {}", storage_key);
        Some((entry.data, entry.timestamp))
    }

    pub fn save(&self, key: &str, record: &GeoRecord) -> Result<()> {
        self.save_at(key, record, self.clock.now().timestamp_millis())
    }

    /// Store `record` as if it had been saved at `timestamp` (epoch ms)
    pub fn save_at(&self, key: &str, record: &GeoRecord, timestamp: i64) -> Result<()> {
        let entry = PersistedEntry {
            data: record.clone(),
            timestamp,
        };
        let raw = serde_json::to_string(&entry)?;
        self.store.set_item(&self.storage_key(key), &raw)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove_item(&self.storage_key(key))
    }

    /// Remove every entry in this namespace
    pub fn remove_all(&self) -> Result<()> {
        let prefix = format!("{}:", self.namespace);
        for key in self.store.keys()? {
            if key.starts_with(&prefix) {
                self.store.remove_item(&key)?;
            }
        }
        Ok(())
    }

    fn remove_quietly(&self, storage_key: &str) {
        if let Err(e) = self.store.remove_item(storage_key) {
            warn!("Failed to remove cached geo location {}: {}", storage_key, e);
        }
    }
}

#[async_trait]
impl GeoCache for ClientGeoCache {
    async fn get(&self, key: &str) -> Option<GeoRecord> {
        self.load(key)
    }

    async fn put(&self, key: &str, record: GeoRecord) {
        if let Err(e) = self.save(key, &record) {
            warn!("Failed to cache geo location: {}", e);
        }
    }

    async fn invalidate(&self, key: &str) {
        if let Err(e) = self.remove(key) {
            warn!("Failed to clear geo cache entry: {}", e);
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.remove_all() {
            warn!("Failed to clear geo cache: {}", e);
        }
    }

    fn name(&self) -> &'static str {
        "client"
    }
}
