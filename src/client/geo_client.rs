use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};
use ureq::Agent;

use crate::api::middleware::GEO_FALLBACK_HEADER;
use crate::cache::{ClientGeoCache, FileStore, SESSION_KEY};
use crate::config::AppConfig;
use crate::errors::{GeoRouterError, Result};
use crate::geo::GeoRecord;

const DETECT_PATH: &str = "/api/geo/detect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    /// Served from the persisted client cache
    Cache,
    /// Fetched from the detect endpoint
    Server,
    /// Refresh failed; the record persisted before it was kept
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLocation {
    pub record: GeoRecord,
    pub source: LocationSource,
    /// The server answered with `X-Geo-Fallback: true`
    pub degraded: bool,
}

/// Detect API client with a persisted location cache
pub struct GeoClient {
    detect_url: String,
    agent: Agent,
    cache: ClientGeoCache,
}

impl GeoClient {
    pub fn new(server_url: &str, cache: ClientGeoCache, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            detect_url: format!("{}{}", server_url.trim_end_matches('/'), DETECT_PATH),
            agent,
            cache,
        }
    }

    /// File-backed client cache under `cache.client_dir`
    pub fn from_config(server_url: &str, config: &AppConfig) -> Self {
        let store = Arc::new(FileStore::new(&config.cache.client_dir));
        let cache = ClientGeoCache::new(
            store,
            &config.cache.client_namespace,
            config.cache.client_ttl_secs,
        );
        Self::new(
            server_url,
            cache,
            Duration::from_millis(config.geoip.timeout_ms),
        )
    }

    pub fn detect_url(&self) -> &str {
        &self.detect_url
    }

    /// Persisted location if fresh, otherwise ask the server
    pub async fn location(&self) -> Result<ClientLocation> {
        if let Some(record) = self.cache.load(SESSION_KEY) {
            trace!("Using persisted location {}", record.country_code());
            return Ok(ClientLocation {
                record,
                source: LocationSource::Cache,
                degraded: false,
            });
        }

        self.fetch_and_persist().await
    }

    /// Drop the persisted location and detect again
    ///
    /// If the detect fails, the record persisted before the refresh is
    /// restored with its original timestamp and returned as
    /// [`LocationSource::Stale`].
    pub async fn refresh(&self) -> Result<ClientLocation> {
        let previous = self.cache.load_with_timestamp(SESSION_KEY);
        self.clear_cache()?;

        match self.fetch_and_persist().await {
            Ok(location) => Ok(location),
            Err(e) => match previous {
                Some((record, stored_at)) => {
                    warn!("Location refresh failed, keeping previous record: {}", e);
                    if let Err(e) = self.cache.save_at(SESSION_KEY, &record, stored_at) {
                        warn!("Failed to restore persisted location: {}", e);
                    }
                    Ok(ClientLocation {
                        record,
                        source: LocationSource::Stale,
                        degraded: true,
                    })
                }
                None => Err(e),
            },
        }
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.cache.remove(SESSION_KEY)
    }

    async fn fetch_and_persist(&self) -> Result<ClientLocation> {
        let (record, degraded) = self.fetch().await?;
        // a degraded answer is not worth keeping for a whole client TTL
        if degraded {
            debug!("Server answered with a fallback location, not persisting it");
        } else {
            self.persist(&record);
        }
        Ok(ClientLocation {
            record,
            source: LocationSource::Server,
            degraded,
        })
    }

    fn persist(&self, record: &GeoRecord) {
        if let Err(e) = self.cache.save(SESSION_KEY, record) {
            warn!("Failed to persist location: {}", e);
        }
    }

    async fn fetch(&self) -> Result<(GeoRecord, bool)> {
        let agent = self.agent.clone();
        let url = self.detect_url.clone();

        tokio::task::spawn_blocking(move || Self::fetch_sync(agent, url))
            .await
            .unwrap_or_else(|e| {
                Err(GeoRouterError::client(format!(
                    "detect task failed: {}",
                    e
                )))
            })
    }

    fn fetch_sync(agent: Agent, url: String) -> Result<(GeoRecord, bool)> {
        let mut resp = agent
            .get(&url)
            .header("Accept", "application/json")
            .call()
            .map_err(|e| GeoRouterError::client(format!("request to \"{}\" failed: {}", url, e)))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(GeoRouterError::client(format!(
                "\"{}\" answered HTTP {}",
                url, status
            )));
        }

        let degraded = resp
            .headers()
            .get(GEO_FALLBACK_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let record: GeoRecord = resp.body_mut().read_json().map_err(|e| {
            GeoRouterError::client(format!("unreadable location from \"{}\": {}", url, e))
        })?;

        Ok((record, degraded))
    }
}
