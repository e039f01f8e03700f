//! GeoIP 查询抽象层
//!
//! [`GeoLookup`] is one attempt against some source; [`UpstreamGeoResolver`]
//! wraps it with the per-attempt timeout and the bounded retry policy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::GeoIpConfig;
use crate::errors::{GeoRouterError, Result};
use crate::geo::GeoRecord;

/// Raw upstream answer, before classification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamGeo {
    /// ISO 3166-1 alpha-2, already uppercased
    pub country_code: String,
    pub country_name: Option<String>,
    pub city: Option<String>,
    pub currency: Option<String>,
    pub timezone: Option<String>,
}

impl UpstreamGeo {
    pub fn new(country_code: &str) -> Self {
        Self {
            country_code: country_code.trim().to_ascii_uppercase(),
            ..Default::default()
        }
    }

    /// Classify into a record for `ip`
    pub fn into_record(self, ip: &str) -> GeoRecord {
        GeoRecord::new(ip, &self.country_code)
            .with_country_name(self.country_name.unwrap_or_default())
            .with_city(self.city)
            .with_currency(self.currency)
            .with_timezone(self.timezone)
    }
}

/// A single lookup attempt
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<UpstreamGeo>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub backoff: Duration,
    /// Hard limit for each attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(500),
            timeout: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &GeoIpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Upper bound on the time `resolve` can take
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        self.timeout * attempts + self.backoff * (attempts - 1)
    }
}

/// Upstream resolver with timeout + bounded retry.
///
/// Any failed attempt is retried the same way; there is no retryable vs
/// fatal distinction. No retry after success.
#[derive(Clone)]
pub struct UpstreamGeoResolver {
    lookup: Arc<dyn GeoLookup>,
    policy: RetryPolicy,
}

impl UpstreamGeoResolver {
    pub fn new(lookup: Arc<dyn GeoLookup>, policy: RetryPolicy) -> Self {
        Self { lookup, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn provider_name(&self) -> &'static str {
        self.lookup.name()
    }

    pub async fn resolve(&self, ip: &str) -> Result<UpstreamGeo> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let outcome = match tokio::time::timeout(self.policy.timeout, self.lookup.lookup(ip))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(GeoRouterError::upstream_timeout(format!(
                    "{} gave no answer within {}ms",
                    self.lookup.name(),
                    self.policy.timeout.as_millis()
                ))),
            };

            match outcome {
                Ok(geo) => {
                    debug!(
                        "GeoIP lookup for {} via {} succeeded on attempt {}: {}",
                        ip,
                        self.lookup.name(),
                        attempt,
                        geo.country_code
                    );
                    return Ok(geo);
                }
                Err(e) => {
                    warn!(
                        "GeoIP lookup for {} failed (attempt {}/{}): {}",
                        ip, attempt, attempts, e
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| GeoRouterError::upstream_transport("no lookup attempt was made")))
    }
}
