//! 外部 GeoIP API 实现
//!
//! ipapi.co style endpoint: `GET https://ipapi.co/{ip}/json/`. Failures are
//! reported either as a non-2xx status or as `{"error": true, "reason": ...}`
//! with a 200.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{trace, warn};
use ureq::Agent;

use super::provider::{GeoLookup, UpstreamGeo};
use crate::config::GeoIpConfig;
use crate::errors::{GeoRouterError, Result};

/// Fields we read from the upstream body
#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

impl ApiResponse {
    fn is_error(&self) -> bool {
        match &self.error {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(serde_json::Value::Null) | None => false,
            Some(_) => true,
        }
    }
}

/// Turn a status + body into a country answer or the matching upstream error
pub fn parse_response(status: u16, body: &str) -> Result<UpstreamGeo> {
    if !(200..300).contains(&status) {
        return Err(GeoRouterError::upstream_http(format!("HTTP {}", status)));
    }

    let resp: ApiResponse = serde_json::from_str(body).map_err(|e| {
        GeoRouterError::upstream_application(format!("unparseable response body: {}", e))
    })?;

    if resp.is_error() {
        return Err(GeoRouterError::upstream_application(
            resp.reason.unwrap_or_else(|| "API Error".to_string()),
        ));
    }

    let country_code = resp
        .country_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| GeoRouterError::upstream_application("response has no country_code"))?;

    Ok(UpstreamGeo {
        country_code: country_code.to_ascii_uppercase(),
        country_name: resp.country_name,
        city: resp.city,
        currency: resp.currency,
        timezone: resp.timezone,
    })
}

/// 外部 API GeoIP Provider
///
/// The HTTP call is blocking (ureq) and runs on the blocking pool; the
/// resolver's own timeout bounds how long a request waits for it.
pub struct ExternalApiLookup {
    api_url_template: String,
    user_agent: String,
    agent: Agent,
}

impl ExternalApiLookup {
    /// `api_url_template` 使用 `{ip}` 作为占位符
    pub fn new(config: &GeoIpConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_millis(config.timeout_ms)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            api_url_template: config.api_url.clone(),
            user_agent: config.user_agent.clone(),
            agent,
        }
    }

    pub fn url_for(&self, ip: &str) -> String {
        self.api_url_template.replace("{ip}", ip)
    }

    fn fetch_sync(agent: Agent, url: String, user_agent: String) -> Result<UpstreamGeo> {
        let mut resp = match agent
            .get(&url)
            .header("User-Agent", &user_agent)
            .header("Accept", "application/json")
            .call()
        {
            Ok(r) => r,
            Err(ureq::Error::Timeout(t)) => {
                return Err(GeoRouterError::upstream_timeout(format!(
                    "request to \"{}\" timed out ({:?})",
                    url, t
                )));
            }
            Err(e) => {
                return Err(GeoRouterError::upstream_transport(format!(
                    "request to \"{}\" failed: {}",
                    url, e
                )));
            }
        };

        let status = resp.status().as_u16();
        let body = match resp.body_mut().read_to_string() {
            Ok(body) => body,
            Err(ureq::Error::Timeout(t)) => {
                return Err(GeoRouterError::upstream_timeout(format!(
                    "reading body from \"{}\" timed out ({:?})",
                    url, t
                )));
            }
            // a failed status is more telling than the unreadable body
            Err(_) if !(200..300).contains(&status) => String::new(),
            Err(e) => {
                return Err(GeoRouterError::upstream_transport(format!(
                    "reading body from \"{}\" failed: {}",
                    url, e
                )));
            }
        };

        trace!("External API {} answered {}: {}", url, status, body);
        parse_response(status, &body)
    }
}

#[async_trait]
impl GeoLookup for ExternalApiLookup {
    async fn lookup(&self, ip: &str) -> Result<UpstreamGeo> {
        let url = self.url_for(ip);
        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();

        // 使用 spawn_blocking 在线程池中执行同步 HTTP 请求
        tokio::task::spawn_blocking(move || Self::fetch_sync(agent, url, user_agent))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP spawn_blocking failed: {}", e);
                Err(GeoRouterError::upstream_transport(format!(
                    "lookup task failed: {}",
                    e
                )))
            })
    }

    fn name(&self) -> &'static str {
        "ExternalAPI"
    }
}
