//! Region router middleware
//!
//! Redirects callers resolved to the designated region to the alternate
//! regional deployment. Identity/session paths always pass through:
//! redirecting mid-authentication would lose the stored session state.
//! Anything uncertain (no alternate host, degraded resolution) passes through
//! so the edge keeps serving traffic itself. A configured trusted country
//! header answers ahead of the IP lookup.

use std::rc::Rc;
use std::sync::Arc;

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderMap, HeaderName, HeaderValue, LOCATION},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{debug, trace};

use crate::config::RoutingConfig;
use crate::errors::Result;
use crate::geo::Region;
use crate::services::{GeoResolutionService, Resolution};
use crate::utils::ip::extract_client_ip;

pub const GEO_REGION_HEADER: &str = "x-geo-region";
pub const GEO_FALLBACK_HEADER: &str = "x-geo-fallback";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    PassThrough,
    Redirect(String),
}

/// The parts of the request URL a redirect preserves
#[derive(Debug, Clone, Copy)]
pub struct RequestTarget<'a> {
    pub scheme: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct RegionRoutingPolicy {
    alternate_host: Option<String>,
    designated_region: Region,
    bypass_prefixes: Vec<String>,
    country_header: Option<HeaderName>,
}

impl RegionRoutingPolicy {
    pub fn new(
        alternate_host: Option<String>,
        designated_region: Region,
        bypass_prefixes: Vec<String>,
    ) -> Self {
        Self {
            alternate_host: alternate_host
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
            designated_region,
            bypass_prefixes,
            country_header: None,
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Result<Self> {
        Ok(Self::new(
            config.alternate_host().map(String::from),
            config.designated_region()?,
            config.bypass_prefixes.clone(),
        )
        .with_country_header(config.trusted_country_header()?))
    }

    /// Trust a platform-set country header ahead of the IP lookup
    pub fn with_country_header(mut self, header: Option<HeaderName>) -> Self {
        self.country_header = header;
        self
    }

    pub fn country_header(&self) -> Option<&HeaderName> {
        self.country_header.as_ref()
    }

    /// Country code sent by the platform, if a trusted header is configured
    pub fn country_hint<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let name = self.country_header.as_ref()?;
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn alternate_host(&self) -> Option<&str> {
        self.alternate_host.as_deref()
    }

    pub fn designated_region(&self) -> Region {
        self.designated_region
    }

    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn decide(&self, target: &RequestTarget<'_>, resolution: &Resolution) -> RouteDecision {
        if self.is_bypassed(target.path) {
            return RouteDecision::PassThrough;
        }
        let Some(host) = self.alternate_host() else {
            return RouteDecision::PassThrough;
        };
        if resolution.degraded || resolution.region() != self.designated_region {
            return RouteDecision::PassThrough;
        }
        RouteDecision::Redirect(Self::build_location(host, target))
    }

    fn build_location(host: &str, target: &RequestTarget<'_>) -> String {
        match url::Url::parse(&format!("{}://{}/", target.scheme, host)) {
            Ok(mut url) => {
                url.set_path(target.path);
                url.set_query(target.query.filter(|q| !q.is_empty()));
                url.into()
            }
            Err(_) => match target.query.filter(|q| !q.is_empty()) {
                Some(query) => format!("{}://{}{}?{}", target.scheme, host, target.path, query),
                None => format!("{}://{}{}", target.scheme, host, target.path),
            },
        }
    }
}

/// Middleware factory
#[derive(Clone)]
pub struct RegionRouter {
    policy: Arc<RegionRoutingPolicy>,
    resolver: Arc<GeoResolutionService>,
}

impl RegionRouter {
    pub fn new(policy: RegionRoutingPolicy, resolver: Arc<GeoResolutionService>) -> Self {
        Self {
            policy: Arc::new(policy),
            resolver,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RegionRouter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RegionRouterMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RegionRouterMiddleware {
            service: Rc::new(service),
            policy: self.policy.clone(),
            resolver: self.resolver.clone(),
        }))
    }
}

pub struct RegionRouterMiddleware<S> {
    service: Rc<S>,
    policy: Arc<RegionRoutingPolicy>,
    resolver: Arc<GeoResolutionService>,
}

impl<S, B> Service<ServiceRequest> for RegionRouterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let policy = self.policy.clone();
        let resolver = self.resolver.clone();

        Box::pin(async move {
            if policy.is_bypassed(req.path()) {
                trace!("Region routing bypassed for {}", req.path());
                return srv.call(req).await.map(|res| res.map_into_left_body());
            }

            let ip = extract_client_ip(req.headers());
            let hint = policy.country_hint(req.headers()).map(str::to_owned);
            let resolution = resolver.resolve_with_hint(&ip, hint.as_deref()).await;

            let decision = {
                let conn_info = req.connection_info();
                let target = RequestTarget {
                    scheme: conn_info.scheme(),
                    path: req.path(),
                    query: Some(req.query_string()),
                };
                policy.decide(&target, &resolution)
            };

            if let RouteDecision::Redirect(location) = decision {
                debug!(
                    "Redirecting {} ({}) to {}",
                    ip,
                    resolution.record.country_code(),
                    location
                );
                return Ok(req.into_response(
                    HttpResponse::TemporaryRedirect()
                        .insert_header((LOCATION, location))
                        .finish()
                        .map_into_right_body(),
                ));
            }

            let region = resolution.region();
            let degraded = resolution.degraded;
            req.extensions_mut().insert(resolution);

            let mut res = srv.call(req).await?;
            let headers = res.headers_mut();
            headers.insert(
                HeaderName::from_static(GEO_REGION_HEADER),
                HeaderValue::from_static(region.into()),
            );
            if degraded {
                headers.insert(
                    HeaderName::from_static(GEO_FALLBACK_HEADER),
                    HeaderValue::from_static("true"),
                );
            }
            Ok(res.map_into_left_body())
        })
    }
}
