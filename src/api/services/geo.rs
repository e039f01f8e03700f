use actix_web::{HttpRequest, HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::trace;

use crate::api::middleware::GEO_FALLBACK_HEADER;
use crate::services::GeoResolutionService;
use crate::utils::ip::extract_client_ip;

/// Geo detect service
///
/// Answers the caller's own location. It never fails: a degraded resolution
/// is still a 200, flagged with `X-Geo-Fallback: true`.
pub struct GeoService;

impl GeoService {
    pub async fn detect(
        req: HttpRequest,
        resolver: web::Data<Arc<GeoResolutionService>>,
    ) -> impl Responder {
        let ip = extract_client_ip(req.headers());
        let resolution = resolver.resolve(&ip).await;
        trace!(
            "Detect for {}: {} via {}",
            ip,
            resolution.record.country_code(),
            resolution.source.as_ref()
        );

        let mut builder = HttpResponse::Ok();
        builder.insert_header(("Cache-Control", "no-store"));
        if resolution.degraded {
            builder.insert_header((GEO_FALLBACK_HEADER, "true"));
        }
        builder.json(&resolution.record)
    }
}

/// Geo 路由配置
pub fn geo_routes() -> actix_web::Scope {
    web::scope("/api/geo").route("/detect", web::get().to(GeoService::detect))
}
