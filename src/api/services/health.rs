use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;

use crate::services::GeoResolutionService;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub cache_backend: &'static str,
    pub upstream: &'static str,
}

/// Health Service
///
/// 不触发上游查询；地理解析本身永远可用（降级也算可用）。
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        resolver: web::Data<Arc<GeoResolutionService>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received health check request");

        let uptime = chrono::Utc::now() - app_start_time.start_datetime;
        let body = HealthResponse {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: uptime.num_seconds().max(0) as u64,
            cache_backend: resolver.cache_name(),
            upstream: resolver.provider_name(),
        };

        HttpResponse::Ok()
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(body)
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
}
