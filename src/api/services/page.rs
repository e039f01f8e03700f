use actix_web::{HttpMessage, HttpRequest, HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;

use crate::geo::{Language, Region, RegionCategory};
use crate::services::{GeoResolutionService, Resolution};
use crate::utils::ip::extract_client_ip;

/// What the page surface decided to serve
#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub path: String,
    pub region: Region,
    pub language: Language,
    pub category: RegionCategory,
    pub degraded: bool,
}

/// Fallthrough handler behind [`RegionRouter`](crate::api::middleware::RegionRouter)
pub struct PageService;

impl PageService {
    pub async fn serve(
        req: HttpRequest,
        resolver: web::Data<Arc<GeoResolutionService>>,
    ) -> impl Responder {
        // bypass paths reach here without a resolution attached
        let attached = req.extensions().get::<Resolution>().cloned();
        let resolution = match attached {
            Some(resolution) => resolution,
            None => resolver.resolve(&extract_client_ip(req.headers())).await,
        };

        let record = &resolution.record;
        HttpResponse::Ok().json(PageResponse {
            path: req.path().to_string(),
            region: record.region(),
            language: record.language(),
            category: record.region_category(),
            degraded: resolution.degraded,
        })
    }
}

/// Page 路由配置，由 server 包上 RegionRouter
pub fn page_routes() -> actix_web::Scope {
    web::scope("")
        .route("/{path:.*}", web::get().to(PageService::serve))
        .route("/{path:.*}", web::head().to(PageService::serve))
}
