//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! It configures and starts the HTTP server with all necessary routes.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use crate::api::middleware::{RegionRouter, RegionRoutingPolicy, RequestIdMiddleware};
use crate::api::services::{AppStartTime, geo_routes, health_routes, page_routes};
use crate::config::get_config;
use crate::runtime::lifetime;
use crate::services::GeoResolutionService;

/// Register the geo routes on an app; shared with the integration tests
///
/// `/health` and `/api/geo/*` are served directly; every other path goes
/// through [`RegionRouter`] before reaching the page handler.
pub fn configure_app(
    cfg: &mut web::ServiceConfig,
    resolver: Arc<GeoResolutionService>,
    routing: RegionRoutingPolicy,
) {
    cfg.app_data(web::Data::new(resolver.clone()))
        .service(health_routes())
        .service(geo_routes())
        .service(page_routes().wrap(RegionRouter::new(routing, resolver)));
}

/// Run the HTTP server
///
/// This function:
/// 1. Records startup time
/// 2. Prepares server components (cache, upstream resolver, routing policy)
/// 3. Configures and starts the HTTP server
/// 4. Listens for graceful shutdown signals
///
/// **Note**: Configuration and logging must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    // Record application start time
    let app_start_time = AppStartTime::now();

    let config = get_config();
    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let resolver = startup.resolver.clone();
    let routing = startup.routing.clone();

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware) // 为每个请求生成 request_id
            .wrap(Compress::default())
            .app_data(web::Data::new(app_start_time.clone()))
            .wrap(
                DefaultHeaders::new()
                    .add(("Connection", "keep-alive"))
                    .add(("Keep-Alive", "timeout=30, max=1000")),
            )
            .configure(|cfg| configure_app(cfg, resolver.clone(), routing.clone()))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(bind_address)?.run();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown() => {
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}
