//! Server mode
//!
//! Wires the tracking, dashboard and health surfaces into one actix-web app.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::middleware::AdminAuth;
use crate::api::services::{dashboard_routes, health_routes, tracking_routes};
use crate::config::ServerConfig;
use crate::runtime::lifetime;
use crate::runtime::lifetime::startup::StartupContext;

/// 追踪端点的最大请求体
const TRACKING_PAYLOAD_LIMIT: usize = 16 * 1024;

/// Validate CORS configuration at startup (runs once)
fn validate_cors_config(config: &ServerConfig) {
    if config.cors_allowed_origins.is_empty() {
        warn!(
            "server.cors_allowed_origins is empty. \
            Profile pages on another origin cannot call /track."
        );
    }
}

/// Build CORS middleware from configuration
///
/// Only the tracking endpoints are meant to be called cross-origin; the
/// dashboard uses a bearer token so credentials are never allowed.
fn build_cors_middleware(config: &ServerConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_header("Content-Type")
        .allowed_header("Authorization")
        .max_age(3600);

    if config.cors_allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.cors_allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// 注册全部路由与共享状态
pub fn configure_app(cfg: &mut web::ServiceConfig, ctx: &StartupContext) {
    cfg.app_data(web::Data::new(ctx.recorder.clone()))
        .app_data(web::Data::new(ctx.scheduler.clone()))
        .app_data(web::Data::new(ctx.sessions.clone()))
        .app_data(web::Data::new(ctx.store.clone()))
        .app_data(web::JsonConfig::default().limit(TRACKING_PAYLOAD_LIMIT))
        .service(tracking_routes())
        .service(
            web::scope("/admin")
                .wrap(AdminAuth::new(ctx.sessions.clone()))
                .service(dashboard_routes()),
        )
        .service(health_routes());
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let ctx = lifetime::startup::prepare_server_startup()
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {}", e))?;

    let config = crate::config::get_config();
    let server_config = config.server.clone();

    let cpu_count = server_config.cpu_count.clamp(1, 32);
    info!("Using {} CPU cores for the server", cpu_count);

    validate_cors_config(&server_config);
    if server_config.trusted_proxies.is_empty() {
        warn!(
            "Client IP: auto-detect mode. Connections from private IPs will use X-Forwarded-For. \
             To disable, configure server.trusted_proxies explicitly."
        );
    } else {
        info!(
            "Client IP: trusted proxies configured: {:?}",
            server_config.trusted_proxies
        );
    }

    let scheduler = ctx.scheduler.clone();
    let cors_config = server_config.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(build_cors_middleware(&cors_config))
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(|cfg| configure_app(cfg, &ctx))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", server_config.host, server_config.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(scheduler) => {
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}
