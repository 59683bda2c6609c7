use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, trace};

use super::response::{ErrorCode, json_response, success_response};
use crate::storage::EventStore;
use actix_web::http::StatusCode;

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct ReadinessReport {
    pub status: &'static str,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<u64>,
}

/// 探针：存活与就绪
pub struct HealthService;

impl HealthService {
    pub async fn liveness_check() -> impl Responder {
        success_response("alive")
    }

    /// 存储可达才算就绪
    pub async fn readiness_check(store: web::Data<Arc<dyn EventStore>>) -> HttpResponse {
        let backend = store.backend_name().to_string();
        match tokio::time::timeout(READINESS_TIMEOUT, store.count()).await {
            Ok(Ok(events)) => {
                trace!("Readiness check passed, {} events", events);
                success_response(ReadinessReport {
                    status: "ready",
                    backend,
                    events: Some(events),
                })
            }
            Ok(Err(e)) => {
                error!("Readiness check failed: {}", e);
                Self::not_ready(backend)
            }
            Err(_) => {
                error!("Readiness check timed out");
                Self::not_ready(backend)
            }
        }
    }

    fn not_ready(backend: String) -> HttpResponse {
        json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ServiceUnavailable,
            "Event store unreachable",
            Some(ReadinessReport {
                status: "unavailable",
                backend,
                events: None,
            }),
        )
    }
}

pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("/ready", web::get().to(HealthService::readiness_check))
        .route("/ready", web::head().to(HealthService::readiness_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
