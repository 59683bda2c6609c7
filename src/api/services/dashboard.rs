//! 运营者看板端点（挂在 AdminAuth 之后）

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};
use tracing::{debug, info};

use super::response::{ErrorCode, error_response, success_response};
use crate::analytics::{RefreshOutcome, RefreshScheduler};
use crate::services::{Session, SessionProvider};

pub struct DashboardService;

impl DashboardService {
    /// 打开看板：激活调度器（重复调用无副作用）
    pub async fn open(scheduler: web::Data<Arc<RefreshScheduler>>) -> HttpResponse {
        scheduler.activate();
        success_response(scheduler.snapshot())
    }

    pub async fn view(scheduler: web::Data<Arc<RefreshScheduler>>) -> HttpResponse {
        success_response(scheduler.snapshot())
    }

    /// 手动刷新；失败时仍返回上一次的数据和 lastError
    pub async fn refresh(scheduler: web::Data<Arc<RefreshScheduler>>) -> HttpResponse {
        match scheduler.refresh_now().await {
            RefreshOutcome::Inactive => error_response(
                StatusCode::CONFLICT,
                ErrorCode::DashboardInactive,
                "Dashboard is not open",
            ),
            outcome => {
                debug!("Manual dashboard refresh: {:?}", outcome);
                success_response(scheduler.snapshot())
            }
        }
    }

    pub async fn close(scheduler: web::Data<Arc<RefreshScheduler>>) -> HttpResponse {
        scheduler.deactivate();
        success_response(scheduler.snapshot())
    }

    /// 退出登录并关闭看板
    pub async fn sign_out(
        req: HttpRequest,
        scheduler: web::Data<Arc<RefreshScheduler>>,
        sessions: web::Data<Arc<dyn SessionProvider>>,
    ) -> HttpResponse {
        let session = req.extensions().get::<Session>().cloned();
        if let Some(session) = session {
            sessions.sign_out(&session);
        }
        scheduler.deactivate();
        info!("Dashboard torn down after sign-out");
        success_response("signed out")
    }
}

/// 看板路由，由调用方挂到 `/admin` 并包上 `AdminAuth`
pub fn dashboard_routes() -> actix_web::Scope {
    web::scope("")
        .route("/dashboard", web::get().to(DashboardService::view))
        .route("/dashboard/open", web::post().to(DashboardService::open))
        .route("/dashboard/refresh", web::post().to(DashboardService::refresh))
        .route("/dashboard/close", web::post().to(DashboardService::close))
        .route("/sign-out", web::post().to(DashboardService::sign_out))
}
