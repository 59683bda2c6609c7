//! 公开的追踪端点
//!
//! 请求体解析完就返回 204，记录在后台进行，页面跳转不等待。

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::trace;

use crate::analytics::{Recorder, is_placeholder};
use crate::services::ClientContext;
use crate::utils::extract_client_ip;

#[derive(Debug, Deserialize)]
pub struct VisitPayload {
    /// 当前页面地址
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickPayload {
    /// 链接 id，作为 slug
    pub id: String,
    /// 目标地址
    pub url: String,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

pub struct TrackingService;

impl TrackingService {
    fn client_context(
        req: &HttpRequest,
        page_url: Option<String>,
        referrer: Option<String>,
    ) -> ClientContext {
        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        ClientContext {
            page_url,
            referrer,
            user_agent,
            client_ip: extract_client_ip(req),
        }
    }

    pub async fn track_visit(
        req: HttpRequest,
        payload: web::Json<VisitPayload>,
        recorder: web::Data<Recorder>,
    ) -> impl Responder {
        let VisitPayload { url, referrer } = payload.into_inner();
        let ctx = Self::client_context(&req, url, referrer);
        recorder.dispatch_visit(ctx);
        HttpResponse::NoContent().finish()
    }

    pub async fn track_click(
        req: HttpRequest,
        payload: web::Json<ClickPayload>,
        recorder: web::Data<Recorder>,
    ) -> impl Responder {
        let ClickPayload {
            id,
            url,
            page_url,
            referrer,
        } = payload.into_inner();

        // 占位链接不值得起后台任务
        if is_placeholder(&url) {
            trace!("Placeholder click on '{}' ignored", id);
            return HttpResponse::NoContent().finish();
        }

        let ctx = Self::client_context(&req, page_url, referrer);
        recorder.dispatch_click(ctx, id, url);
        HttpResponse::NoContent().finish()
    }
}

pub fn tracking_routes() -> actix_web::Scope {
    web::scope("/track")
        .route("/visit", web::post().to(TrackingService::track_visit))
        .route("/click", web::post().to(TrackingService::track_click))
}
