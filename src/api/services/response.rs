//! 统一响应格式 `{ code, message, data }`

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::LinkpulseError;

/// API 错误码
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 6000-6099: 分析错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    SessionMissing = 2000,

    AnalyticsQueryFailed = 6000,
    DashboardInactive = 6001,
}

impl From<&LinkpulseError> for ErrorCode {
    fn from(err: &LinkpulseError) -> Self {
        match err {
            LinkpulseError::StoreUnavailable(_)
            | LinkpulseError::DatabaseConnection(_)
            | LinkpulseError::DatabaseOperation(_) => ErrorCode::AnalyticsQueryFailed,
            LinkpulseError::Validation(_) => ErrorCode::BadRequest,
            LinkpulseError::Unauthorized(_) => ErrorCode::Unauthorized,
            LinkpulseError::DatabaseConfig(_)
            | LinkpulseError::FileOperation(_)
            | LinkpulseError::Serialization(_) => ErrorCode::InternalServerError,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

pub fn error_from_linkpulse(err: &LinkpulseError) -> HttpResponse {
    let status = match err {
        LinkpulseError::Validation(_) => StatusCode::BAD_REQUEST,
        LinkpulseError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        LinkpulseError::StoreUnavailable(_) | LinkpulseError::DatabaseConnection(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, ErrorCode::from(err), err.message())
}
