//! HTTP surfaces (actix-web)
//!
//! - `/track`：公开的访问/点击追踪
//! - `/admin`：运营者看板，受会话保护
//! - `/health`：探针

pub mod middleware;
pub mod services;
