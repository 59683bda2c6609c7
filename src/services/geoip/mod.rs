//! GeoIP 服务模块
//!
//! 按顺序尝试多个外部 HTTP-JSON 服务（默认 ipwho.is → ipapi.co），
//! 每次尝试有独立超时，全部失败时返回 Unknown。

mod external_api;
mod provider;

pub use external_api::{ExternalApiProvider, parse_response};
pub use provider::{GeoInfo, GeoIpLookup, GeoIpProvider, NetworkIdentity};
