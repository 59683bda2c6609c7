//! 外部 GeoIP API 实现
//!
//! 通过 HTTP-JSON 服务查询 IP（ipwho.is、ipapi.co 或通用格式）。
//! 成功结果进入 Moka 缓存，失败不缓存，下次请求会重新查询。

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use tracing::{trace, warn};
use ureq::Agent;

use super::provider::{GeoInfo, GeoIpLookup};
use crate::config::GeoIpFormat;

/// GeoIP 缓存 TTL（15 分钟）
const GEOIP_CACHE_TTL_SECS: u64 = 15 * 60;
/// GeoIP 缓存最大容量
const GEOIP_CACHE_MAX_CAPACITY: u64 = 10_000;
/// HTTP 请求的硬上限，链上的单次超时通常更短
const HTTP_TIMEOUT_SECS: u64 = 10;

/// 全局 HTTP Agent（ureq 的 Agent 是 Send + Sync）
static HTTP_AGENT: OnceLock<Agent> = OnceLock::new();

fn get_agent() -> &'static Agent {
    HTTP_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

/// 外部 API GeoIP Provider
///
/// 内置 Moka 缓存：
/// - 最大 10000 条，TTL 15 分钟
/// - 同一 IP 的并发请求只发一次 HTTP
pub struct ExternalApiProvider {
    name: String,
    api_url_template: String,
    format: GeoIpFormat,
    cache: Cache<String, GeoInfo>,
}

impl ExternalApiProvider {
    /// `api_url_template` 使用 `{ip}` 作为占位符，例如 `https://ipwho.is/{ip}`
    pub fn new(name: &str, api_url_template: &str, format: GeoIpFormat) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(GEOIP_CACHE_TTL_SECS))
            .max_capacity(GEOIP_CACHE_MAX_CAPACITY)
            .build();

        Self {
            name: name.to_string(),
            api_url_template: api_url_template.to_string(),
            format,
            cache,
        }
    }

    pub fn format(&self) -> GeoIpFormat {
        self.format
    }

    /// 同步请求（在 spawn_blocking 中调用）
    fn fetch_from_api_sync(url: String, format: GeoIpFormat) -> Option<GeoInfo> {
        let resp = match get_agent().get(&url).call() {
            Ok(r) => r,
            Err(e) => {
                warn!("GeoIP API request to \"{}\" failed: {}", url, e);
                return None;
            }
        };

        let json: Value = match resp.into_body().read_json() {
            Ok(j) => j,
            Err(e) => {
                warn!("GeoIP API response from \"{}\" parse failed: {}", url, e);
                return None;
            }
        };

        let info = parse_response(format, &json);
        if info.is_none() {
            trace!("GeoIP API \"{}\" reported failure: {}", url, json);
        }
        info
    }

    async fn fetch_from_api(&self, ip: &str) -> Option<GeoInfo> {
        let url = self.api_url_template.replace("{ip}", ip);
        let format = self.format;

        tokio::task::spawn_blocking(move || Self::fetch_from_api_sync(url, format))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP spawn_blocking failed: {}", e);
                None
            })
    }
}

#[async_trait]
impl GeoIpLookup for ExternalApiProvider {
    async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        // optionally_get_with：None 不会写入缓存
        self.cache
            .optionally_get_with(ip.to_string(), async {
                trace!("GeoIP cache miss for {} on {}", ip, self.name);
                self.fetch_from_api(ip).await
            })
            .await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn str_field(json: &Value, pointer: &str) -> Option<String> {
    json.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn first_of(json: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| str_field(json, p))
}

/// 按响应格式提取字段；服务报告失败或不是 JSON 对象时返回 None
pub fn parse_response(format: GeoIpFormat, json: &Value) -> Option<GeoInfo> {
    if !json.is_object() {
        return None;
    }

    match format {
        GeoIpFormat::IpWhois => {
            if json["success"].as_bool() == Some(false) {
                return None;
            }
            Some(GeoInfo {
                country: first_of(json, &["/country", "/country_code"]),
                ip: str_field(json, "/ip"),
                isp: first_of(json, &["/connection/isp", "/connection/org"]),
            })
        }
        GeoIpFormat::IpApi => {
            if json["error"].as_bool() == Some(true) {
                return None;
            }
            Some(GeoInfo {
                country: first_of(json, &["/country_name", "/country"]),
                ip: str_field(json, "/ip"),
                isp: str_field(json, "/org"),
            })
        }
        GeoIpFormat::Generic => {
            if json["status"].as_str() == Some("fail") {
                return None;
            }
            Some(GeoInfo {
                country: first_of(json, &["/country", "/countryCode", "/country_code"]),
                ip: first_of(json, &["/ip", "/query"]),
                isp: first_of(json, &["/isp", "/org"]),
            })
        }
    }
}
