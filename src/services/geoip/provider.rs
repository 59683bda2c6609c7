//! GeoIP Provider 抽象层
//!
//! `GeoIpProvider` 是一条有序的 provider 链：
//! 1. 按配置顺序依次尝试，每个最多一次，整条链最多两次（主 + 一个备用）
//! 2. 每次尝试受同一个超时限制
//! 3. 第一个成功的结果生效，全部失败 → Unknown

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::external_api::ExternalApiProvider;
use crate::analytics::UNKNOWN;
use crate::config::AnalyticsConfig;

/// 单个 provider 返回的原始字段，缺失的字段为 None
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: Option<String>,
    pub ip: Option<String>,
    pub isp: Option<String>,
}

/// GeoIP 查询 trait
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    /// 查询 IP 地址的地理位置，None 表示本次尝试失败
    async fn lookup(&self, ip: &str) -> Option<GeoInfo>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &str;
}

/// 解析后的网络身份，三个字段都不为空
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkIdentity {
    pub country: String,
    pub ip: String,
    pub isp: String,
}

impl NetworkIdentity {
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            ip: UNKNOWN.to_string(),
            isp: UNKNOWN.to_string(),
        }
    }

    fn from_info(info: GeoInfo) -> Self {
        let field = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };
        Self {
            country: field(info.country),
            ip: field(info.ip),
            isp: field(info.isp),
        }
    }
}

impl Default for NetworkIdentity {
    fn default() -> Self {
        Self::unknown()
    }
}

/// 每次解析最多尝试的 provider 数
pub const MAX_LOOKUP_ATTEMPTS: usize = 2;

/// 有序 GeoIP provider 链
#[derive(Clone)]
pub struct GeoIpProvider {
    providers: Vec<Arc<dyn GeoIpLookup>>,
    attempt_timeout: Duration,
}

impl GeoIpProvider {
    /// 根据 AnalyticsConfig 初始化
    pub fn new(config: &AnalyticsConfig) -> Self {
        let providers: Vec<Arc<dyn GeoIpLookup>> = config
            .geoip_providers
            .iter()
            .map(|p| {
                Arc::new(ExternalApiProvider::new(&p.name, &p.url, p.format))
                    as Arc<dyn GeoIpLookup>
            })
            .collect();

        if providers.is_empty() {
            warn!("GeoIP: no providers configured, every lookup resolves to Unknown");
        }

        let chain = Self::with_providers(
            providers,
            Duration::from_millis(config.lookup_timeout_ms),
        );
        info!(
            "GeoIP: Initialized provider chain [{}]",
            chain.provider_names().join(" -> ")
        );
        chain
    }

    /// 超出 `MAX_LOOKUP_ATTEMPTS` 的 provider 会被丢弃
    pub fn with_providers(
        mut providers: Vec<Arc<dyn GeoIpLookup>>,
        attempt_timeout: Duration,
    ) -> Self {
        if providers.len() > MAX_LOOKUP_ATTEMPTS {
            let dropped: Vec<&str> = providers[MAX_LOOKUP_ATTEMPTS..]
                .iter()
                .map(|p| p.name())
                .collect();
            warn!(
                "GeoIP: only {} providers are used per lookup, ignoring [{}]",
                MAX_LOOKUP_ATTEMPTS,
                dropped.join(", ")
            );
            providers.truncate(MAX_LOOKUP_ATTEMPTS);
        }
        Self {
            providers,
            attempt_timeout,
        }
    }

    /// 解析 IP 的国家 / IP / ISP，从不失败
    pub async fn resolve(&self, ip: &str) -> NetworkIdentity {
        for provider in &self.providers {
            match tokio::time::timeout(self.attempt_timeout, provider.lookup(ip)).await {
                Ok(Some(info)) => {
                    debug!("GeoIP: {} resolved {}", provider.name(), ip);
                    return NetworkIdentity::from_info(info);
                }
                Ok(None) => {
                    debug!("GeoIP: {} failed for {}", provider.name(), ip);
                }
                Err(_) => {
                    warn!(
                        "GeoIP: {} timed out after {} ms for {}",
                        provider.name(),
                        self.attempt_timeout.as_millis(),
                        ip
                    );
                }
            }
        }

        debug!("GeoIP: all providers failed for {}", ip);
        NetworkIdentity::unknown()
    }

    /// 同 `resolve`，接收已解析的地址
    pub async fn resolve_addr(&self, ip: IpAddr) -> NetworkIdentity {
        self.resolve(&ip.to_string()).await
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }
}
