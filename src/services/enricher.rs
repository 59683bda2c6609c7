//! 事件富化：客户端分类 + 网络身份

use std::net::IpAddr;

use tracing::trace;

use super::geoip::{GeoIpProvider, NetworkIdentity};
use super::user_agent::{ClientProfile, classify};
use crate::config::AnalyticsConfig;
use crate::utils::ip::is_private_or_local;

/// 一次被追踪动作的环境信息
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    /// 用户所在页面
    pub page_url: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub client: ClientProfile,
    pub network: NetworkIdentity,
}

/// 组合 User-Agent 分类与 GeoIP 链
///
/// 不会失败：所有异常都降级为 Unknown / desktop。
#[derive(Clone)]
pub struct Enricher {
    geoip: Option<GeoIpProvider>,
}

impl Enricher {
    pub fn new(config: &AnalyticsConfig) -> Self {
        if config.enable_geo_lookup {
            Self::with_geoip(GeoIpProvider::new(config))
        } else {
            Self::without_geoip()
        }
    }

    pub fn with_geoip(geoip: GeoIpProvider) -> Self {
        Self { geoip: Some(geoip) }
    }

    /// 不做网络查询，网络字段始终为 Unknown
    pub fn without_geoip() -> Self {
        Self { geoip: None }
    }

    pub async fn enrich(&self, ctx: &ClientContext) -> Enrichment {
        let client = classify(ctx.user_agent.as_deref());
        let network = self.resolve_network(ctx.client_ip).await;
        Enrichment { client, network }
    }

    async fn resolve_network(&self, client_ip: Option<IpAddr>) -> NetworkIdentity {
        let (Some(geoip), Some(ip)) = (&self.geoip, client_ip) else {
            return NetworkIdentity::unknown();
        };

        if is_private_or_local(&ip) {
            trace!("Skipping GeoIP for non-public address {}", ip);
            return NetworkIdentity::unknown();
        }

        geoip.resolve_addr(ip).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{DeviceClass, UNKNOWN};
    use crate::services::geoip::{GeoInfo, GeoIpLookup};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GeoIpLookup for CountingLookup {
        async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(GeoInfo {
                country: Some("CL".into()),
                ip: Some(ip.to_string()),
                isp: Some("Entel".into()),
            })
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    fn enricher_with(lookup: Arc<CountingLookup>) -> Enricher {
        Enricher::with_geoip(GeoIpProvider::with_providers(
            vec![lookup],
            Duration::from_secs(3),
        ))
    }

    #[tokio::test]
    async fn test_public_ip_is_resolved() {
        let lookup = Arc::new(CountingLookup::default());
        let ctx = ClientContext {
            user_agent: Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_5) Mobile Safari".into()),
            client_ip: Some("8.8.8.8".parse().unwrap()),
            ..Default::default()
        };

        let enrichment = enricher_with(lookup.clone()).enrich(&ctx).await;
        assert_eq!(enrichment.client.device, DeviceClass::Mobile);
        assert_eq!(enrichment.network.country, "CL");
        assert_eq!(enrichment.network.ip, "8.8.8.8");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_private_or_missing_ip_skips_lookup() {
        let lookup = Arc::new(CountingLookup::default());
        let enricher = enricher_with(lookup.clone());

        let private = ClientContext {
            client_ip: Some("192.168.1.20".parse().unwrap()),
            ..Default::default()
        };
        assert_eq!(
            enricher.enrich(&private).await.network,
            NetworkIdentity::unknown()
        );
        assert_eq!(
            enricher.enrich(&ClientContext::default()).await.network.country,
            UNKNOWN
        );
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disabled_geo_lookup() {
        let ctx = ClientContext {
            client_ip: Some("8.8.8.8".parse().unwrap()),
            ..Default::default()
        };
        let enrichment = Enricher::without_geoip().enrich(&ctx).await;
        assert_eq!(enrichment.network, NetworkIdentity::unknown());
        assert_eq!(enrichment.client.browser, UNKNOWN);
    }
}
