//! 客户端 IP 提取
//!
//! - 可信代理（单 IP 或 CIDR）命中时使用 X-Forwarded-For / X-Real-IP
//! - 未配置可信代理时，私有地址的连接视为反向代理
//! - 其余情况使用连接地址，防止伪造

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::debug;

use crate::config::get_config;

/// 私有、回环、链路本地或未指定地址（不值得做地理定位）
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_or_local(&IpAddr::V4(v4));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

/// 解析 `ip` 或 `ip:port`
pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<SocketAddr>()
        .map(|s| s.ip())
        .or_else(|_| raw.parse::<IpAddr>())
        .ok()
}

/// 检查 IP 是否在可信代理列表中
pub fn is_trusted_proxy(ip: &IpAddr, trusted_proxies: &[String]) -> bool {
    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(ip, proxy)
        } else {
            proxy.parse::<IpAddr>().is_ok_and(|p| p == *ip)
        }
    })
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };
    let Ok(prefix_len) = prefix_len.parse::<u32>() else {
        return false;
    };
    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) if prefix_len <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0);
            (u32::from(*ip) & mask) == (u32::from(net) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) if prefix_len <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix_len).unwrap_or(0);
            (u128::from(*ip) & mask) == (u128::from(net) & mask)
        }
        _ => false,
    }
}

/// 根据连接地址与转发头决定客户端 IP
///
/// `forwarded` 只在连接来自可信代理时才会被调用。
pub fn resolve_client_ip<F>(
    peer: Option<&str>,
    trusted_proxies: &[String],
    forwarded: F,
) -> Option<IpAddr>
where
    F: FnOnce() -> Option<String>,
{
    let peer_ip = peer.and_then(parse_ip)?;

    let behind_proxy = if trusted_proxies.is_empty() {
        is_private_or_local(&peer_ip)
    } else {
        is_trusted_proxy(&peer_ip, trusted_proxies)
    };

    if behind_proxy && let Some(real_ip) = forwarded().as_deref().and_then(parse_ip) {
        debug!("Proxy {} forwarded client {}", peer_ip, real_ip);
        return Some(real_ip);
    }

    Some(peer_ip)
}

/// 从 HttpRequest 提取真实客户端 IP
pub fn extract_client_ip(req: &HttpRequest) -> Option<IpAddr> {
    let config = get_config();
    let conn_info = req.connection_info();
    resolve_client_ip(
        conn_info.peer_addr(),
        &config.server.trusted_proxies,
        || extract_forwarded_ip_from_headers(req.headers()),
    )
}

/// X-Forwarded-For 的第一跳，其次 X-Real-IP
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_is_private_or_local() {
        assert!(is_private_or_local(&ip("10.0.0.1")));
        assert!(is_private_or_local(&ip("192.168.1.1")));
        assert!(is_private_or_local(&ip("127.0.0.1")));
        assert!(is_private_or_local(&ip("169.254.10.1")));
        assert!(is_private_or_local(&ip("::1")));
        assert!(is_private_or_local(&ip("fd00::1")));
        assert!(is_private_or_local(&ip("::ffff:192.168.0.9")));
        assert!(!is_private_or_local(&ip("8.8.8.8")));
        assert!(!is_private_or_local(&ip("2001:4860:4860::8888")));
    }

    #[test]
    fn test_ip_in_cidr() {
        assert!(ip_in_cidr(&ip("192.168.1.100"), "192.168.1.0/24"));
        assert!(!ip_in_cidr(&ip("192.168.2.1"), "192.168.1.0/24"));
        assert!(ip_in_cidr(&ip("2001:db8::1"), "2001:db8::/32"));
        assert!(!ip_in_cidr(&ip("2001:db8::1"), "10.0.0.0/8"));
        assert!(!ip_in_cidr(&ip("10.0.0.1"), "10.0.0.0/40"));
    }

    #[test]
    fn test_trusted_proxy_uses_forwarded_ip() {
        let proxies = vec!["203.0.113.0/24".to_string()];
        let resolved = resolve_client_ip(Some("203.0.113.7:443"), &proxies, || {
            Some("8.8.4.4".to_string())
        });
        assert_eq!(resolved, Some(ip("8.8.4.4")));
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarded_ip() {
        let proxies = vec!["203.0.113.0/24".to_string()];
        let resolved = resolve_client_ip(Some("198.51.100.2:5000"), &proxies, || {
            Some("8.8.4.4".to_string())
        });
        assert_eq!(resolved, Some(ip("198.51.100.2")));
    }

    #[test]
    fn test_private_peer_is_treated_as_proxy_when_none_configured() {
        let resolved = resolve_client_ip(Some("127.0.0.1:9000"), &[], || {
            Some("1.1.1.1".to_string())
        });
        assert_eq!(resolved, Some(ip("1.1.1.1")));

        // 转发头无法解析时退回连接地址
        let resolved = resolve_client_ip(Some("127.0.0.1"), &[], || Some("garbage".to_string()));
        assert_eq!(resolved, Some(ip("127.0.0.1")));
    }

    #[test]
    fn test_missing_peer() {
        assert_eq!(resolve_client_ip(None, &[], || None), None);
    }
}
