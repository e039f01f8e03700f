//! 客户端 IP 提取工具
//!
//! The edge sits behind a proxy, so the client address comes from headers:
//! first value of `X-Forwarded-For`, then `X-Real-IP`, then loopback.

use std::net::{IpAddr, SocketAddr};

use actix_web::http::header::HeaderMap;

use crate::geo::LOCAL_IP;

/// Loopback check used for the development short-circuit.
///
/// An empty string counts as loopback: no forwarding headers means a local caller.
pub fn is_loopback(ip: &str) -> bool {
    let ip = ip.trim();
    if ip.is_empty() {
        return true;
    }
    parse_ip(ip).is_some_and(|addr| addr.is_loopback())
}

/// Parse a bare address or `ip:port`
pub fn parse_ip(ip: &str) -> Option<IpAddr> {
    let ip = ip.trim();
    ip.parse::<IpAddr>()
        .ok()
        .or_else(|| ip.parse::<SocketAddr>().ok().map(|s| s.ip()))
}

/// 从请求头提取转发的 IP（X-Forwarded-For 或 X-Real-IP）
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    // 优先 X-Forwarded-For（取第一个，即原始客户端 IP）
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
                .filter(|s| !s.is_empty())
        })
}

/// Client IP for geo resolution, defaulting to loopback
pub fn extract_client_ip(headers: &HeaderMap) -> String {
    extract_forwarded_ip_from_headers(headers).unwrap_or_else(|| LOCAL_IP.to_string())
}
