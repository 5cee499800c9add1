//! Client IP extraction.
//!
//! Ad-click traffic always arrives through a reverse proxy or CDN in
//! production, so forwarded headers take priority over the peer address.

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;

/// Extract the real client IP from a request: `X-Forwarded-For` (first hop),
/// then `X-Real-IP`, then the connection peer address.
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    if let Some(forwarded) = extract_forwarded_ip(req.headers()) {
        return Some(forwarded);
    }
    req.connection_info()
        .peer_addr()
        .map(|addr| strip_port(addr).to_string())
}

/// Extract a forwarded IP from request headers, if present.
pub fn extract_forwarded_ip(headers: &HeaderMap) -> Option<String> {
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

/// Drop a `:port` suffix from an IPv4 peer address. IPv6 literals with
/// brackets keep their form.
fn strip_port(addr: &str) -> &str {
    if addr.starts_with('[') {
        return addr;
    }
    match addr.rsplit_once(':') {
        // more than one ':' means a bare IPv6 address, not host:port
        Some((host, _)) if !host.contains(':') => host,
        _ => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let map = headers(&[("x-forwarded-for", "1.2.3.4, 10.0.0.1, 10.0.0.2")]);
        assert_eq!(extract_forwarded_ip(&map), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn test_real_ip_fallback() {
        let map = headers(&[("x-real-ip", "5.6.7.8")]);
        assert_eq!(extract_forwarded_ip(&map), Some("5.6.7.8".to_string()));
    }

    #[test]
    fn test_forwarded_for_wins_over_real_ip() {
        let map = headers(&[("x-forwarded-for", "1.2.3.4"), ("x-real-ip", "5.6.7.8")]);
        assert_eq!(extract_forwarded_ip(&map), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn test_no_headers() {
        let map = HeaderMap::new();
        assert_eq!(extract_forwarded_ip(&map), None);
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("1.2.3.4:8080"), "1.2.3.4");
        assert_eq!(strip_port("1.2.3.4"), "1.2.3.4");
        assert_eq!(strip_port("::1"), "::1");
        assert_eq!(strip_port("[::1]:8080"), "[::1]:8080");
    }
}
