//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Only the login and registration endpoints are limited (~10/min per
//! client IP), which is enough to slow down password guessing.
//!
//! The client IP is the peer address of the connection. `X-Forwarded-For`
//! and `X-Real-IP` are client-controlled, so they are only read when the
//! server is configured to sit behind a proxy that overwrites them.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor for the client IP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpKeyExtractor {
    /// Read proxy headers before the peer address.
    pub trust_forwarded: bool,
}

impl ClientIpKeyExtractor {
    fn forwarded_ip<T>(req: &Request<T>) -> Option<IpAddr> {
        let headers = req.headers();

        // Try X-Forwarded-For (first IP in the chain)
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Some(ip);
        }

        // Try X-Real-IP
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        if self.trust_forwarded
            && let Some(ip) = Self::forwarded_ip(req)
        {
            return Ok(ip);
        }

        // Direct connection
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
/// `trust_forwarded` keys on proxy headers when present.
/// Returns `None` only if governor refuses the quota.
#[must_use]
pub fn auth_rate_limiter(trust_forwarded: bool) -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor { trust_forwarded })
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tower_governor::key_extractor::KeyExtractor;

    const BEHIND_PROXY: ClientIpKeyExtractor = ClientIpKeyExtractor {
        trust_forwarded: true,
    };

    fn from_peer(peer: &str) -> Request<()> {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "203.0.113.8")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn test_spoofed_headers_ignored_by_default() {
        let req = from_peer("198.51.100.4:5555");
        let ip = ClientIpKeyExtractor::default().extract(&req).unwrap();
        assert_eq!(ip, "198.51.100.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_rotating_forwarded_header_shares_one_key() {
        let extractor = ClientIpKeyExtractor::default();
        let keys: Vec<_> = ["203.0.113.1", "203.0.113.2", "203.0.113.3"]
            .into_iter()
            .map(|spoofed| {
                let mut req = from_peer("198.51.100.4:5555");
                req.headers_mut()
                    .insert("x-forwarded-for", spoofed.parse().unwrap());
                extractor.extract(&req).unwrap()
            })
            .collect();
        assert!(keys.iter().all(|key| *key == keys[0]));
    }

    #[test]
    fn test_forwarded_header_wins_behind_proxy() {
        let req = from_peer("10.0.0.1:5555");
        let ip = BEHIND_PROXY.extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_real_ip_used_behind_proxy() {
        let mut req = from_peer("10.0.0.1:5555");
        req.headers_mut().remove("x-forwarded-for");
        let ip = BEHIND_PROXY.extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.8".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("198.51.100.4:5555".parse::<SocketAddr>().unwrap()));
        let ip = BEHIND_PROXY.extract(&req).unwrap();
        assert_eq!(ip, "198.51.100.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_no_source_is_an_error() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(())
            .unwrap();
        assert!(ClientIpKeyExtractor::default().extract(&req).is_err());
    }

    #[test]
    fn test_auth_limiter_builds() {
        assert!(auth_rate_limiter(false).is_some());
        assert!(auth_rate_limiter(true).is_some());
    }
}
