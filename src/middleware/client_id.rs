//! Client identity extraction for per-client rate limiting.
//!
//! Resolves a stable grouping key for each request, in priority order:
//!
//! 1. `X-Forwarded-For` header (first IP in a comma-separated list)
//! 2. `X-Real-IP` header
//! 3. Transport-level peer address (axum `ConnectInfo`)
//! 4. The literal `"unknown"`
//!
//! The value is an opaque grouping key: no IP syntax validation is performed
//! beyond whitespace trimming.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! These headers are client-provided. Deploy behind a trusted reverse proxy
//! that overwrites (not appends to) them, and block direct access to this
//! service from the internet. Without that, clients can rotate spoofed
//! addresses to escape per-client limits.
//!
//! # The "unknown" Fallback
//!
//! Requests with no identifiable source share the `"unknown"` key and are
//! rate-limited collectively. Monitor for high "unknown" traffic in
//! production logs - it usually means a misconfigured proxy.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;

/// Fallback identity when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Where the identity came from, for the header-parsing helper below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderIdentity<'a> {
    /// First entry of `X-Forwarded-For`.
    Forwarded(&'a str),
    /// Value of `X-Real-IP`.
    RealIp(&'a str),
    /// Neither header present.
    NotFound,
}

/// Extract the raw identity string from proxy headers.
///
/// Returns borrowed slices into the request headers; the caller owns the
/// decision to allocate.
#[inline]
fn identity_from_headers<B>(req: &Request<B>) -> HeaderIdentity<'_> {
    // X-Forwarded-For first: "client, proxy1, proxy2" - the first entry is
    // the originating client
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return HeaderIdentity::Forwarded(first);
        }
    }

    // X-Real-IP as the alternative single-value header
    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        let value = value.trim();
        if !value.is_empty() {
            return HeaderIdentity::RealIp(value);
        }
    }

    HeaderIdentity::NotFound
}

/// Resolve the client identity for a request.
///
/// Returns `Cow<'static, str>`: borrowed for the `"unknown"` fallback (no
/// allocation), owned for actual addresses. Use `.into_owned()` when the key
/// must outlive the request reference, e.g. inside a spawned future.
#[inline]
pub fn identify_client<B>(req: &Request<B>) -> Cow<'static, str> {
    match identity_from_headers(req) {
        HeaderIdentity::Forwarded(id) | HeaderIdentity::RealIp(id) => Cow::Owned(id.to_string()),
        HeaderIdentity::NotFound => {
            // Peer address is available when the server is built with
            // into_make_service_with_connect_info
            if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
                return Cow::Owned(addr.ip().to_string());
            }
            Cow::Borrowed(UNKNOWN_CLIENT)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request() -> axum::http::request::Builder {
        Request::builder()
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let req = request()
            .header("x-forwarded-for", "192.168.1.1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(identify_client(&req), "192.168.1.1");
    }

    #[test]
    fn test_forwarded_for_trims_whitespace() {
        let req = request()
            .header("x-forwarded-for", "  203.0.113.50 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(identify_client(&req), "203.0.113.50");
    }

    #[test]
    fn test_real_ip_used_when_no_forwarded_for() {
        let req = request()
            .header("x-real-ip", "198.51.100.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(identify_client(&req), "198.51.100.7");
    }

    #[test]
    fn test_forwarded_for_priority_over_real_ip() {
        let req = request()
            .header("x-forwarded-for", "10.0.0.1")
            .header("x-real-ip", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(identify_client(&req), "10.0.0.1");
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let req = request()
            .header("x-forwarded-for", "   ")
            .header("x-real-ip", "198.51.100.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(identify_client(&req), "198.51.100.7");
    }

    #[test]
    fn test_peer_address_fallback() {
        let mut req = request().body(Body::empty()).unwrap();
        let addr: SocketAddr = "203.0.113.9:54321".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        // Port is dropped: the grouping key is the address, not the connection
        assert_eq!(identify_client(&req), "203.0.113.9");
    }

    #[test]
    fn test_unknown_when_nothing_available() {
        let req = request().body(Body::empty()).unwrap();

        let id = identify_client(&req);
        assert_eq!(id, UNKNOWN_CLIENT);
        // The fallback must not allocate
        assert!(matches!(id, Cow::Borrowed(_)));
    }

    #[test]
    fn test_ipv6_forwarded_for() {
        let req = request()
            .header("x-forwarded-for", "2001:db8::1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(identify_client(&req), "2001:db8::1");
    }

    #[test]
    fn test_opaque_key_passes_through_unvalidated() {
        // Ports, hostnames, garbage - all accepted as opaque keys
        let req = request()
            .header("x-forwarded-for", "192.168.1.1:8080")
            .body(Body::empty())
            .unwrap();

        assert_eq!(identify_client(&req), "192.168.1.1:8080");
    }
}
