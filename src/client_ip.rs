//! Client identity resolution.
//!
//! The server is assumed to run behind a reverse proxy, so proxy-supplied
//! real-IP headers take priority over the raw socket address. The resolved
//! string keys the rate limiter and appears in request logs.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Resolve a stable per-client identity from request headers and the raw
/// connection address.
///
/// Priority:
/// 1. `X-Forwarded-For` (comma-separated) - first entry, trimmed. The first
///    entry is the original client only if upstream proxies do not forge it;
///    see the crate docs for the trust caveat.
/// 2. `X-Real-Ip`, when non-empty and no forwarded-for is present.
/// 3. The host portion of the socket address, port stripped.
///
/// When every source is empty the result is the empty string, which buckets
/// all such clients into one shared rate-limit identity rather than failing
/// the request.
pub fn resolve_client_ip(headers: &HeaderMap, connect_addr: Option<SocketAddr>) -> String {
    let real_ip = header_str(headers, "x-real-ip");
    let forwarded_for = header_str(headers, "x-forwarded-for");

    if !forwarded_for.is_empty() {
        return forwarded_for
            .split(',')
            .next()
            .unwrap_or(forwarded_for)
            .trim()
            .to_string();
    }

    if !real_ip.is_empty() {
        return real_ip.to_string();
    }

    connect_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
}
