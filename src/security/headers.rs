//! Header manipulation and security headers.
//!
//! # Responsibilities
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host
//! - Strip hop-by-hop headers
//! - Add security response headers
//!
//! # Design Decisions
//! - X-Forwarded-For and X-Forwarded-Proto are appended to, never replaced
//! - X-Forwarded-Host keeps the first proxy's value when already present
//! - Security headers never overwrite values set by the backend
//! - Upgrade requests keep `connection` and `upgrade` so the handshake survives

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Security headers added to upstream responses when absent.
pub const SECURITY_HEADERS: [(HeaderName, &str); 4] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (header::REFERRER_POLICY, "same-origin"),
];

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Set baseline security headers on a response, keeping any existing values.
///
/// Idempotent: calling it twice leaves the headers unchanged.
pub fn harden_response(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        if !headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
}

/// Client addressing recorded on the forwarded request.
#[derive(Debug, Clone)]
pub struct ForwardedFor {
    /// Peer address of the inbound connection.
    pub client_ip: Option<IpAddr>,
    /// Scheme the client used to reach the gateway.
    pub proto: &'static str,
    /// Host header the client sent.
    pub host: Option<HeaderValue>,
}

/// Add `x-forwarded-*` headers describing the inbound hop.
pub fn apply_forwarded(headers: &mut HeaderMap, forwarded: &ForwardedFor) {
    if let Some(ip) = forwarded.client_ip {
        append_list(headers, X_FORWARDED_FOR, &ip.to_string());
    }
    append_list(headers, X_FORWARDED_PROTO, forwarded.proto);
    if !headers.contains_key(&X_FORWARDED_HOST) {
        if let Some(host) = &forwarded.host {
            headers.insert(X_FORWARDED_HOST, host.clone());
        }
    }
}

fn append_list(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    let combined = match headers.get(&name).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{}, {}", existing, value),
        _ => value.to_string(),
    };
    if let Ok(v) = HeaderValue::from_str(&combined) {
        headers.insert(name, v);
    }
}

/// Remove hop-by-hop headers, including any named in `connection`.
///
/// With `keep_upgrade`, `connection` and `upgrade` survive so a protocol
/// upgrade can be negotiated end to end.
pub fn strip_hop_by_hop(headers: &mut HeaderMap, keep_upgrade: bool) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        if keep_upgrade && name == header::UPGRADE {
            continue;
        }
        headers.remove(name);
    }
    for name in HOP_BY_HOP.iter() {
        if keep_upgrade && (name == header::CONNECTION || name == header::UPGRADE) {
            continue;
        }
        headers.remove(name);
    }
}

/// True when the headers ask for a protocol upgrade.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    connection_upgrade && headers.contains_key(header::UPGRADE)
}
