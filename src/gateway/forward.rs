//! Forwarding request construction.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the target origin
//! - Point `Host` at the target authority
//! - Record the inbound hop in `x-forwarded-*` headers
//!
//! # Design Decisions
//! - Path is `target base path + original path + original query`; the
//!   target URL's own query and fragment are ignored
//! - Upstream requests are always HTTP/1.1 regardless of the inbound version

use std::net::IpAddr;

use axum::{
    body::Body,
    http::{header, uri::Authority, HeaderValue, Request, Uri, Version},
};
use url::Url;

use crate::error::GatewayError;
use crate::routing::RouteDecision;
use crate::security::headers::{apply_forwarded, ForwardedFor};
use crate::transport::{ForwardOptions, ForwardingSpec};

/// Authority (`host[:port]`) of a target URL. Default ports are omitted.
pub fn target_authority(target: &Url) -> Result<Authority, GatewayError> {
    let host = target.host_str().ok_or_else(|| invalid(target, "missing host"))?;
    let raw = match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    raw.parse::<Authority>()
        .map_err(|e| invalid(target, &e.to_string()))
}

/// Join the target origin and base path with the original path and query.
pub fn rewrite_uri(target: &Url, original: &Uri) -> Result<Uri, GatewayError> {
    let base = target.path().trim_end_matches('/');
    let path = match original.path() {
        p if p.starts_with('/') => p,
        _ => "/",
    };

    let mut path_and_query = format!("{}{}", base, path);
    if let Some(query) = original.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    Uri::builder()
        .scheme(target.scheme())
        .authority(target_authority(target)?)
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| invalid(target, &e.to_string()))
}

/// Turn the inbound request into a spec for the transport engine.
pub fn build_forwarding_spec(
    request: Request<Body>,
    route: &RouteDecision,
    client_ip: Option<IpAddr>,
    options: ForwardOptions,
) -> Result<ForwardingSpec, GatewayError> {
    let (mut parts, body) = request.into_parts();

    let original_host = parts
        .headers
        .get(header::HOST)
        .cloned()
        .or_else(|| {
            parts
                .uri
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
        });

    let authority = target_authority(&route.target_url)?;
    parts.uri = rewrite_uri(&route.target_url, &parts.uri)?;
    parts.version = Version::HTTP_11;

    if options.xfwd {
        apply_forwarded(
            &mut parts.headers,
            &ForwardedFor {
                client_ip,
                proto: "http",
                host: original_host,
            },
        );
    }

    let host = HeaderValue::from_str(authority.as_str())
        .map_err(|e| invalid(&route.target_url, &e.to_string()))?;
    parts.headers.insert(header::HOST, host);

    Ok(ForwardingSpec {
        request: Request::from_parts(parts, body),
        options,
    })
}

fn invalid(target: &Url, reason: &str) -> GatewayError {
    GatewayError::InvalidTargetUrl {
        url: target.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_rewrite_with_base_path() {
        let uri: Uri = "/foo?x=1".parse().unwrap();
        let rewritten = rewrite_uri(&url("https://backend.example.org/api"), &uri).unwrap();
        assert_eq!(rewritten.to_string(), "https://backend.example.org/api/foo?x=1");
    }

    #[test]
    fn test_rewrite_root_target() {
        let uri: Uri = "/mcp".parse().unwrap();
        let rewritten = rewrite_uri(&url("http://10.0.0.5:9000"), &uri).unwrap();
        assert_eq!(rewritten.to_string(), "http://10.0.0.5:9000/mcp");
    }

    #[test]
    fn test_rewrite_trailing_slash_base() {
        let uri: Uri = "/sse".parse().unwrap();
        let rewritten = rewrite_uri(&url("http://backend.internal/v1/"), &uri).unwrap();
        assert_eq!(rewritten.to_string(), "http://backend.internal/v1/sse");
    }

    #[test]
    fn test_rewrite_ignores_target_query() {
        let uri: Uri = "/a".parse().unwrap();
        let rewritten = rewrite_uri(&url("http://backend.internal/base?token=1"), &uri).unwrap();
        assert_eq!(rewritten.to_string(), "http://backend.internal/base/a");
    }

    #[test]
    fn test_target_authority_default_port() {
        assert_eq!(target_authority(&url("https://b.example.org:443/")).unwrap(), "b.example.org");
        assert_eq!(target_authority(&url("http://b.example.org:8080/")).unwrap(), "b.example.org:8080");
    }

    #[test]
    fn test_build_spec_headers() {
        let request = Request::builder()
            .method("POST")
            .uri("/foo?x=1")
            .version(Version::HTTP_2)
            .header("host", "abc.example.com:3001")
            .header("authorization", "Bearer t")
            .body(Body::empty())
            .unwrap();
        let route = RouteDecision {
            target_url: url("https://backend.example.org/api"),
            require_auth: false,
        };

        let spec = build_forwarding_spec(
            request,
            &route,
            Some("192.0.2.7".parse().unwrap()),
            ForwardOptions::new(Duration::from_secs(25)),
        )
        .unwrap();

        let req = &spec.request;
        assert_eq!(req.uri().to_string(), "https://backend.example.org/api/foo?x=1");
        assert_eq!(req.version(), Version::HTTP_11);
        assert_eq!(req.headers()["host"], "backend.example.org");
        assert_eq!(req.headers()["x-forwarded-host"], "abc.example.com:3001");
        assert_eq!(req.headers()["x-forwarded-for"], "192.0.2.7");
        assert_eq!(req.headers()["x-forwarded-proto"], "http");
        assert_eq!(req.headers()["authorization"], "Bearer t");
    }

    #[test]
    fn test_build_spec_without_xfwd() {
        let request = Request::builder()
            .uri("/")
            .header("host", "abc.example.com")
            .body(Body::empty())
            .unwrap();
        let route = RouteDecision {
            target_url: url("http://backend.internal:9000"),
            require_auth: false,
        };
        let mut options = ForwardOptions::new(Duration::from_secs(5));
        options.xfwd = false;

        let spec = build_forwarding_spec(request, &route, None, options).unwrap();
        assert!(spec.request.headers().get("x-forwarded-host").is_none());
        assert_eq!(spec.request.headers()["host"], "backend.internal:9000");
    }
}
