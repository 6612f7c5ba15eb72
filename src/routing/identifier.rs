//! Routing identifier extraction.
//!
//! # Responsibilities
//! - Read the Host header (or the URI authority for HTTP/2 requests)
//! - Strip the port and validate the label structure
//! - Return the leftmost label as the routing identifier
//!
//! # Design Decisions
//! - Pure function, runs before any network call
//! - Identifiers are request-scoped and never cached
//! - The identifier is the first label verbatim; the directory owns any normalization

use std::fmt;

use axum::http::{header, uri::Authority, Request};

use crate::error::GatewayError;

/// Minimum number of dot-separated labels a routable host must carry.
pub const MIN_HOST_LABELS: usize = 3;

/// Opaque token selecting a backend, taken from the leftmost host label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingIdentifier(String);

impl RoutingIdentifier {
    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the routing identifier from a host value such as `abc.example.com:3001`.
pub fn extract_identifier(host: Option<&str>) -> Result<RoutingIdentifier, GatewayError> {
    let host = host
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| GatewayError::MalformedHost("missing host".to_string()))?;

    let hostname = strip_port(host);
    // A fully qualified name may end in a single root dot.
    let hostname = hostname.strip_suffix('.').unwrap_or(hostname.as_str());
    let labels: Vec<&str> = hostname.split('.').collect();

    if labels.len() < MIN_HOST_LABELS {
        return Err(GatewayError::MalformedHost(format!(
            "host {:?} has {} labels, need at least {}",
            host,
            labels.len(),
            MIN_HOST_LABELS
        )));
    }
    if labels.iter().any(|label| label.is_empty()) {
        return Err(GatewayError::MalformedHost(format!("host {:?} has an empty label", host)));
    }

    Ok(RoutingIdentifier(labels[0].to_string()))
}

/// Extract the routing identifier from a request.
///
/// HTTP/1 clients send a Host header; HTTP/2 clients carry the authority in
/// the URI instead, so that is the fallback.
pub fn identifier_from_request<B>(req: &Request<B>) -> Result<RoutingIdentifier, GatewayError> {
    let host = match req.headers().get(header::HOST) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| GatewayError::MalformedHost("host is not valid text".to_string()))?,
        ),
        None => req.uri().authority().map(Authority::as_str),
    };
    extract_identifier(host)
}

fn strip_port(host: &str) -> String {
    match host.parse::<Authority>() {
        Ok(authority) => authority.host().to_string(),
        Err(_) => host.split(':').next().unwrap_or(host).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_three_labels() {
        let id = extract_identifier(Some("abc.example.com")).unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_fully_qualified_host() {
        let id = extract_identifier(Some("abc.example.com.")).unwrap();
        assert_eq!(id.as_str(), "abc");
        let id = extract_identifier(Some("abc.example.com.:3001")).unwrap();
        assert_eq!(id.as_str(), "abc");
        assert!(extract_identifier(Some("example.com.")).is_err());
        assert!(extract_identifier(Some("abc.example.com..")).is_err());
    }

    #[test]
    fn test_more_labels_and_port() {
        let id = extract_identifier(Some("weather.tools.example.co.uk:3001")).unwrap();
        assert_eq!(id.as_str(), "weather");
    }

    #[test]
    fn test_label_kept_verbatim() {
        let id = extract_identifier(Some("My-Server.Example.COM")).unwrap();
        assert_eq!(id.to_string(), "My-Server");
    }

    #[test]
    fn test_too_few_labels() {
        for host in ["example.com", "localhost", "localhost:3001", "abc.localhost"] {
            assert!(
                matches!(extract_identifier(Some(host)), Err(GatewayError::MalformedHost(_))),
                "host {} should be rejected",
                host
            );
        }
    }

    #[test]
    fn test_missing_or_empty_host() {
        assert!(matches!(extract_identifier(None), Err(GatewayError::MalformedHost(_))));
        assert!(matches!(extract_identifier(Some("  ")), Err(GatewayError::MalformedHost(_))));
    }

    #[test]
    fn test_empty_label() {
        assert!(extract_identifier(Some(".example.com")).is_err());
        assert!(extract_identifier(Some("abc..com")).is_err());
    }

    #[test]
    fn test_from_request_header() {
        let req = Request::builder()
            .uri("/mcp")
            .header("Host", "abc.example.com")
            .body(Body::empty())
            .unwrap();
        assert_eq!(identifier_from_request(&req).unwrap().as_str(), "abc");
    }

    #[test]
    fn test_from_request_authority() {
        let req = Request::builder()
            .uri("https://xyz.example.com/mcp")
            .body(Body::empty())
            .unwrap();
        assert_eq!(identifier_from_request(&req).unwrap().as_str(), "xyz");
    }

    #[test]
    fn test_from_request_without_host() {
        let req = Request::builder().uri("/mcp").body(Body::empty()).unwrap();
        assert!(matches!(
            identifier_from_request(&req),
            Err(GatewayError::MalformedHost(_))
        ));
    }
}
