//! Directory service client.
//!
//! # Responsibilities
//! - Look up `GET {base}/servers/{identifier}` once per request
//! - Parse `{ "url": string, "requireAuth": boolean }` into a [`RouteDecision`]
//! - Classify failures by cause (unreachable, rejected, invalid answer)
//!
//! # Design Decisions
//! - No caching: every request re-resolves so auth posture is never stale
//! - No retries: a single attempt, bounded by the client timeout
//! - Rejection bodies are kept for logs only, truncated

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::DirectoryConfig;
use crate::observability::metrics;
use crate::routing::identifier::RoutingIdentifier;

/// Maximum number of body bytes kept from a rejected lookup.
const REJECTED_BODY_LIMIT: usize = 512;

/// Where to forward a request and whether invocations need authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    /// Absolute backend URL; its path is the base path for rewriting.
    pub target_url: Url,
    /// Whether invocation intents must be refused.
    pub require_auth: bool,
}

/// Errors that can occur while resolving a routing identifier.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Network failure or timeout reaching the directory.
    #[error("directory unreachable: {0}")]
    Unreachable(String),

    /// Directory answered with a non-success status.
    #[error("directory returned status {status}")]
    Rejected { status: u16, body: String },

    /// Body missing, not JSON, or fields missing/mistyped.
    #[error("invalid directory response: {0}")]
    InvalidResponse(String),

    /// The `url` field is not an absolute http(s) URL.
    #[error("invalid target url {url:?}: {reason}")]
    InvalidTargetUrl { url: String, reason: String },
}

impl DirectoryError {
    fn outcome(&self) -> &'static str {
        match self {
            DirectoryError::Unreachable(_) => "unreachable",
            DirectoryError::Rejected { .. } => "rejected",
            DirectoryError::InvalidResponse(_) => "invalid_response",
            DirectoryError::InvalidTargetUrl { .. } => "invalid_target_url",
        }
    }
}

/// Resolves routing identifiers to route decisions.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve one identifier. Implementations must not cache.
    async fn resolve(&self, identifier: &RoutingIdentifier) -> Result<RouteDecision, DirectoryError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryEntry {
    url: String,
    require_auth: bool,
}

/// Parse a directory answer body into a route decision.
pub fn parse_route_decision(body: &[u8]) -> Result<RouteDecision, DirectoryError> {
    let entry: DirectoryEntry = serde_json::from_slice(body)
        .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;

    let target_url = parse_target_url(&entry.url)?;
    Ok(RouteDecision {
        target_url,
        require_auth: entry.require_auth,
    })
}

/// Parse and check a backend target URL.
pub fn parse_target_url(raw: &str) -> Result<Url, DirectoryError> {
    let invalid = |reason: String| DirectoryError::InvalidTargetUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// HTTP client for the directory service.
#[derive(Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpDirectory {
    /// Build a directory client from configuration.
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| DirectoryError::Unreachable(format!("invalid base url: {}", e)))?;
        // The directory is an internal service; environment proxies are not used.
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DirectoryError::Unreachable(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// URL of the lookup for an identifier.
    pub fn lookup_url(&self, identifier: &RoutingIdentifier) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::Unreachable("directory base url cannot be a base".into()))?
            .pop_if_empty()
            .push("servers")
            .push(identifier.as_str());
        Ok(url)
    }

    async fn lookup(&self, identifier: &RoutingIdentifier) -> Result<RouteDecision, DirectoryError> {
        let url = self.lookup_url(identifier)?;
        tracing::debug!(identifier = %identifier, url = %url, "Resolving server");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| DirectoryError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_prefix(response, REJECTED_BODY_LIMIT).await;
            let mut text = String::from_utf8_lossy(&body).into_owned();
            if text.len() > REJECTED_BODY_LIMIT {
                let mut cut = REJECTED_BODY_LIMIT;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(DirectoryError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DirectoryError::Unreachable(e.to_string()))?;
        parse_route_decision(&body)
    }
}

/// Read at most `limit` body bytes. A body that fails midway keeps what arrived.
async fn read_prefix(mut response: reqwest::Response, limit: usize) -> Vec<u8> {
    let mut body = Vec::new();
    while body.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    body.truncate(limit);
    body
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn resolve(&self, identifier: &RoutingIdentifier) -> Result<RouteDecision, DirectoryError> {
        let start = Instant::now();
        let result = self.lookup(identifier).await;
        match &result {
            Ok(route) => {
                tracing::debug!(
                    identifier = %identifier,
                    target = %route.target_url,
                    require_auth = route.require_auth,
                    "Server resolved"
                );
                metrics::record_directory_lookup("ok", start);
            }
            Err(e) => {
                tracing::warn!(identifier = %identifier, error = %e, "Server lookup failed");
                if let DirectoryError::Rejected { status, body } = e {
                    tracing::debug!(status, body = %body, "Directory rejection body");
                }
                metrics::record_directory_lookup(e.outcome(), start);
            }
        }
        result
    }
}
