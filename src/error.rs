//! Client-visible error taxonomy.
//!
//! Every failure a request can hit before response headers are sent maps to
//! exactly one [`GatewayError`] kind, and every kind maps to one status code.
//! Bodies are plain text and never echo collaborator output.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routing::directory::DirectoryError;
use crate::transport::TransportError;

/// Errors surfaced to the client by the request gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Host header missing or with fewer than three labels.
    #[error("malformed host: {0}")]
    MalformedHost(String),

    /// Intent was an invocation and the route requires authentication.
    #[error("authentication required for method {method}")]
    AuthRequired { method: String },

    /// The directory service could not be reached.
    #[error("directory unreachable: {0}")]
    DirectoryUnreachable(String),

    /// The directory service answered with a non-success status.
    #[error("directory rejected lookup with status {status}")]
    DirectoryRejected { status: u16, body: String },

    /// The directory answer did not have the expected shape.
    #[error("invalid directory response: {0}")]
    DirectoryInvalidResponse(String),

    /// The target URL returned by the directory is not usable.
    #[error("invalid target url {url}: {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    /// The transport engine failed before response headers were available.
    #[error("forwarding failed: {0}")]
    ForwardingFailure(String),

    /// The per-request deadline expired before response headers were sent.
    #[error("request deadline of {0} seconds exceeded")]
    Timeout(u64),
}

impl GatewayError {
    /// Status code sent to the client for this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MalformedHost(_) => StatusCode::BAD_REQUEST,
            GatewayError::AuthRequired { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::DirectoryUnreachable(_)
            | GatewayError::DirectoryRejected { .. }
            | GatewayError::DirectoryInvalidResponse(_)
            | GatewayError::InvalidTargetUrl { .. }
            | GatewayError::ForwardingFailure(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MalformedHost(_) => "malformed_host",
            GatewayError::AuthRequired { .. } => "auth_required",
            GatewayError::DirectoryUnreachable(_) => "directory_unreachable",
            GatewayError::DirectoryRejected { .. } => "directory_rejected",
            GatewayError::DirectoryInvalidResponse(_) => "directory_invalid_response",
            GatewayError::InvalidTargetUrl { .. } => "invalid_target_url",
            GatewayError::ForwardingFailure(_) => "forwarding_failure",
            GatewayError::Timeout(_) => "timeout",
        }
    }

    /// Text written to the client. Collaborator details stay in the logs.
    fn client_message(&self) -> &'static str {
        match self {
            GatewayError::MalformedHost(_) => "Bad Request: invalid host",
            GatewayError::AuthRequired { .. } => "Unauthorized",
            GatewayError::DirectoryUnreachable(_)
            | GatewayError::DirectoryRejected { .. }
            | GatewayError::DirectoryInvalidResponse(_) => "Bad Gateway: server lookup failed",
            GatewayError::InvalidTargetUrl { .. } => "Bad Gateway: invalid target",
            GatewayError::ForwardingFailure(_) => "Bad Gateway",
            GatewayError::Timeout(_) => "Gateway Timeout",
        }
    }
}

impl From<DirectoryError> for GatewayError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unreachable(msg) => GatewayError::DirectoryUnreachable(msg),
            DirectoryError::Rejected { status, body } => {
                GatewayError::DirectoryRejected { status, body }
            }
            DirectoryError::InvalidResponse(msg) => GatewayError::DirectoryInvalidResponse(msg),
            DirectoryError::InvalidTargetUrl { url, reason } => {
                GatewayError::InvalidTargetUrl { url, reason }
            }
        }
    }
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        GatewayError::ForwardingFailure(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.client_message()));
        *response.status_mut() = self.status();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        match self {
            GatewayError::AuthRequired { .. } => {
                headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            GatewayError::Timeout(_) => {
                headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
            }
            _ => {}
        }
        response
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
