//! Transport engine boundary.
//!
//! # Data Flow
//! ```text
//! gateway
//!     → ForwardingSpec { rewritten request, ForwardOptions }
//!     → Transport::forward (client.rs: connect, TLS, send, upgrade relay)
//!     → Response (headers available) or TransportError
//! ```
//!
//! # Design Decisions
//! - The gateway only sees the `Transport` trait; tests inject fakes
//! - A `ForwardingSpec` is consumed exactly once
//! - The forwarding deadline is enforced here, separately from the
//!   gateway's per-request deadline

pub mod client;
pub mod upgrade;

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
};
use thiserror::Error;

pub use client::HyperTransport;

/// Options the gateway hands to the transport with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardOptions {
    /// Deadline for the upstream response headers.
    pub timeout: Duration,
    /// Relay protocol upgrades (websockets) end to end.
    pub allow_upgrade: bool,
    /// Add `x-forwarded-*` headers.
    pub xfwd: bool,
}

impl ForwardOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            allow_upgrade: true,
            xfwd: true,
        }
    }
}

/// A rewritten request ready to be sent upstream.
#[derive(Debug)]
pub struct ForwardingSpec {
    /// Request with an absolute target URI and prepared headers.
    pub request: Request<Body>,
    /// Transport options.
    pub options: ForwardOptions,
}

/// Errors reported by the transport before response headers exist.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not establish a connection to the backend.
    #[error("connect error: {0}")]
    Connect(String),

    /// The backend did not answer within the forwarding deadline.
    #[error("upstream timeout after {0:?}")]
    Timeout(Duration),

    /// The exchange with the backend failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The transport could not be constructed.
    #[error("transport setup failed: {0}")]
    Setup(String),
}

/// The engine that performs byte-level proxying.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return once response headers are available.
    async fn forward(&self, spec: ForwardingSpec) -> Result<Response<Body>, TransportError>;
}
