//! Request gateway.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → routing::identifier (Host → identifier)
//!     → routing::directory (identifier → RouteDecision)
//!     → intent::tee + intent::classifier (only for gated, body-bearing requests)
//!     → policy.rs (allow / deny)
//!     → forward.rs (rewrite) → transport
//!     → security::headers (harden) → client
//! ```
//!
//! # Design Decisions
//! - The pipeline is an explicit [`Stage`] machine; `advance` moves one step
//! - Directory and transport are injected trait objects
//! - One deadline covers every stage until response headers exist
//! - Nothing is cached between requests

pub mod forward;
pub mod policy;
pub mod stage;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{Method, Request, Response, StatusCode},
    response::IntoResponse,
};
use futures_util::TryStreamExt;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::intent::{self, Intent};
use crate::observability::metrics;
use crate::routing::{identifier_from_request, Directory};
use crate::security::headers::harden_response;
use crate::transport::{ForwardOptions, Transport};

pub use policy::{authorize, AuthDecision};
pub use stage::{RequestContext, Stage};

/// Per-request knobs derived from configuration.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub request_timeout: Duration,
    pub forward_options: ForwardOptions,
    pub peek_limit: usize,
    pub forward_queue_chunks: usize,
    pub inspect_methods: Vec<Method>,
    pub harden_headers: bool,
}

impl GatewaySettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let inspect_methods = config
            .inspection
            .methods
            .iter()
            .filter_map(|m| m.parse::<Method>().ok())
            .collect();

        Self {
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            forward_options: ForwardOptions::new(Duration::from_secs(config.timeouts.forward_secs)),
            peek_limit: config.inspection.peek_limit,
            forward_queue_chunks: config.inspection.forward_queue_chunks,
            inspect_methods,
            harden_headers: config.security.enable_headers,
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// Orchestrates one request from Host header to upstream response.
#[derive(Clone)]
pub struct Gateway {
    directory: Arc<dyn Directory>,
    transport: Arc<dyn Transport>,
    settings: Arc<GatewaySettings>,
}

impl Gateway {
    pub fn new(
        directory: Arc<dyn Directory>,
        transport: Arc<dyn Transport>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            directory,
            transport,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Handle a request end to end. Always produces a response.
    pub async fn handle(&self, request: Request<Body>, ctx: RequestContext) -> Response<Body> {
        let start = Instant::now();
        let method = request.method().clone();
        let deadline = self.settings.request_timeout;

        let response = match tokio::time::timeout(deadline, self.run(request, &ctx)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => reject(err, &ctx),
            Err(_) => reject(GatewayError::Timeout(deadline.as_secs()), &ctx),
        };

        metrics::record_request(method.as_str(), response.status().as_u16(), start);
        response
    }

    /// Drive the stage machine to a terminal stage.
    pub async fn run(&self, request: Request<Body>, ctx: &RequestContext) -> GatewayResult<Response<Body>> {
        let mut stage = Stage::Start(request);
        loop {
            match stage {
                Stage::Completed(response) => return Ok(response),
                Stage::Failed(err) => return Err(err),
                current => {
                    let from = current.name();
                    stage = self.advance(current, ctx).await;
                    tracing::trace!(from, to = stage.name(), "Stage transition");
                }
            }
        }
    }

    /// Perform exactly one transition. Terminal stages are returned unchanged.
    pub async fn advance(&self, stage: Stage, ctx: &RequestContext) -> Stage {
        match stage {
            Stage::Start(request) => match identifier_from_request(&request) {
                Ok(identifier) => Stage::IdentifierExtracted { request, identifier },
                Err(err) => Stage::Failed(err),
            },

            Stage::IdentifierExtracted { request, identifier } => {
                match self.directory.resolve(&identifier).await {
                    Ok(route) => Stage::RouteResolved {
                        request,
                        identifier,
                        route,
                    },
                    Err(err) => Stage::Failed(err.into()),
                }
            }

            Stage::RouteResolved {
                request,
                identifier,
                route,
            } => {
                let inspect =
                    policy::needs_inspection(request.method(), &route, &self.settings.inspect_methods);
                tracing::debug!(
                    identifier = %identifier,
                    target = %route.target_url,
                    require_auth = route.require_auth,
                    inspect,
                    "Route resolved"
                );

                if !inspect {
                    return Stage::AuthDecided {
                        request,
                        route,
                        intent: Intent::Unknown,
                    };
                }

                let (parts, body) = request.into_parts();
                let (peek, forward) = intent::fork(
                    body.into_data_stream(),
                    self.settings.peek_limit,
                    self.settings.forward_queue_chunks,
                );
                Stage::ClassifyingIntent {
                    parts,
                    peek,
                    forward,
                    route,
                }
            }

            Stage::ClassifyingIntent {
                parts,
                peek,
                forward,
                route,
            } => {
                let intent = intent::classify(peek, self.settings.peek_limit).await;
                metrics::record_intent(intent.label());
                Stage::AuthDecided {
                    request: Request::from_parts(parts, Body::from_stream(forward)),
                    route,
                    intent,
                }
            }

            Stage::AuthDecided { request, route, intent } => {
                if authorize(&intent, route.require_auth) == AuthDecision::Deny {
                    let method = match intent {
                        Intent::Invoke(method) => method,
                        other => other.to_string(),
                    };
                    return Stage::Failed(GatewayError::AuthRequired { method });
                }

                match forward::build_forwarding_spec(
                    request,
                    &route,
                    ctx.client_addr.map(|addr| addr.ip()),
                    self.settings.forward_options,
                ) {
                    Ok(spec) => Stage::Forwarding(spec),
                    Err(err) => Stage::Failed(err),
                }
            }

            Stage::Forwarding(spec) => match self.transport.forward(spec).await {
                Ok(response) => Stage::Completed(self.finish(response, ctx)),
                Err(err) => Stage::Failed(err.into()),
            },

            terminal => terminal,
        }
    }

    /// Harden headers and watch the body for failures after headers are sent.
    fn finish(&self, response: Response<Body>, ctx: &RequestContext) -> Response<Body> {
        let (mut parts, body) = response.into_parts();
        if self.settings.harden_headers {
            harden_response(&mut parts.headers);
        }
        if parts.status == StatusCode::SWITCHING_PROTOCOLS {
            return Response::from_parts(parts, body);
        }

        let request_id = ctx.request_id.clone();
        let body = body.into_data_stream().inspect_err(move |e| {
            tracing::warn!(
                request_id = request_id.as_deref().unwrap_or("-"),
                error = %e,
                "Upstream body failed after headers were sent"
            );
        });
        Response::from_parts(parts, Body::from_stream(body))
    }
}

fn reject(err: GatewayError, ctx: &RequestContext) -> Response<Body> {
    let request_id = ctx.request_id.as_deref().unwrap_or("-");
    let status = err.status();
    if status.is_server_error() {
        tracing::warn!(request_id, kind = err.kind(), error = %err, "Request failed");
    } else {
        tracing::info!(request_id, kind = err.kind(), error = %err, "Request refused");
    }

    err.into_response()
}
