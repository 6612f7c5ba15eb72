//! Per-request pipeline stages.
//!
//! ```text
//! Start → IdentifierExtracted → RouteResolved → [ClassifyingIntent] → AuthDecided
//!       → Forwarding → Completed
//! any stage ──────────────────────────────────────────────────────────→ Failed
//! ```

use std::fmt;
use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{request::Parts, Request, Response},
};

use crate::error::GatewayError;
use crate::intent::{ForwardBranch, Intent, PeekBranch};
use crate::routing::{RouteDecision, RoutingIdentifier};
use crate::transport::ForwardingSpec;

/// Where a request is in the pipeline. Each variant owns what the next step needs.
pub enum Stage {
    Start(Request<Body>),
    IdentifierExtracted {
        request: Request<Body>,
        identifier: RoutingIdentifier,
    },
    RouteResolved {
        request: Request<Body>,
        identifier: RoutingIdentifier,
        route: RouteDecision,
    },
    /// Body forked; the forward branch waits while the peek branch is scanned.
    ClassifyingIntent {
        parts: Parts,
        peek: PeekBranch,
        forward: ForwardBranch,
        route: RouteDecision,
    },
    AuthDecided {
        request: Request<Body>,
        route: RouteDecision,
        intent: Intent,
    },
    Forwarding(ForwardingSpec),
    /// Terminal: upstream response headers are available.
    Completed(Response<Body>),
    /// Terminal.
    Failed(GatewayError),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Start(_) => "start",
            Stage::IdentifierExtracted { .. } => "identifier_extracted",
            Stage::RouteResolved { .. } => "route_resolved",
            Stage::ClassifyingIntent { .. } => "classifying_intent",
            Stage::AuthDecided { .. } => "auth_decided",
            Stage::Forwarding(_) => "forwarding",
            Stage::Completed(_) => "completed",
            Stage::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed(_) | Stage::Failed(_))
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Connection facts that travel with a request through every stage.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub client_addr: Option<SocketAddr>,
    pub request_id: Option<String>,
}
