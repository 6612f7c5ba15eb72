//! Authorization policy.
//!
//! Only invocations are gated. Session setup and capability listing stay
//! open so unauthenticated clients can discover what a server offers.

use axum::http::Method;

use crate::intent::Intent;
use crate::routing::RouteDecision;

/// Outcome of the auth check for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny,
}

/// Deny iff the intent is an invocation and the route requires authentication.
pub fn authorize(intent: &Intent, require_auth: bool) -> AuthDecision {
    if require_auth && intent.is_invoke() {
        AuthDecision::Deny
    } else {
        AuthDecision::Allow
    }
}

/// Whether the body must be classified before forwarding.
///
/// Open routes are never inspected, and neither are methods outside the
/// configured body-bearing set.
pub fn needs_inspection(method: &Method, route: &RouteDecision, inspect_methods: &[Method]) -> bool {
    route.require_auth && inspect_methods.contains(method)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(require_auth: bool) -> RouteDecision {
        RouteDecision {
            target_url: "http://backend.internal:9000".parse().unwrap(),
            require_auth,
        }
    }

    #[test]
    fn test_authorize_table() {
        let invoke = Intent::Invoke("tools/call".into());
        assert_eq!(authorize(&invoke, true), AuthDecision::Deny);
        assert_eq!(authorize(&invoke, false), AuthDecision::Allow);
        for intent in [Intent::Initialize, Intent::ListCapabilities, Intent::Unknown] {
            assert_eq!(authorize(&intent, true), AuthDecision::Allow);
            assert_eq!(authorize(&intent, false), AuthDecision::Allow);
        }
    }

    #[test]
    fn test_needs_inspection() {
        let methods = vec![Method::POST];
        assert!(needs_inspection(&Method::POST, &route(true), &methods));
        assert!(!needs_inspection(&Method::POST, &route(false), &methods));
        assert!(!needs_inspection(&Method::GET, &route(true), &methods));
        assert!(!needs_inspection(&Method::PUT, &route(true), &methods));
    }
}
