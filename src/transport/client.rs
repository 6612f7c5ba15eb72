//! Hyper based transport engine.
//!
//! # Responsibilities
//! - Pool connections to backends over plain HTTP or HTTPS
//! - Enforce the forwarding deadline on the upstream exchange
//! - Strip hop-by-hop headers in both directions
//! - Hand `101 Switching Protocols` exchanges to the upgrade relay
//!
//! # Design Decisions
//! - HTTP/1 only upstream so websocket upgrades keep working over TLS
//! - Bundled webpki roots; nothing is read from the host trust store
//! - Response bodies are streamed back untouched

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Response, StatusCode},
};
use hyper::upgrade::OnUpgrade;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::security::headers::{is_upgrade_request, strip_hop_by_hop};
use crate::transport::{upgrade, ForwardingSpec, Transport, TransportError};

type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Transport backed by a pooled hyper client.
#[derive(Clone)]
pub struct HyperTransport {
    client: HttpsClient,
}

impl HyperTransport {
    /// Build a transport whose TCP connects give up after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(connect_timeout));

        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| TransportError::Setup(e.to_string()))?
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .http1_preserve_header_case(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build(https);

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn forward(&self, spec: ForwardingSpec) -> Result<Response<Body>, TransportError> {
        let ForwardingSpec { mut request, options } = spec;

        let wants_upgrade = options.allow_upgrade && is_upgrade_request(request.headers());
        let client_upgrade = if wants_upgrade {
            request.extensions_mut().remove::<OnUpgrade>()
        } else {
            None
        };
        strip_hop_by_hop(request.headers_mut(), wants_upgrade);

        let target = request.uri().clone();
        tracing::debug!(target = %target, method = %request.method(), "Forwarding request");

        let mut response = match tokio::time::timeout(options.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_connect() => {
                return Err(TransportError::Connect(format!("{}: {}", target, e)));
            }
            Ok(Err(e)) => return Err(TransportError::Upstream(format!("{}: {}", target, e))),
            Err(_) => return Err(TransportError::Timeout(options.timeout)),
        };

        let switching = response.status() == StatusCode::SWITCHING_PROTOCOLS;
        if switching {
            match client_upgrade {
                Some(client_upgrade) => {
                    let upstream_upgrade = hyper::upgrade::on(&mut response);
                    upgrade::spawn_relay(client_upgrade, upstream_upgrade);
                }
                None => {
                    return Err(TransportError::Upstream(format!(
                        "{}: unexpected 101 for a non-upgrade request",
                        target
                    )));
                }
            }
        }

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers, switching);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
