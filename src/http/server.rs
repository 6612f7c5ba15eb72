//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router that sends every request to the gateway
//! - Wire up middleware (request id, tracing)
//! - Serve accepted connections over HTTP/1.1 and HTTP/2 with upgrades
//! - Drain connections on shutdown, bounded by the grace period

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response},
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::{conn::auto, graceful::GracefulShutdown},
    service::TowerToHyperService,
};
use tokio::net::TcpStream;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::gateway::{Gateway, RequestContext};
use crate::http::request::{request_id, UuidRequestId};
use crate::lifecycle::{Shutdown, ShutdownOutcome};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{ConnectionPermit, Listener};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    builder: auto::Builder<TokioExecutor>,
    shutdown_grace: Duration,
}

impl HttpServer {
    /// Create a server dispatching to `gateway`.
    pub fn new(gateway: Gateway, config: &GatewayConfig) -> Self {
        let router = Self::build_router(AppState { gateway });

        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(Duration::from_secs(config.listener.header_read_timeout_secs))
            .keep_alive(true)
            .preserve_header_case(true);
        builder
            .http2()
            .timer(TokioTimer::new())
            .keep_alive_interval(Duration::from_secs(config.listener.keep_alive_secs));

        Self {
            router,
            builder,
            shutdown_grace: Duration::from_secs(config.timeouts.shutdown_grace_secs),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = request_id(request.headers()).as_deref().unwrap_or("-"),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id());

        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// Accept connections until shutdown, then drain.
    pub async fn run(self, listener: Listener, shutdown: Shutdown) -> ShutdownOutcome {
        let graceful = GracefulShutdown::new();
        let tracker = ConnectionTracker::new();

        tracing::info!(
            address = ?listener.local_addr().ok(),
            max_connections = listener.max_connections(),
            "HTTP server starting"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        self.serve_connection(stream, peer, permit, &graceful, &tracker);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                },
                _ = shutdown.draining() => break,
            }
        }

        drop(listener);
        tracing::info!(
            active_connections = tracker.active_count(),
            grace_secs = self.shutdown_grace.as_secs(),
            "Stopped accepting, draining connections"
        );

        tokio::select! {
            _ = graceful.shutdown() => {
                tracing::info!("All connections drained");
                ShutdownOutcome::Graceful
            }
            _ = tokio::time::sleep(self.shutdown_grace) => {
                tracing::warn!(
                    active_connections = tracker.active_count(),
                    "Grace period expired, forcing shutdown"
                );
                ShutdownOutcome::Forced
            }
            _ = shutdown.forced() => {
                tracing::warn!(
                    active_connections = tracker.active_count(),
                    "Second signal received, forcing shutdown"
                );
                ShutdownOutcome::Forced
            }
        }
    }

    fn serve_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        graceful: &GracefulShutdown,
        tracker: &ConnectionTracker,
    ) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let service = self
            .router
            .clone()
            .map_request(move |mut request: Request<Incoming>| {
                request.extensions_mut().insert(ConnectInfo(peer));
                request
            });

        let conn = self
            .builder
            .serve_connection_with_upgrades(TokioIo::new(stream), TowerToHyperService::new(service));
        let conn = graceful.watch(conn.into_owned());
        let guard = tracker.track();

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(connection_id = %guard.id(), peer = %peer, error = %e, "Connection ended with error");
            }
            drop(guard);
            drop(permit);
        });
    }
}

/// Hands every request to the gateway.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let ctx = RequestContext {
        client_addr: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
        request_id: request_id(request.headers()),
    };
    state.gateway.handle(request, ctx).await
}
