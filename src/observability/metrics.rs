//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): time to response headers
//! - `gateway_directory_lookups_total` (counter): lookups by outcome
//! - `gateway_directory_lookup_duration_seconds` (histogram)
//! - `gateway_intents_total` (counter): classified requests by intent
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("gateway_requests_total", "Requests handled, by method and status");
    describe_histogram!(
        "gateway_request_duration_seconds",
        "Time until response headers were available"
    );
    describe_counter!("gateway_directory_lookups_total", "Directory lookups, by outcome");
    describe_histogram!(
        "gateway_directory_lookup_duration_seconds",
        "Directory lookup latency"
    );
    describe_counter!("gateway_intents_total", "Inspected requests, by intent");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_directory_lookup(outcome: &'static str, start: Instant) {
    counter!("gateway_directory_lookups_total", "outcome" => outcome).increment(1);
    histogram!("gateway_directory_lookup_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_intent(intent: &'static str) {
    counter!("gateway_intents_total", "intent" => intent).increment(1);
}
