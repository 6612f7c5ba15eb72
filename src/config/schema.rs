//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, port, connection tuning).
    pub listener: ListenerConfig,

    /// Directory service used to resolve routing identifiers.
    pub directory: DirectoryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request body inspection settings.
    pub inspection: InspectionConfig,

    /// Response hardening settings.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address without port (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Listening port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Time allowed for a client to send the full HTTP/1 request head.
    pub header_read_timeout_secs: u64,

    /// Interval of HTTP/2 keep-alive pings on idle connections.
    pub keep_alive_secs: u64,
}

impl ListenerConfig {
    /// Full `host:port` socket address string.
    pub fn socket_address(&self) -> String {
        match self.bind_address.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.bind_address, self.port),
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            max_connections: 10_000,
            header_read_timeout_secs: 10,
            keep_alive_secs: 65,
        }
    }
}

/// Directory service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Base URL; lookups go to `{base_url}/servers/{identifier}`.
    pub base_url: String,

    /// Timeout for a single lookup in seconds.
    pub timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-request deadline until response headers are sent, in seconds.
    pub request_secs: u64,

    /// Deadline of the forwarding leg enforced by the transport, in seconds.
    pub forward_secs: u64,

    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Grace period for draining connections on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            forward_secs: 25,
            connect_secs: 5,
            shutdown_grace_secs: 10,
        }
    }
}

/// Request body inspection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Maximum number of body bytes scanned for a method name.
    pub peek_limit: usize,

    /// HTTP methods whose bodies may carry a protocol method.
    pub methods: Vec<String>,

    /// Forward queue depth (in chunks) between the body pump and the transport.
    pub forward_queue_chunks: usize,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            peek_limit: 1024,
            methods: vec!["POST".to_string()],
            forward_queue_chunks: 16,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add baseline security headers to upstream responses.
    pub enable_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.port, 3001);
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.timeouts.forward_secs, 25);
        assert_eq!(config.timeouts.shutdown_grace_secs, 10);
        assert_eq!(config.inspection.peek_limit, 1024);
        assert_eq!(config.inspection.methods, vec!["POST".to_string()]);
        assert!(config.security.enable_headers);
    }

    #[test]
    fn test_socket_address_formats() {
        let mut listener = ListenerConfig::default();
        assert_eq!(listener.socket_address(), "0.0.0.0:3001");

        listener.bind_address = "::".into();
        assert_eq!(listener.socket_address(), "[::]:3001");
        assert!(listener.socket_address().parse::<SocketAddr>().is_ok());

        listener.bind_address = "::1".into();
        listener.port = 8080;
        assert_eq!(listener.socket_address(), "[::1]:8080");
    }

    #[test]
    fn test_partial_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            port = 4000

            [directory]
            base_url = "http://directory.internal"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.port, 4000);
        assert_eq!(config.listener.bind_address, "0.0.0.0");
        assert_eq!(config.directory.base_url, "http://directory.internal");
        assert_eq!(config.directory.timeout_secs, 10);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
